extern crate self as tangle_core;

pub mod core;
pub mod log;
pub mod panic;
pub mod service;
pub mod signals;
pub mod time;
