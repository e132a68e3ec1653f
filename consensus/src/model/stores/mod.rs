pub mod checkpoints;
pub mod entries;

pub use tangle_database::prelude::DB;
