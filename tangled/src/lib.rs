pub mod args;
pub mod daemon;
pub mod ingress;
pub mod requests;
