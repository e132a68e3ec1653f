//!
//! # Tangle node utilities
//!
//! Synchronization and resource helpers shared by the node crates.
//!

#[cfg(feature = "fd_budget")]
pub mod fd_budget;
#[cfg(feature = "pool")]
pub mod pool;
#[cfg(feature = "triggers")]
pub mod triggers;
