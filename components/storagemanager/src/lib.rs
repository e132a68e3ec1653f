//! Lifecycle of the node store: opening with schema verification, health tracking,
//! serialized garbage collection and the ordered close at shutdown.

pub mod errors;
pub mod gc;
pub mod maintenance;
pub mod manager;
pub mod meta;
pub mod service;

pub use errors::{StorageError, StorageResult};
pub use gc::{CompactionRun, FullCompactionReport, GarbageCollector};
pub use manager::{StorageConfig, StorageManager};
pub use meta::{DATABASE_VERSION, DatabaseHealth};
