use tangle_database::prelude::{ConnBuilderError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error(transparent)]
    Conn(#[from] ConnBuilderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "database version {found} is not compatible with version {expected} of this node, \
        delete the data directory (or run with --reset-db) and resync from a snapshot"
    )]
    VersionMismatch { found: u32, expected: u32 },

    #[error("storage is closed")]
    Closed,

    #[error("garbage collection failed after {passes} completed passes: {source}")]
    CompactionFailed {
        passes: usize,
        #[source]
        source: StoreError,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
