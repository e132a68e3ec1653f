use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::{
    ops::Deref,
    path::{Path, PathBuf},
};
use tangle_utils::fd_budget::FDGuard;

pub use conn_builder::{ConnBuilder, ConnBuilderError};

mod conn_builder;

/// The RocksDB handle used by the node stores. Holds its share of the file descriptor
/// budget for as long as the database is open.
pub struct DB {
    inner: DBWithThreadMode<MultiThreaded>,
    path: PathBuf,
    _fd_guard: FDGuard,
}

impl DB {
    pub fn new(inner: DBWithThreadMode<MultiThreaded>, path: PathBuf, fd_guard: FDGuard) -> Self {
        Self { inner, path, _fd_guard: fd_guard }
    }

    pub fn db_path(&self) -> &Path {
        &self.path
    }
}

impl Deref for DB {
    type Target = DBWithThreadMode<MultiThreaded>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Deletes an existing DB if it exists
pub fn delete_db(db_dir: &Path) -> Result<(), rocksdb::Error> {
    if !db_dir.exists() {
        return Ok(());
    }
    DBWithThreadMode::<MultiThreaded>::destroy(&rocksdb::Options::default(), db_dir)
}
