use crate::{db::DB, profile::StorageProfile};
use rocksdb::{BlockBasedOptions, Cache, DBCompressionType, DBWithThreadMode, LogLevel, MultiThreaded};
use std::{path::PathBuf, sync::Arc};
use tangle_utils::fd_budget::{self, BudgetError};
use thiserror::Error;

const KB: usize = 1024;
const MB: usize = 1024 * KB;

#[derive(Debug, Error)]
pub enum ConnBuilderError {
    #[error(transparent)]
    FdBudget(#[from] BudgetError),

    #[error("cannot open the database at {0}: {1}")]
    Open(PathBuf, rocksdb::Error),
}

#[derive(Debug)]
pub struct Unspecified;

/// Typed builder of a [`DB`] connection. The database path and the files limit must
/// both be set before `build` becomes available.
#[derive(Debug)]
pub struct ConnBuilder<Path, FDLimit> {
    db_path: Path,
    create_if_missing: bool,
    parallelism: usize,
    profile: StorageProfile,
    debug_log: bool,
    files_limit: FDLimit,
}

impl Default for ConnBuilder<Unspecified, Unspecified> {
    fn default() -> Self {
        ConnBuilder {
            db_path: Unspecified,
            create_if_missing: true,
            parallelism: 1,
            profile: StorageProfile::Light,
            debug_log: false,
            files_limit: Unspecified,
        }
    }
}

impl<Path, FDLimit> ConnBuilder<Path, FDLimit> {
    pub fn with_db_path(self, db_path: PathBuf) -> ConnBuilder<PathBuf, FDLimit> {
        ConnBuilder {
            db_path,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            profile: self.profile,
            debug_log: self.debug_log,
            files_limit: self.files_limit,
        }
    }

    pub fn with_files_limit(self, files_limit: impl Into<i32>) -> ConnBuilder<Path, i32> {
        ConnBuilder {
            db_path: self.db_path,
            create_if_missing: self.create_if_missing,
            parallelism: self.parallelism,
            profile: self.profile,
            debug_log: self.debug_log,
            files_limit: files_limit.into(),
        }
    }

    pub fn with_create_if_missing(self, create_if_missing: bool) -> Self {
        ConnBuilder { create_if_missing, ..self }
    }

    /// Number of background threads granted to flushes and compactions
    pub fn with_parallelism(self, parallelism: impl Into<usize>) -> Self {
        ConnBuilder { parallelism: parallelism.into().max(1), ..self }
    }

    pub fn with_profile(self, profile: StorageProfile) -> Self {
        ConnBuilder { profile, ..self }
    }

    /// Raises the internal RocksDB info log (the `LOG` file in the db directory) to debug
    pub fn with_debug_log(self, debug_log: bool) -> Self {
        ConnBuilder { debug_log, ..self }
    }
}

impl ConnBuilder<PathBuf, i32> {
    /// Cap on concurrent flushes and compactions. A configured parallelism is used as is,
    /// otherwise half the cores are granted.
    fn background_jobs(&self) -> i32 {
        if self.parallelism > 1 { self.parallelism as i32 } else { (num_cpus::get() / 2).max(2) as i32 }
    }

    fn options(&self) -> rocksdb::Options {
        let mut opts = rocksdb::Options::default();
        if self.parallelism > 1 {
            opts.increase_parallelism(self.parallelism as i32);
        }
        // Must follow increase_parallelism, which resets the job cap to the thread count
        opts.set_max_background_jobs(self.background_jobs());

        let buffer_size = self.profile.write_buffer_size();
        opts.set_write_buffer_size(buffer_size);
        opts.set_max_write_buffer_number(self.profile.max_write_buffers());
        opts.set_target_file_size_base(buffer_size as u64);
        opts.set_level_compaction_dynamic_level_bytes(true);
        opts.set_compression_per_level(&[
            DBCompressionType::None,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
            DBCompressionType::Lz4,
        ]);
        opts.set_bytes_per_sync(MB as u64);
        opts.set_keep_log_file_num(1);

        // Whatever the write buffers leave of the memory budget goes to the block cache
        let block_cache = self.profile.mem_budget().saturating_sub(buffer_size * self.profile.max_write_buffers() as usize);
        let mut table_opts = BlockBasedOptions::default();
        table_opts.set_block_cache(&Cache::new_lru_cache(block_cache.max(8 * MB)));
        table_opts.set_bloom_filter(10.0, false);
        table_opts.set_block_size(64 * KB);
        opts.set_block_based_table_factory(&table_opts);

        if self.debug_log {
            opts.set_log_level(LogLevel::Debug);
        }
        opts.set_max_open_files(self.files_limit);
        opts.create_if_missing(self.create_if_missing);
        opts
    }

    pub fn build(self) -> Result<Arc<DB>, ConnBuilderError> {
        let guard = fd_budget::acquire_guard(self.files_limit as u64)?;
        let opts = self.options();
        let inner = DBWithThreadMode::<MultiThreaded>::open(&opts, &self.db_path)
            .map_err(|err| ConnBuilderError::Open(self.db_path.clone(), err))?;
        Ok(Arc::new(DB::new(inner, self.db_path, guard)))
    }
}
