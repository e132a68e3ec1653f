use crate::{
    errors::{StorageError, StorageResult},
    gc::{GarbageCollector, MemoryReclaimer},
    meta::{DATABASE_VERSION, DatabaseHealth, MetaStore},
};
use std::{
    fs,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tangle_core::{info, warn};
use tangle_database::prelude::{ConnBuilder, DB, StorageEngine, StorageProfile};
use tangle_notify::bus::EventBus;

/// Background parallelism handed to the storage engine when none is configured
pub const DEFAULT_DB_PARALLELISM: usize = 128;
pub const DEFAULT_DB_FILES_LIMIT: i32 = 512;

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub db_path: PathBuf,
    pub profile: StorageProfile,
    pub parallelism: usize,
    pub debug_log: bool,
    pub files_limit: i32,
    pub memory_reclaimer: Option<MemoryReclaimer>,
}

impl StorageConfig {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path,
            profile: StorageProfile::Default,
            parallelism: DEFAULT_DB_PARALLELISM,
            debug_log: false,
            files_limit: DEFAULT_DB_FILES_LIMIT,
            memory_reclaimer: None,
        }
    }
}

/// Owns the open store from the schema check at startup to the ordered close at shutdown
pub struct StorageManager {
    db: Arc<DB>,
    meta: MetaStore,
    gc: Arc<GarbageCollector>,
    previous_health: Option<DatabaseHealth>,
    closed: AtomicBool,
}

impl StorageManager {
    /// Opens the store, verifies its schema version and flags it as running.
    ///
    /// A fresh store gets the current version written. A store of another version is
    /// rejected with [`StorageError::VersionMismatch`], no migration is attempted.
    pub fn open(config: StorageConfig, bus: Arc<EventBus>) -> StorageResult<Self> {
        fs::create_dir_all(&config.db_path)?;
        let db = ConnBuilder::default()
            .with_db_path(config.db_path.clone())
            .with_files_limit(config.files_limit)
            .with_profile(config.profile)
            .with_parallelism(config.parallelism)
            .with_debug_log(config.debug_log)
            .build()?;
        info!("Database opened at {} with profile {}", config.db_path.display(), config.profile);

        let meta = MetaStore::new(db.clone());
        match meta.version()? {
            Some(found) if found != DATABASE_VERSION => {
                return Err(StorageError::VersionMismatch { found, expected: DATABASE_VERSION });
            }
            Some(_) => {}
            None => meta.set_version(DATABASE_VERSION)?,
        }

        let previous_health = meta.health()?;
        match previous_health {
            None | Some(DatabaseHealth::Healthy) => {}
            Some(health) => warn!("database was not closed cleanly by the previous run (state: {})", health),
        }
        meta.set_health(DatabaseHealth::Running)?;

        let mut gc = GarbageCollector::new(db.clone() as Arc<dyn StorageEngine>, bus);
        if let Some(reclaimer) = config.memory_reclaimer {
            gc = gc.with_memory_reclaimer(reclaimer);
        }

        Ok(Self { db, meta, gc: Arc::new(gc), previous_health, closed: AtomicBool::new(false) })
    }

    pub fn db(&self) -> &Arc<DB> {
        &self.db
    }

    pub fn gc(&self) -> &Arc<GarbageCollector> {
        &self.gc
    }

    /// The health flag as left by the previous run, `None` for a fresh store
    pub fn previous_health(&self) -> Option<DatabaseHealth> {
        self.previous_health
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Waits for any running compaction, flags the store `Healthy` (or `Halted` after a
    /// fatal error) and flushes it. Writers must have stopped before. Calling it again
    /// is a no-op.
    pub fn shutdown(&self, halted: bool) -> StorageResult<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.gc.close();
        let health = if halted { DatabaseHealth::Halted } else { DatabaseHealth::Healthy };
        self.meta.set_health(health)?;
        StorageEngine::flush(self.db.as_ref())?;
        info!("Database closed ({})", health);
        Ok(())
    }
}
