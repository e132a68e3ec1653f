use serde::{Deserialize, Serialize};
use std::{fmt::Display, sync::Arc};
use tangle_database::{
    prelude::{CachedDbItem, DB, DirectDbWriter, StoreResult, StoreResultExtensions},
    registry::DatabaseStorePrefixes,
};

/// Schema version of the store. Any change to a persisted layout bumps it.
pub const DATABASE_VERSION: u32 = 1;

/// How the previous process left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DatabaseHealth {
    /// Open, or the process crashed while it was open
    Running,
    /// Closed by an orderly shutdown
    Healthy,
    /// Closed by an orderly shutdown following a fatal error
    Halted,
}

impl Display for DatabaseHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DatabaseHealth::Running => "running",
            DatabaseHealth::Healthy => "healthy",
            DatabaseHealth::Halted => "halted",
        };
        f.write_str(s)
    }
}

/// Schema version and health flag, both read at startup
#[derive(Clone)]
pub struct MetaStore {
    db: Arc<DB>,
    version: CachedDbItem<u32>,
    health: CachedDbItem<DatabaseHealth>,
}

impl MetaStore {
    pub fn new(db: Arc<DB>) -> Self {
        Self {
            db: db.clone(),
            version: CachedDbItem::new(db.clone(), DatabaseStorePrefixes::SchemaVersion.into()),
            health: CachedDbItem::new(db, DatabaseStorePrefixes::DatabaseHealth.into()),
        }
    }

    pub fn version(&self) -> StoreResult<Option<u32>> {
        self.version.read().optional()
    }

    pub fn set_version(&self, version: u32) -> StoreResult<()> {
        self.version.write(DirectDbWriter::durable(&self.db), &version)
    }

    pub fn health(&self) -> StoreResult<Option<DatabaseHealth>> {
        self.health.read().optional()
    }

    pub fn set_health(&self, health: DatabaseHealth) -> StoreResult<()> {
        self.health.write(DirectDbWriter::durable(&self.db), &health)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_fresh_store_has_no_meta() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let meta = MetaStore::new(db);
        assert_eq!(meta.version().unwrap(), None);
        assert_eq!(meta.health().unwrap(), None);

        meta.set_version(DATABASE_VERSION).unwrap();
        meta.set_health(DatabaseHealth::Halted).unwrap();
        assert_eq!(meta.version().unwrap(), Some(DATABASE_VERSION));
        assert_eq!(meta.health().unwrap(), Some(DatabaseHealth::Halted));
        assert_eq!(DatabaseHealth::Halted.to_string(), "halted");
    }
}
