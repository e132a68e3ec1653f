use std::sync::Arc;
use tangle_consensus_core::{
    api::{TangleReader, TangleStore},
    checkpoint::AncestorRefs,
};
use tangle_core::warn;
use tangle_database::{
    prelude::{CachedDbAccess, DB, DirectDbWriter, StoreResult, StoreResultExtensions},
    registry::DatabaseStorePrefixes,
};
use tangle_hashes::Hash;

/// Tangle entries by hash, holding the two references of each entry, plus the set of
/// entries known to be solid.
#[derive(Clone)]
pub struct DbTangleStore {
    db: Arc<DB>,
    entries: CachedDbAccess<Hash, AncestorRefs>,
    solid: CachedDbAccess<Hash, ()>,
}

impl DbTangleStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self {
            db: Arc::clone(&db),
            entries: CachedDbAccess::new(db.clone(), cache_size, DatabaseStorePrefixes::Entries.into()),
            solid: CachedDbAccess::new(db, cache_size, DatabaseStorePrefixes::SolidEntries.into()),
        }
    }

    /// Stores an entry delivered by the peer layer
    pub fn insert_entry(&self, hash: Hash, ancestors: AncestorRefs) -> StoreResult<()> {
        self.entries.write(DirectDbWriter::new(&self.db), hash, ancestors)
    }

    pub fn get_ancestors(&self, hash: Hash) -> StoreResult<Option<AncestorRefs>> {
        self.entries.read(hash).optional()
    }
}

impl TangleReader for DbTangleStore {
    fn ancestors(&self, hash: Hash) -> Option<AncestorRefs> {
        self.get_ancestors(hash).unwrap_or_else(|err| {
            warn!("cannot read tangle entry {}: {}", hash, err);
            None
        })
    }

    fn is_solid(&self, hash: Hash) -> bool {
        self.solid.has(hash).unwrap_or_else(|err| {
            warn!("cannot read the solidity of entry {}: {}", hash, err);
            false
        })
    }
}

impl TangleStore for DbTangleStore {
    fn mark_solid(&self, hashes: &[Hash]) {
        if let Err(err) = self.solid.write_many(hashes.iter().map(|hash| (*hash, ()))) {
            warn!("cannot persist {} solid entries: {}", hashes.len(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_database::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_entries_and_solidity() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let store = DbTangleStore::new(db.clone(), 64);
        let refs = AncestorRefs::new(1.into(), 2.into());
        store.insert_entry(3.into(), refs).unwrap();

        assert_eq!(store.ancestors(3.into()), Some(refs));
        assert_eq!(store.ancestors(4.into()), None);
        assert!(!store.is_solid(3.into()));

        store.mark_solid(&[3.into(), 1.into()]);
        assert!(store.is_solid(3.into()));
        assert!(store.is_solid(1.into()));
        assert!(!store.is_solid(2.into()));

        // Solidity is persisted, not only cached
        let reopened = DbTangleStore::new(db, 64);
        assert!(reopened.is_solid(3.into()));
        assert!(reopened.is_solid(1.into()));
    }
}
