use crate::{db::DB, errors::StoreError};

use super::prelude::{BatchDbWriter, Cache, DbKey, DbWriter};
use rocksdb::WriteBatch;
use serde::{Serialize, de::DeserializeOwned};
use std::{collections::hash_map::RandomState, hash::BuildHasher, sync::Arc};

/// A concurrent DB store access with typed caching
#[derive(Clone)]
pub struct CachedDbAccess<TKey, TData, S = RandomState>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
{
    db: Arc<DB>,

    // Cache
    cache: Cache<TKey, TData, S>,

    // DB bucket/path
    prefix: Vec<u8>,
}

impl<TKey, TData, S> CachedDbAccess<TKey, TData, S>
where
    TKey: Clone + std::hash::Hash + Eq + Send + Sync,
    TData: Clone + Send + Sync,
    S: BuildHasher + Default,
{
    pub fn new(db: Arc<DB>, cache_size: u64, prefix: Vec<u8>) -> Self {
        Self { db, cache: Cache::new(cache_size), prefix }
    }

    pub fn has(&self, key: TKey) -> Result<bool, StoreError>
    where
        TKey: AsRef<[u8]>,
    {
        Ok(self.cache.contains_key(&key) || self.db.get_pinned(DbKey::new(&self.prefix, key))?.is_some())
    }

    pub fn read(&self, key: TKey) -> Result<TData, StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: DeserializeOwned,
    {
        if let Some(data) = self.cache.get(&key) {
            return Ok(data);
        }
        let db_key = DbKey::new(&self.prefix, key.clone());
        match self.db.get_pinned(&db_key)? {
            Some(slice) => {
                let data: TData = bincode::deserialize(&slice)?;
                self.cache.insert(key, data.clone());
                Ok(data)
            }
            None => Err(StoreError::KeyNotFound(db_key)),
        }
    }

    pub fn write(&self, mut writer: impl DbWriter, key: TKey, data: TData) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let bin_data = bincode::serialize(&data)?;
        writer.put(DbKey::new(&self.prefix, key.clone()), bin_data)?;
        self.cache.insert(key, data);
        Ok(())
    }

    /// Commits every pair in a single batch. The cache is populated only once the batch
    /// is written, so a failure leaves neither the store nor the cache partially updated.
    pub fn write_many(&self, iter: impl IntoIterator<Item = (TKey, TData)>) -> Result<(), StoreError>
    where
        TKey: AsRef<[u8]>,
        TData: Serialize,
    {
        let mut batch = WriteBatch::default();
        let mut writer = BatchDbWriter::new(&mut batch);
        let mut written = Vec::new();
        for (key, data) in iter {
            writer.put(DbKey::new(&self.prefix, key.clone()), bincode::serialize(&data)?)?;
            written.push((key, data));
        }
        self.db.write(batch)?;
        for (key, data) in written {
            self.cache.insert(key, data);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        create_temp_db,
        prelude::{ConnBuilder, DirectDbWriter, StoreResultExtensions},
    };
    use serde::ser::{Error as _, Serializer};
    use tangle_hashes::Hash;

    #[test]
    fn test_access_read_write() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let access = CachedDbAccess::<Hash, u64>::new(db.clone(), 2, vec![1, 2]);
        let other = CachedDbAccess::<Hash, u64>::new(db.clone(), 2, vec![1, 3]);

        access.write_many((0..16u64).map(|i| (i.into(), i * 10))).unwrap();
        other.write(DirectDbWriter::new(&db), 1.into(), 7).unwrap();

        // Cache holds 2 entries, the rest is read back from disk
        for i in 0..16u64 {
            assert_eq!(access.read(i.into()).unwrap(), i * 10);
        }
        assert!(access.has(3.into()).unwrap());
        assert!(!access.has(16.into()).unwrap());
        assert!(access.read(16.into()).optional().unwrap().is_none());
        // Prefixes keep the two stores apart
        assert_eq!(other.read(1.into()).unwrap(), 7);
        assert!(!other.has(2.into()).unwrap());
    }

    #[derive(Clone)]
    struct Flaky(bool);

    impl Serialize for Flaky {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            if self.0 { serializer.serialize_bool(true) } else { Err(S::Error::custom("unserializable")) }
        }
    }

    #[test]
    fn test_failed_batch_leaves_cache_and_store_untouched() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let access = CachedDbAccess::<Hash, Flaky>::new(db.clone(), 8, vec![4]);

        assert!(access.write_many([(1.into(), Flaky(true)), (2.into(), Flaky(false))]).is_err());
        assert!(!access.has(1.into()).unwrap());
        assert!(!access.has(2.into()).unwrap());

        access.write_many([(1.into(), Flaky(true)), (3.into(), Flaky(true))]).unwrap();
        // A fresh accessor has an empty cache and reads from disk
        let reloaded = CachedDbAccess::<Hash, Flaky>::new(db.clone(), 8, vec![4]);
        assert!(reloaded.has(1.into()).unwrap());
        assert!(reloaded.has(3.into()).unwrap());
    }
}
