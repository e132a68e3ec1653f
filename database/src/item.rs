use crate::{db::DB, errors::StoreError};

use super::prelude::{DbKey, DbWriter};
use parking_lot::RwLock;
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

/// A single DB value with a write-through cache
#[derive(Clone)]
pub struct CachedDbItem<T> {
    db: Arc<DB>,
    key: Vec<u8>,
    cached_item: Arc<RwLock<Option<T>>>,
}

impl<T> CachedDbItem<T> {
    pub fn new(db: Arc<DB>, key: Vec<u8>) -> Self {
        Self { db, key, cached_item: Arc::new(RwLock::new(None)) }
    }

    pub fn read(&self) -> Result<T, StoreError>
    where
        T: Clone + DeserializeOwned,
    {
        if let Some(item) = self.cached_item.read().clone() {
            return Ok(item);
        }
        match self.db.get_pinned(&self.key)? {
            Some(slice) => {
                let item: T = bincode::deserialize(&slice)?;
                *self.cached_item.write() = Some(item.clone());
                Ok(item)
            }
            None => Err(StoreError::KeyNotFound(DbKey::prefix_only(&self.key))),
        }
    }

    /// Serializes first so that a failing write leaves the cache untouched
    pub fn write(&self, mut writer: impl DbWriter, item: &T) -> Result<(), StoreError>
    where
        T: Clone + Serialize,
    {
        let bin_data = bincode::serialize(item)?;
        writer.put(&self.key, bin_data)?;
        *self.cached_item.write() = Some(item.clone());
        Ok(())
    }

}
