use crate::prelude::{DB, StoreResult};
use rocksdb::{WriteBatch, WriteOptions};

/// Destination of store writes, either the database itself or a pending [`WriteBatch`]
pub trait DbWriter {
    fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> StoreResult<()>;
}

/// Writes straight to the database.
///
/// A durable writer syncs the write-ahead log on every write. Checkpoint indices and the
/// health flag are written durably.
pub struct DirectDbWriter<'a> {
    db: &'a DB,
    opts: Option<WriteOptions>,
}

impl<'a> DirectDbWriter<'a> {
    pub fn new(db: &'a DB) -> Self {
        Self { db, opts: None }
    }

    pub fn durable(db: &'a DB) -> Self {
        let mut opts = WriteOptions::default();
        opts.set_sync(true);
        Self { db, opts: Some(opts) }
    }
}

impl DbWriter for DirectDbWriter<'_> {
    fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> StoreResult<()> {
        match &self.opts {
            Some(opts) => self.db.put_opt(key, value, opts)?,
            None => self.db.put(key, value)?,
        }
        Ok(())
    }
}

/// Collects writes into a batch committed later by the caller
pub struct BatchDbWriter<'a> {
    batch: &'a mut WriteBatch,
}

impl<'a> BatchDbWriter<'a> {
    pub fn new(batch: &'a mut WriteBatch) -> Self {
        Self { batch }
    }
}

impl DbWriter for BatchDbWriter<'_> {
    fn put(&mut self, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> StoreResult<()> {
        self.batch.put(key, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_direct_and_batch_writers() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(16));

        DirectDbWriter::durable(&db).put(b"solid", 7u32.to_le_bytes()).unwrap();
        DirectDbWriter::new(&db).put(b"latest-id", [1u8; 4]).unwrap();

        let mut batch = WriteBatch::default();
        let mut writer = BatchDbWriter::new(&mut batch);
        writer.put(b"latest", 9u32.to_le_bytes()).unwrap();
        writer.put(b"pruning", 2u32.to_le_bytes()).unwrap();
        // Nothing is visible before the batch is committed
        assert!(db.get(b"latest").unwrap().is_none());
        assert_eq!(db.get(b"solid").unwrap().unwrap(), 7u32.to_le_bytes());

        db.write(batch).unwrap();
        assert_eq!(db.get(b"latest").unwrap().unwrap(), 9u32.to_le_bytes());
        assert_eq!(db.get(b"pruning").unwrap().unwrap(), 2u32.to_le_bytes());
    }
}
