use crate::{db::DB, errors::StoreResult};
use log::debug;
use rocksdb::{BottommostLevelCompaction, CompactOptions};

const TOTAL_SST_FILES_SIZE: &str = "rocksdb.total-sst-files-size";
const ESTIMATE_LIVE_DATA_SIZE: &str = "rocksdb.estimate-live-data-size";

/// Result of a single compaction attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionOutcome {
    /// A compaction ran and shrank the on-disk data by `reclaimed_bytes`
    Compacted { reclaimed_bytes: u64 },
    /// The share of garbage is below the discard ratio, or compacting freed nothing
    NothingToCompact,
}

/// The compaction and durability primitives of an embedded key-value store
pub trait StorageEngine: Send + Sync {
    /// Runs one compaction if the estimated share of reclaimable data is at least
    /// `discard_ratio` of the on-disk size.
    ///
    /// Every `Compacted` outcome strictly lowers the on-disk size, so repeating
    /// the call until `NothingToCompact` terminates.
    fn compact(&self, discard_ratio: f64) -> StoreResult<CompactionOutcome>;

    /// Persists buffered writes and syncs the write-ahead log
    fn flush(&self) -> StoreResult<()>;
}

impl DB {
    fn int_property(&self, name: &str) -> StoreResult<u64> {
        Ok(self.property_int_value(name)?.unwrap_or_default())
    }

    pub fn sst_files_size(&self) -> StoreResult<u64> {
        self.int_property(TOTAL_SST_FILES_SIZE)
    }
}

impl StorageEngine for DB {
    fn compact(&self, discard_ratio: f64) -> StoreResult<CompactionOutcome> {
        let total = self.int_property(TOTAL_SST_FILES_SIZE)?;
        let live = self.int_property(ESTIMATE_LIVE_DATA_SIZE)?;
        let garbage = total.saturating_sub(live);
        debug!("storage engine: {} bytes on disk, {} estimated live", total, live);
        if total == 0 || (garbage as f64) < discard_ratio * total as f64 {
            return Ok(CompactionOutcome::NothingToCompact);
        }

        let mut opts = CompactOptions::default();
        opts.set_bottommost_level_compaction(BottommostLevelCompaction::Force);
        self.compact_range_opt(None::<&[u8]>, None::<&[u8]>, &opts);

        let reclaimed_bytes = total.saturating_sub(self.int_property(TOTAL_SST_FILES_SIZE)?);
        if reclaimed_bytes == 0 {
            return Ok(CompactionOutcome::NothingToCompact);
        }
        Ok(CompactionOutcome::Compacted { reclaimed_bytes })
    }

    fn flush(&self) -> StoreResult<()> {
        (**self).flush()?;
        self.flush_wal(true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_temp_db, prelude::ConnBuilder};

    #[test]
    fn test_empty_store_has_nothing_to_compact() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        assert_eq!(db.compact(0.01).unwrap(), CompactionOutcome::NothingToCompact);
        StorageEngine::flush(&*db).unwrap();
    }

    #[test]
    fn test_repeated_compaction_settles() {
        let (_lifetime, db) = create_temp_db!(ConnBuilder::default().with_files_limit(10));
        let value = vec![7u8; 1024];
        for round in 0..4u32 {
            for i in 0..2_000u32 {
                db.put([round.to_be_bytes(), i.to_be_bytes()].concat(), &value).unwrap();
            }
            StorageEngine::flush(&*db).unwrap();
        }
        for round in 0..3u32 {
            for i in 0..2_000u32 {
                db.delete([round.to_be_bytes(), i.to_be_bytes()].concat()).unwrap();
            }
        }
        StorageEngine::flush(&*db).unwrap();

        let mut settled = false;
        for _ in 0..16 {
            if db.compact(0.01).unwrap() == CompactionOutcome::NothingToCompact {
                settled = true;
                break;
            }
        }
        assert!(settled);
        assert!(db.sst_files_size().unwrap() > 0);
    }
}
