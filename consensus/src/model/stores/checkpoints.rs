use crate::state::ConsensusIndices;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tangle_consensus_core::{CheckpointIndex, checkpoint::CheckpointMarker};
use tangle_database::{
    prelude::{CachedDbAccess, CachedDbItem, DB, DirectDbWriter, StoreResult, StoreResultExtensions},
    registry::DatabaseStorePrefixes,
};
use tangle_hashes::Hash;

/// The latest checkpoint as persisted: its index and id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestCheckpoint {
    pub index: CheckpointIndex,
    pub id: Hash,
}

/// Big-endian encoding, so that the store iterates markers in index order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CheckpointIndexKey([u8; 4]);

impl From<CheckpointIndex> for CheckpointIndexKey {
    fn from(index: CheckpointIndex) -> Self {
        Self(index.to_be_bytes())
    }
}

impl AsRef<[u8]> for CheckpointIndexKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Reader API for `CheckpointStore`.
pub trait CheckpointStoreReader {
    fn latest_checkpoint(&self) -> StoreResult<LatestCheckpoint>;
    fn solid_index(&self) -> StoreResult<CheckpointIndex>;
    fn pruning_index(&self) -> StoreResult<CheckpointIndex>;
    fn marker(&self, index: CheckpointIndex) -> StoreResult<CheckpointMarker>;

    /// The persisted indices, zero for any index never written
    fn indices(&self) -> StoreResult<ConsensusIndices> {
        Ok(ConsensusIndices {
            latest: self.latest_checkpoint().optional()?.map(|latest| latest.index).unwrap_or_default(),
            solid: self.solid_index().optional()?.unwrap_or_default(),
            pruning: self.pruning_index().optional()?.unwrap_or_default(),
        })
    }
}

pub trait CheckpointStore: CheckpointStoreReader + Send + Sync {
    fn set_latest_checkpoint(&self, marker: &CheckpointMarker) -> StoreResult<()>;
    fn set_solid_index(&self, index: CheckpointIndex) -> StoreResult<()>;
    fn set_pruning_index(&self, index: CheckpointIndex) -> StoreResult<()>;
    fn insert_marker(&self, marker: &CheckpointMarker) -> StoreResult<()>;
}

/// A DB + cache implementation of `CheckpointStore` trait, with concurrent readers support.
#[derive(Clone)]
pub struct DbCheckpointStore {
    db: Arc<DB>,
    latest: CachedDbItem<LatestCheckpoint>,
    solid: CachedDbItem<CheckpointIndex>,
    pruning: CachedDbItem<CheckpointIndex>,
    markers: CachedDbAccess<CheckpointIndexKey, CheckpointMarker>,
}

impl DbCheckpointStore {
    pub fn new(db: Arc<DB>, cache_size: u64) -> Self {
        Self {
            db: Arc::clone(&db),
            latest: CachedDbItem::new(db.clone(), DatabaseStorePrefixes::LatestCheckpoint.into()),
            solid: CachedDbItem::new(db.clone(), DatabaseStorePrefixes::SolidCheckpoint.into()),
            pruning: CachedDbItem::new(db.clone(), DatabaseStorePrefixes::PruningIndex.into()),
            markers: CachedDbAccess::new(db, cache_size, DatabaseStorePrefixes::CheckpointMarkers.into()),
        }
    }

    pub fn clone_with_new_cache(&self, cache_size: u64) -> Self {
        Self::new(Arc::clone(&self.db), cache_size)
    }
}

impl CheckpointStoreReader for DbCheckpointStore {
    fn latest_checkpoint(&self) -> StoreResult<LatestCheckpoint> {
        self.latest.read()
    }

    fn solid_index(&self) -> StoreResult<CheckpointIndex> {
        self.solid.read()
    }

    fn pruning_index(&self) -> StoreResult<CheckpointIndex> {
        self.pruning.read()
    }

    fn marker(&self, index: CheckpointIndex) -> StoreResult<CheckpointMarker> {
        self.markers.read(index.into())
    }
}

impl CheckpointStore for DbCheckpointStore {
    fn set_latest_checkpoint(&self, marker: &CheckpointMarker) -> StoreResult<()> {
        self.latest.write(DirectDbWriter::durable(&self.db), &LatestCheckpoint { index: marker.index, id: marker.id })
    }

    fn set_solid_index(&self, index: CheckpointIndex) -> StoreResult<()> {
        self.solid.write(DirectDbWriter::durable(&self.db), &index)
    }

    fn set_pruning_index(&self, index: CheckpointIndex) -> StoreResult<()> {
        self.pruning.write(DirectDbWriter::durable(&self.db), &index)
    }

    fn insert_marker(&self, marker: &CheckpointMarker) -> StoreResult<()> {
        self.markers.write(DirectDbWriter::new(&self.db), marker.index.into(), marker.clone())
    }
}
