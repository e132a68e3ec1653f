//! In-memory doubles of the stores and of the peer layer, shared by the consensus tests

use crate::model::stores::checkpoints::{CheckpointStore, CheckpointStoreReader, LatestCheckpoint};
use parking_lot::{Mutex, RwLock};
use std::{
    collections::{HashMap, HashSet},
    ops::RangeInclusive,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
    thread,
    time::Duration,
};
use tangle_consensus_core::{
    CheckpointIndex,
    api::{AncestorRequester, TangleReader, TangleStore},
    checkpoint::{AncestorRefs, CheckpointMarker, MarkerHandle},
};
use tangle_database::{
    prelude::{DbKey, StoreError, StoreResult},
    registry::DatabaseStorePrefixes,
};
use tangle_hashes::{Hash, ZERO_HASH};

#[derive(Default)]
struct CheckpointData {
    latest: Option<LatestCheckpoint>,
    solid: Option<CheckpointIndex>,
    pruning: Option<CheckpointIndex>,
    markers: HashMap<CheckpointIndex, CheckpointMarker>,
}

/// A `CheckpointStore` held in memory, whose writes can be made to fail
#[derive(Default)]
pub struct MemoryCheckpointStore {
    data: RwLock<CheckpointData>,
    fail_writes: AtomicBool,
    latest_writes: AtomicUsize,
}

impl MemoryCheckpointStore {
    /// While set, every index write fails. Marker inserts are not affected.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful latest checkpoint writes
    pub fn latest_writes(&self) -> usize {
        self.latest_writes.load(Ordering::SeqCst)
    }

    fn check_writable(&self, key: &str) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::DataInconsistency(format!("write of {} refused", key)));
        }
        Ok(())
    }
}

fn not_found(prefix: DatabaseStorePrefixes, key: impl AsRef<[u8]>) -> StoreError {
    StoreError::KeyNotFound(DbKey::new(&[u8::from(prefix)], key))
}

impl CheckpointStoreReader for MemoryCheckpointStore {
    fn latest_checkpoint(&self) -> StoreResult<LatestCheckpoint> {
        self.data.read().latest.ok_or_else(|| not_found(DatabaseStorePrefixes::LatestCheckpoint, [0u8; 0]))
    }

    fn solid_index(&self) -> StoreResult<CheckpointIndex> {
        self.data.read().solid.ok_or_else(|| not_found(DatabaseStorePrefixes::SolidCheckpoint, [0u8; 0]))
    }

    fn pruning_index(&self) -> StoreResult<CheckpointIndex> {
        self.data.read().pruning.ok_or_else(|| not_found(DatabaseStorePrefixes::PruningIndex, [0u8; 0]))
    }

    fn marker(&self, index: CheckpointIndex) -> StoreResult<CheckpointMarker> {
        self.data.read().markers.get(&index).cloned().ok_or_else(|| not_found(DatabaseStorePrefixes::CheckpointMarkers, index.to_be_bytes()))
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn set_latest_checkpoint(&self, marker: &CheckpointMarker) -> StoreResult<()> {
        self.check_writable("latest")?;
        self.data.write().latest = Some(LatestCheckpoint { index: marker.index, id: marker.id });
        self.latest_writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_solid_index(&self, index: CheckpointIndex) -> StoreResult<()> {
        self.check_writable("solid")?;
        self.data.write().solid = Some(index);
        Ok(())
    }

    fn set_pruning_index(&self, index: CheckpointIndex) -> StoreResult<()> {
        self.check_writable("pruning")?;
        self.data.write().pruning = Some(index);
        Ok(())
    }

    fn insert_marker(&self, marker: &CheckpointMarker) -> StoreResult<()> {
        self.data.write().markers.insert(marker.index, marker.clone());
        Ok(())
    }
}

/// A tangle held in memory. Reads can be slowed down and their concurrency is tracked.
#[derive(Default)]
pub struct MemoryTangle {
    entries: RwLock<HashMap<Hash, AncestorRefs>>,
    solid: RwLock<HashSet<Hash>>,
    read_delay: Mutex<Duration>,
    readers: AtomicUsize,
    max_readers: AtomicUsize,
}

impl MemoryTangle {
    pub fn insert(&self, hash: Hash, ancestors: AncestorRefs) {
        self.entries.write().insert(hash, ancestors);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        *self.read_delay.lock() = delay;
    }

    /// Highest number of `ancestors` calls observed running at the same time
    pub fn max_concurrent_readers(&self) -> usize {
        self.max_readers.load(Ordering::SeqCst)
    }
}

impl TangleReader for MemoryTangle {
    fn ancestors(&self, hash: Hash) -> Option<AncestorRefs> {
        let readers = self.readers.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_readers.fetch_max(readers, Ordering::SeqCst);
        let delay = *self.read_delay.lock();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
        let refs = self.entries.read().get(&hash).copied();
        self.readers.fetch_sub(1, Ordering::SeqCst);
        refs
    }

    fn is_solid(&self, hash: Hash) -> bool {
        self.solid.read().contains(&hash)
    }
}

impl TangleStore for MemoryTangle {
    fn mark_solid(&self, hashes: &[Hash]) {
        self.solid.write().extend(hashes.iter().copied());
    }
}

/// Records ancestor and entry requests. Ancestor requests keep their marker reference
/// until [`RecordingRequester::complete_requests`] is called.
#[derive(Default)]
pub struct RecordingRequester {
    ancestors: Mutex<Vec<MarkerHandle>>,
    completed: Mutex<Vec<CheckpointIndex>>,
    entries: Mutex<Vec<Hash>>,
    checkpoints: Mutex<Vec<CheckpointIndex>>,
}

impl RecordingRequester {
    /// Indices of all checkpoints whose ancestors were requested, completed or not
    pub fn ancestor_requests(&self) -> Vec<CheckpointIndex> {
        let mut indices = self.completed.lock().clone();
        indices.extend(self.ancestors.lock().iter().map(|m| m.index));
        indices
    }

    /// Releases the markers held by pending ancestor requests
    pub fn complete_requests(&self) {
        let pending = std::mem::take(&mut *self.ancestors.lock());
        self.completed.lock().extend(pending.iter().map(|m| m.index));
    }

    pub fn entry_requests(&self) -> Vec<Hash> {
        self.entries.lock().clone()
    }

    pub fn checkpoint_requests(&self) -> Vec<CheckpointIndex> {
        self.checkpoints.lock().clone()
    }
}

impl AncestorRequester for RecordingRequester {
    fn request_ancestors(&self, marker: MarkerHandle) {
        self.ancestors.lock().push(marker);
    }

    fn request_entries(&self, hashes: Vec<Hash>) {
        self.entries.lock().extend(hashes);
    }

    fn request_checkpoint(&self, index: CheckpointIndex) {
        self.checkpoints.lock().push(index);
    }
}

/// Hash of the trunk (`slot` 0) or branch (`slot` 1) entry of checkpoint `index`
pub fn chain_entry(index: CheckpointIndex, slot: u64) -> Hash {
    Hash::from(((index as u64) << 8) | 0x80 | slot)
}

/// Inserts the entries and markers of consecutive checkpoints. The trunk entry of each
/// checkpoint references both entries of the previous one, its branch references the
/// previous trunk. The first checkpoint of the range references the zero hash.
pub fn checkpoint_chain(
    tangle: &MemoryTangle,
    store: &dyn CheckpointStore,
    indices: RangeInclusive<CheckpointIndex>,
) -> Vec<CheckpointMarker> {
    let mut previous = AncestorRefs::new(ZERO_HASH, ZERO_HASH);
    indices
        .map(|index| {
            let refs = AncestorRefs::new(chain_entry(index, 0), chain_entry(index, 1));
            tangle.insert(refs.trunk, previous);
            tangle.insert(refs.branch, AncestorRefs::new(previous.trunk, previous.trunk));
            let marker = CheckpointMarker::new(index, refs);
            // In-memory inserts never fail
            let _ = store.insert_marker(&marker);
            previous = refs;
            marker
        })
        .collect()
}
