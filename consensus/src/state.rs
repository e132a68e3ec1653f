use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tangle_consensus_core::CheckpointIndex;

/// A coherent copy of the three consensus indices
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusIndices {
    /// Highest checkpoint index observed
    pub latest: CheckpointIndex,
    /// Highest checkpoint index whose whole past is present locally
    pub solid: CheckpointIndex,
    /// History below this index has been discarded
    pub pruning: CheckpointIndex,
}

/// The process-wide consensus pointers.
///
/// All three indices only ever increase and `solid <= latest` holds at any observation
/// point. Mutations go through the `try_advance_*` accessors, each one being a single
/// read-modify-write under the write lock.
#[derive(Debug, Default)]
pub struct ConsensusState {
    indices: RwLock<ConsensusIndices>,
}

impl ConsensusState {
    pub fn new(mut indices: ConsensusIndices) -> Self {
        indices.solid = indices.solid.min(indices.latest);
        Self { indices: RwLock::new(indices) }
    }

    pub fn latest_index(&self) -> CheckpointIndex {
        self.indices.read().latest
    }

    pub fn solid_index(&self) -> CheckpointIndex {
        self.indices.read().solid
    }

    pub fn pruning_index(&self) -> CheckpointIndex {
        self.indices.read().pruning
    }

    pub fn snapshot(&self) -> ConsensusIndices {
        *self.indices.read()
    }

    /// Raises `latest` to `index` if `index` is higher, after `persist` succeeded.
    ///
    /// The write lock is held while persisting so that concurrent advances persist in
    /// index order. Returns `Ok(false)` if `index` is not higher than `latest`.
    pub fn try_advance_latest<E>(&self, index: CheckpointIndex, persist: impl FnOnce() -> Result<(), E>) -> Result<bool, E> {
        let mut indices = self.indices.write();
        if index <= indices.latest {
            return Ok(false);
        }
        persist()?;
        indices.latest = index;
        Ok(true)
    }

    /// Compare-and-set of `solid` from `expected` to `new`, after `persist` succeeded.
    ///
    /// Fails with `Ok(false)` when `solid` moved away from `expected`, when `new` does not
    /// increase it or when `new` would pass `latest`.
    pub fn try_advance_solid<E>(
        &self,
        expected: CheckpointIndex,
        new: CheckpointIndex,
        persist: impl FnOnce() -> Result<(), E>,
    ) -> Result<bool, E> {
        let mut indices = self.indices.write();
        if indices.solid != expected || new <= expected || new > indices.latest {
            return Ok(false);
        }
        persist()?;
        indices.solid = new;
        Ok(true)
    }

    /// Raises the pruning floor. Lower values are ignored.
    pub fn set_pruning_index(&self, index: CheckpointIndex) -> bool {
        let mut indices = self.indices.write();
        if index <= indices.pruning {
            return false;
        }
        indices.pruning = index;
        true
    }
}
