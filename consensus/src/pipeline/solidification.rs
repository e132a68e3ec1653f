use crate::{
    model::stores::checkpoints::{CheckpointStore, CheckpointStoreReader},
    processes::solidity::{AncestryStatus, walk_ancestry},
    state::ConsensusState,
};
use std::{
    sync::{Arc, atomic::Ordering},
    thread::JoinHandle,
};
use tangle_consensus_core::{
    CheckpointIndex,
    api::{AncestorRequester, TangleStore, counters::ProcessingCounters},
};
use tangle_core::{debug, info, warn};
use tangle_database::prelude::StoreResultExtensions;
use tangle_notify::{bus::EventBus, notification::Notification};
use tangle_utils::pool::WorkerPool;

/// Request to extend solidity up to `target_index`. Submitting the same target twice
/// is harmless, the second run finds nothing left to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidificationTask {
    pub target_index: CheckpointIndex,
}

/// Advances `solid` one checkpoint at a time by walking the past of each marker
pub struct Solidifier {
    state: Arc<ConsensusState>,
    store: Arc<dyn CheckpointStore>,
    tangle: Arc<dyn TangleStore>,
    requester: Arc<dyn AncestorRequester>,
    bus: Arc<EventBus>,
    counters: Arc<ProcessingCounters>,
}

impl Solidifier {
    pub fn new(
        state: Arc<ConsensusState>,
        store: Arc<dyn CheckpointStore>,
        tangle: Arc<dyn TangleStore>,
        requester: Arc<dyn AncestorRequester>,
        bus: Arc<EventBus>,
        counters: Arc<ProcessingCounters>,
    ) -> Self {
        Self { state, store, tangle, requester, bus, counters }
    }

    /// Solidifies checkpoints `solid + 1 ..= min(target, latest)` in order. Stops at the first
    /// checkpoint whose marker or past is missing, requesting the missing entries.
    pub fn solidify(&self, task: SolidificationTask) {
        loop {
            let indices = self.state.snapshot();
            let next = indices.solid + 1;
            if next > task.target_index.min(indices.latest) {
                return;
            }

            let marker = match self.store.marker(next).optional() {
                Ok(Some(marker)) => marker,
                Ok(None) => {
                    debug!("checkpoint {} was never received, requesting it", next);
                    self.counters.ancestor_requests.fetch_add(1, Ordering::Relaxed);
                    self.requester.request_checkpoint(next);
                    return;
                }
                Err(err) => {
                    warn!("cannot read checkpoint {}: {}", next, err);
                    return;
                }
            };

            match walk_ancestry(self.tangle.as_ref(), marker.ancestors) {
                AncestryStatus::Complete { traversed } => {
                    self.tangle.mark_solid(&traversed);
                    match self.state.try_advance_solid(indices.solid, next, || self.store.set_solid_index(next)) {
                        Ok(true) => {
                            self.counters.checkpoints_solidified.fetch_add(1, Ordering::Relaxed);
                            info!("Checkpoint {} ({}) is solid, {} entries confirmed", next, marker.id, traversed.len());
                            self.bus.publish(Notification::SolidCheckpointChanged { index: next });
                        }
                        Ok(false) => {
                            debug!("solid index moved away from {} while solidifying {}", indices.solid, next);
                            return;
                        }
                        Err(err) => {
                            warn!("cannot persist solid index {}: {}", next, err);
                            return;
                        }
                    }
                }
                AncestryStatus::Incomplete { missing } => {
                    debug!("checkpoint {} is missing {} entries, requesting them", next, missing.len());
                    self.counters.ancestor_requests.fetch_add(1, Ordering::Relaxed);
                    self.requester.request_entries(missing);
                    return;
                }
            }
        }
    }
}

/// A worker pool with concurrency fixed to one. The single worker is what makes
/// solidity advance sequentially: two walks never run at the same time.
pub struct SolidificationScheduler {
    pool: Arc<WorkerPool<SolidificationTask>>,
}

impl SolidificationScheduler {
    pub fn new(solidifier: Arc<Solidifier>) -> Self {
        let pool = WorkerPool::new("solidifier", 1, Arc::new(move |task| solidifier.solidify(task)));
        Self { pool: Arc::new(pool) }
    }

    /// Queues the task without blocking
    pub fn submit(&self, task: SolidificationTask) {
        if let Err(err) = self.pool.submit(task) {
            warn!("dropping solidification task for checkpoint {}: {}", task.target_index, err);
        }
    }

    pub fn pending(&self) -> usize {
        self.pool.pending()
    }

    pub fn start(&self) -> Vec<JoinHandle<()>> {
        self.pool.start()
    }

    pub fn signal_exit(&self) {
        self.pool.signal_exit()
    }
}
