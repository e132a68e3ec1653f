use super::solidification::{SolidificationScheduler, SolidificationTask};
use crate::{model::stores::checkpoints::CheckpointStore, state::ConsensusState};
use std::sync::{Arc, atomic::Ordering};
use tangle_consensus_core::{
    api::{AncestorRequester, counters::ProcessingCounters},
    checkpoint::MarkerHandle,
    errors::{FatalError, FatalResult},
};
use tangle_core::{debug, error, info};
use tangle_notify::{bus::EventBus, notification::Notification};

/// Position of a processed checkpoint relative to the solid index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolidityBranch {
    /// Beyond solidity, its two ancestors were requested
    BeyondSolid,
    /// At or below the solid index and above the pruning floor, nothing requested
    BehindSolid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingOutcome {
    pub latest_changed: bool,
    pub branch: SolidityBranch,
}

/// Absorbs validated checkpoint markers into the consensus state
pub struct CheckpointProcessor {
    state: Arc<ConsensusState>,
    store: Arc<dyn CheckpointStore>,
    bus: Arc<EventBus>,
    requester: Arc<dyn AncestorRequester>,
    scheduler: Arc<SolidificationScheduler>,
    counters: Arc<ProcessingCounters>,
}

impl CheckpointProcessor {
    pub fn new(
        state: Arc<ConsensusState>,
        store: Arc<dyn CheckpointStore>,
        bus: Arc<EventBus>,
        requester: Arc<dyn AncestorRequester>,
        scheduler: Arc<SolidificationScheduler>,
        counters: Arc<ProcessingCounters>,
    ) -> Self {
        Self { state, store, bus, requester, scheduler, counters }
    }

    /// Processes a checkpoint marker which passed validation.
    ///
    /// Takes ownership of the handle: the reference is released before returning on
    /// every path, including the fatal one. Observers and the ancestor requester get
    /// their own retained references.
    ///
    /// A failure to persist a new latest checkpoint is logged and leaves the latest
    /// index unchanged. A marker at or below the solid index and below the pruning
    /// index is a consistency violation, returned as [`FatalError`] to the caller
    /// which must shut the node down.
    pub fn process_checkpoint(&self, marker: MarkerHandle) -> FatalResult<ProcessingOutcome> {
        self.counters.checkpoints_received.fetch_add(1, Ordering::Relaxed);
        self.bus.publish(Notification::CheckpointReceived(marker.retain()));

        let indices = self.state.snapshot();
        let index = marker.index;

        let mut latest_changed = false;
        if index > indices.latest {
            match self.state.try_advance_latest(index, || self.store.set_latest_checkpoint(&marker)) {
                Ok(true) => {
                    latest_changed = true;
                    self.counters.latest_updates.fetch_add(1, Ordering::Relaxed);
                    debug!("latest checkpoint changed to {}", marker);
                    self.bus.publish(Notification::LatestCheckpointChanged(marker.retain()));
                }
                Ok(false) => {}
                Err(err) => error!("cannot persist latest checkpoint {}: {}", marker, err),
            }
        }

        self.scheduler.submit(SolidificationTask { target_index: index });
        self.counters.solidification_tasks.fetch_add(1, Ordering::Relaxed);

        if index > indices.solid {
            info!("Valid checkpoint detected! Index: {} ({})", index, marker.id);
            self.counters.ancestor_requests.fetch_add(1, Ordering::Relaxed);
            self.requester.request_ancestors(marker);
            return Ok(ProcessingOutcome { latest_changed, branch: SolidityBranch::BeyondSolid });
        }

        let pruning_index = self.state.pruning_index();
        if index < pruning_index {
            return Err(FatalError::BelowPruningIndex { index, id: marker.id, pruning_index });
        }
        Ok(ProcessingOutcome { latest_changed, branch: SolidityBranch::BehindSolid })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::stores::checkpoints::CheckpointStoreReader,
        pipeline::solidification::Solidifier,
        state::ConsensusIndices,
        test_helpers::{MemoryCheckpointStore, MemoryTangle, RecordingRequester},
    };
    use parking_lot::Mutex;
    use tangle_consensus_core::checkpoint::{AncestorRefs, CheckpointMarker};
    use tangle_core::core::EXIT_CODE_CONSISTENCY_VIOLATION;
    use tangle_notify::events::EventType;

    struct Context {
        state: Arc<ConsensusState>,
        store: Arc<MemoryCheckpointStore>,
        requester: Arc<RecordingRequester>,
        scheduler: Arc<SolidificationScheduler>,
        processor: CheckpointProcessor,
        counters: Arc<ProcessingCounters>,
        events: Arc<Mutex<Vec<(EventType, u32)>>>,
    }

    /// Builds a processor whose scheduler is never started, so tasks stay queued
    fn context(latest: u32, solid: u32, pruning: u32) -> Context {
        let state = Arc::new(ConsensusState::new(ConsensusIndices { latest, solid, pruning }));
        let store = Arc::new(MemoryCheckpointStore::default());
        let requester = Arc::new(RecordingRequester::default());
        let bus = Arc::new(EventBus::new());
        let counters = Arc::new(ProcessingCounters::default());
        let events = Arc::new(Mutex::new(Vec::new()));
        for event in [EventType::CheckpointReceived, EventType::LatestCheckpointChanged] {
            let events = events.clone();
            bus.subscribe_fn(event, move |n| {
                if let Some(marker) = n.marker() {
                    events.lock().push((n.event_type(), marker.index));
                }
            });
        }
        let solidifier = Arc::new(Solidifier::new(
            state.clone(),
            store.clone(),
            Arc::new(MemoryTangle::default()),
            requester.clone(),
            bus.clone(),
            counters.clone(),
        ));
        let scheduler = Arc::new(SolidificationScheduler::new(solidifier));
        let processor =
            CheckpointProcessor::new(state.clone(), store.clone(), bus, requester.clone(), scheduler.clone(), counters.clone());
        Context { state, store, requester, scheduler, processor, counters, events }
    }

    fn marker(index: u32) -> MarkerHandle {
        MarkerHandle::new(CheckpointMarker::new(index, AncestorRefs::new((index as u64 * 2).into(), (index as u64 * 2 + 1).into())))
    }

    #[test]
    fn test_beyond_solid_requests_ancestors() {
        let ctx = context(60, 50, 10);
        let handle = marker(100);
        let outcome = ctx.processor.process_checkpoint(handle.retain()).unwrap();
        assert_eq!(outcome, ProcessingOutcome { latest_changed: true, branch: SolidityBranch::BeyondSolid });
        assert_eq!(ctx.state.latest_index(), 100);
        assert_eq!(ctx.store.latest_checkpoint().unwrap().index, 100);
        assert_eq!(ctx.requester.ancestor_requests(), vec![100]);
        assert_eq!(ctx.scheduler.pending(), 1);
        assert_eq!(
            *ctx.events.lock(),
            vec![(EventType::CheckpointReceived, 100), (EventType::LatestCheckpointChanged, 100)]
        );

        // The requester holds the only other reference until the request completes
        assert_eq!(handle.ref_count(), 2);
        ctx.requester.complete_requests();
        assert_eq!(handle.ref_count(), 1);
    }

    #[test]
    fn test_below_pruning_index_is_fatal() {
        let ctx = context(60, 50, 10);
        let handle = marker(5);
        let err = ctx.processor.process_checkpoint(handle.retain()).unwrap_err();
        assert_eq!(err, FatalError::BelowPruningIndex { index: 5, id: handle.id, pruning_index: 10 });
        assert_eq!(err.exit_code(), EXIT_CODE_CONSISTENCY_VIOLATION);
        assert!(ctx.requester.ancestor_requests().is_empty());
        assert_eq!(ctx.state.latest_index(), 60);
        // Nothing is leaked on the fatal path
        assert_eq!(handle.ref_count(), 1);
    }

    #[test]
    fn test_behind_solid_takes_no_action() {
        let ctx = context(60, 50, 10);
        let handle = marker(20);
        let outcome = ctx.processor.process_checkpoint(handle.retain()).unwrap();
        assert_eq!(outcome, ProcessingOutcome { latest_changed: false, branch: SolidityBranch::BehindSolid });
        assert!(ctx.requester.ancestor_requests().is_empty());
        assert_eq!(ctx.scheduler.pending(), 1);
        assert_eq!(*ctx.events.lock(), vec![(EventType::CheckpointReceived, 20)]);
        assert_eq!(handle.ref_count(), 1);
    }

    #[test]
    fn test_pruning_floor_itself_is_not_fatal() {
        let ctx = context(60, 50, 10);
        assert!(ctx.processor.process_checkpoint(marker(10)).is_ok());
    }

    #[test]
    fn test_latest_tracks_maximum() {
        let ctx = context(0, 0, 0);
        for index in 1..=20 {
            ctx.processor.process_checkpoint(marker(index)).unwrap();
            // Duplicates do not update again
            ctx.processor.process_checkpoint(marker(index)).unwrap();
            let snapshot = ctx.state.snapshot();
            assert_eq!(snapshot.latest, index);
            assert!(snapshot.solid <= snapshot.latest);
        }
        let counters = ctx.counters.snapshot();
        assert_eq!(counters.checkpoints_received, 40);
        assert_eq!(counters.latest_updates, 20);
        assert_eq!(counters.solidification_tasks, 40);
        assert_eq!(ctx.store.latest_writes(), 20);

        // An older marker arriving late leaves latest untouched
        let outcome = ctx.processor.process_checkpoint(marker(7)).unwrap();
        assert!(!outcome.latest_changed);
        assert_eq!(ctx.state.latest_index(), 20);
    }

    #[test]
    fn test_persistence_failure_is_recovered() {
        let ctx = context(3, 0, 0);
        ctx.store.fail_writes(true);
        let outcome = ctx.processor.process_checkpoint(marker(4)).unwrap();
        assert_eq!(outcome, ProcessingOutcome { latest_changed: false, branch: SolidityBranch::BeyondSolid });
        assert_eq!(ctx.state.latest_index(), 3);
        assert_eq!(*ctx.events.lock(), vec![(EventType::CheckpointReceived, 4)]);

        // A retry once the store recovers advances latest
        ctx.store.fail_writes(false);
        assert!(ctx.processor.process_checkpoint(marker(4)).unwrap().latest_changed);
        assert_eq!(ctx.state.latest_index(), 4);
    }

    #[test]
    fn test_retaining_observer_keeps_marker_alive() {
        let ctx = context(0, 0, 0);
        let retained = Arc::new(Mutex::new(Vec::new()));
        {
            let retained = retained.clone();
            ctx.processor.bus.subscribe_fn(EventType::LatestCheckpointChanged, move |n| {
                if let Some(marker) = n.marker() {
                    retained.lock().push(marker.retain());
                }
            });
        }
        let handle = marker(1);
        ctx.processor.process_checkpoint(handle.retain()).unwrap();
        ctx.requester.complete_requests();
        assert_eq!(handle.ref_count(), 2);
        retained.lock().clear();
        assert_eq!(handle.ref_count(), 1);
    }
}
