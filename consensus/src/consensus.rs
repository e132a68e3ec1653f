use crate::{
    model::stores::checkpoints::{CheckpointStore, CheckpointStoreReader},
    pipeline::{
        ProcessingCounters,
        checkpoint_processor::{CheckpointProcessor, ProcessingOutcome},
        solidification::{SolidificationScheduler, SolidificationTask, Solidifier},
    },
    state::ConsensusState,
};
use std::{sync::Arc, thread::JoinHandle};
use tangle_consensus_core::{
    CheckpointIndex,
    api::{AncestorRequester, TangleStore},
    checkpoint::{CheckpointMarker, MarkerHandle},
    errors::FatalResult,
};
use tangle_core::{core::Core, info, service::Service, trace};
use tangle_database::prelude::StoreResult;
use tangle_notify::bus::EventBus;

/// The consensus bundle: shared state, stores, the checkpoint processor and the
/// solidification worker
pub struct Consensus {
    // State
    state: Arc<ConsensusState>,

    // Stores
    store: Arc<dyn CheckpointStore>,

    // Processors
    processor: Arc<CheckpointProcessor>,
    scheduler: Arc<SolidificationScheduler>,

    // Counters
    pub counters: Arc<ProcessingCounters>,
}

impl Consensus {
    /// Builds consensus on top of the given stores, resuming from the persisted indices
    pub fn new(
        store: Arc<dyn CheckpointStore>,
        tangle: Arc<dyn TangleStore>,
        requester: Arc<dyn AncestorRequester>,
        bus: Arc<EventBus>,
    ) -> StoreResult<Self> {
        let indices = store.indices()?;
        info!("consensus resuming at latest {}, solid {}, pruning {}", indices.latest, indices.solid, indices.pruning);
        let state = Arc::new(ConsensusState::new(indices));
        let counters = Arc::new(ProcessingCounters::default());

        let solidifier = Arc::new(Solidifier::new(
            state.clone(),
            store.clone(),
            tangle,
            requester.clone(),
            bus.clone(),
            counters.clone(),
        ));
        let scheduler = Arc::new(SolidificationScheduler::new(solidifier));
        let processor = Arc::new(CheckpointProcessor::new(
            state.clone(),
            store.clone(),
            bus,
            requester,
            scheduler.clone(),
            counters.clone(),
        ));

        Ok(Self { state, store, processor, scheduler, counters })
    }

    pub fn state(&self) -> &Arc<ConsensusState> {
        &self.state
    }

    pub fn processor(&self) -> &Arc<CheckpointProcessor> {
        &self.processor
    }

    /// Persists a validated marker so that the solidification worker can find it by index
    pub fn store_marker(&self, marker: &CheckpointMarker) -> StoreResult<()> {
        self.store.insert_marker(marker)
    }

    /// See [`CheckpointProcessor::process_checkpoint`]
    pub fn process_checkpoint(&self, marker: MarkerHandle) -> FatalResult<ProcessingOutcome> {
        self.processor.process_checkpoint(marker)
    }

    /// Raises the pruning floor, persisting it first. Returns false if `index` does not raise it.
    pub fn set_pruning_index(&self, index: CheckpointIndex) -> StoreResult<bool> {
        if index <= self.state.pruning_index() {
            return Ok(false);
        }
        self.store.set_pruning_index(index)?;
        Ok(self.state.set_pruning_index(index))
    }

    /// Spawns the solidification worker. A first task resumes solidification up to the
    /// persisted latest checkpoint.
    pub fn run_processors(&self) -> Vec<JoinHandle<()>> {
        let latest = self.state.latest_index();
        if latest > self.state.solid_index() {
            self.scheduler.submit(SolidificationTask { target_index: latest });
        }
        self.scheduler.start()
    }

    pub fn signal_exit(&self) {
        trace!("consensus signaling exit, {} solidification tasks pending", self.scheduler.pending());
        self.scheduler.signal_exit()
    }
}

impl Service for Consensus {
    fn ident(self: Arc<Consensus>) -> &'static str {
        "consensus"
    }

    fn start(self: Arc<Consensus>, _core: Arc<Core>) -> Vec<JoinHandle<()>> {
        self.run_processors()
    }

    fn stop(self: Arc<Consensus>) {
        self.signal_exit()
    }
}
