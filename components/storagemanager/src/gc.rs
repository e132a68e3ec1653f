use crate::errors::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::{
    sync::Arc,
    time::{Duration, Instant, SystemTime},
};
use tangle_core::{debug, info, time::truncate_millis, warn};
use tangle_database::prelude::{CompactionOutcome, StorageEngine, StoreResult};
use tangle_notify::{bus::EventBus, notification::Notification};

/// Discard ratio of a single pass requested without one
pub const DEFAULT_DISCARD_RATIO: f64 = 0.5;

/// Returns freed memory to the operating system after a pass
pub type MemoryReclaimer = fn();

fn no_reclaim() {}

/// Record of one successful compaction pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompactionRun {
    pub start: SystemTime,
    pub end: SystemTime,
    pub outcome: CompactionOutcome,
}

impl CompactionRun {
    /// Bytes freed on disk, zero when there was nothing to compact
    pub fn reclaimed(&self) -> u64 {
        match self.outcome {
            CompactionOutcome::Compacted { reclaimed_bytes } => reclaimed_bytes,
            CompactionOutcome::NothingToCompact => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FullCompactionReport {
    /// Passes which compacted something. The final "nothing to compact" pass is not counted.
    pub passes: usize,
    pub elapsed: Duration,
}

/// Serializes every compaction of the storage engine behind one lock.
///
/// A single pass and a full run compete for the same lock, and a full run holds it for
/// its whole sequence of passes.
pub struct GarbageCollector {
    engine: Mutex<Option<Arc<dyn StorageEngine>>>,
    bus: Arc<EventBus>,
    reclaimer: MemoryReclaimer,
}

impl GarbageCollector {
    pub fn new(engine: Arc<dyn StorageEngine>, bus: Arc<EventBus>) -> Self {
        Self { engine: Mutex::new(Some(engine)), bus, reclaimer: no_reclaim }
    }

    pub fn with_memory_reclaimer(self, reclaimer: MemoryReclaimer) -> Self {
        Self { reclaimer, ..self }
    }

    /// Runs exactly one compaction pass with the default discard ratio
    pub fn run_garbage_collection(&self) -> StorageResult<CompactionRun> {
        self.run_garbage_collection_with_ratio(DEFAULT_DISCARD_RATIO)
    }

    pub fn run_garbage_collection_with_ratio(&self, discard_ratio: f64) -> StorageResult<CompactionRun> {
        let engine = self.engine.lock();
        let engine = engine.as_ref().ok_or(StorageError::Closed)?;
        self.compaction_pass(engine.as_ref(), discard_ratio).map_err(|source| {
            warn!("database garbage collection failed: {}", source);
            StorageError::CompactionFailed { passes: 0, source }
        })
    }

    /// Repeats compaction passes until the engine reports nothing to compact.
    ///
    /// The lock is held for the whole sequence. On failure the loop stops and the error
    /// carries the number of passes completed before it.
    pub fn run_full_garbage_collection(&self, discard_ratio: f64) -> StorageResult<FullCompactionReport> {
        let engine = self.engine.lock();
        let engine = engine.as_ref().ok_or(StorageError::Closed)?;
        let start = Instant::now();
        let mut passes = 0;
        loop {
            match self.compaction_pass(engine.as_ref(), discard_ratio) {
                Ok(run) if run.outcome == CompactionOutcome::NothingToCompact => break,
                Ok(_) => passes += 1,
                Err(source) => {
                    warn!("full database garbage collection aborted after {} passes: {}", passes, source);
                    return Err(StorageError::CompactionFailed { passes, source });
                }
            }
        }
        let elapsed = start.elapsed();
        info!("full database garbage collection done: {} passes in {:?}", passes, truncate_millis(elapsed));
        Ok(FullCompactionReport { passes, elapsed })
    }

    /// Detaches the engine once any running compaction is done. Later requests fail
    /// with [`StorageError::Closed`].
    pub fn close(&self) {
        if self.engine.lock().take().is_some() {
            debug!("garbage collector closed");
        }
    }

    fn compaction_pass(&self, engine: &dyn StorageEngine, discard_ratio: f64) -> StoreResult<CompactionRun> {
        let start = SystemTime::now();
        info!("running database garbage collection");
        self.bus.publish(Notification::CleanupStarted { start });

        let outcome = engine.compact(discard_ratio);
        let end = SystemTime::now();
        let reclaimed = match outcome {
            Ok(CompactionOutcome::Compacted { reclaimed_bytes }) => Some(reclaimed_bytes),
            Ok(CompactionOutcome::NothingToCompact) => Some(0),
            Err(_) => None,
        };
        self.bus.publish(Notification::CleanupFinished { start, end, reclaimed });
        (self.reclaimer)();

        let outcome = outcome?;
        match outcome {
            CompactionOutcome::Compacted { reclaimed_bytes } => debug!("garbage collection reclaimed {} bytes", reclaimed_bytes),
            CompactionOutcome::NothingToCompact => info!("nothing to clean up"),
        }
        Ok(CompactionRun { start, end, outcome })
    }
}
