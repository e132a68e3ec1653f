use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct ProcessingCounters {
    pub checkpoints_received: AtomicU64,
    pub latest_updates: AtomicU64,
    pub solidification_tasks: AtomicU64,
    pub ancestor_requests: AtomicU64,
    pub checkpoints_solidified: AtomicU64,
}

impl ProcessingCounters {
    pub fn snapshot(&self) -> ProcessingCountersSnapshot {
        ProcessingCountersSnapshot {
            checkpoints_received: self.checkpoints_received.load(Ordering::Relaxed),
            latest_updates: self.latest_updates.load(Ordering::Relaxed),
            solidification_tasks: self.solidification_tasks.load(Ordering::Relaxed),
            ancestor_requests: self.ancestor_requests.load(Ordering::Relaxed),
            checkpoints_solidified: self.checkpoints_solidified.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingCountersSnapshot {
    pub checkpoints_received: u64,
    pub latest_updates: u64,
    pub solidification_tasks: u64,
    pub ancestor_requests: u64,
    pub checkpoints_solidified: u64,
}

impl core::ops::Sub for &ProcessingCountersSnapshot {
    type Output = ProcessingCountersSnapshot;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::Output {
            checkpoints_received: self.checkpoints_received.saturating_sub(rhs.checkpoints_received),
            latest_updates: self.latest_updates.saturating_sub(rhs.latest_updates),
            solidification_tasks: self.solidification_tasks.saturating_sub(rhs.solidification_tasks),
            ancestor_requests: self.ancestor_requests.saturating_sub(rhs.ancestor_requests),
            checkpoints_solidified: self.checkpoints_solidified.saturating_sub(rhs.checkpoints_solidified),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_delta() {
        let counters = ProcessingCounters::default();
        counters.checkpoints_received.fetch_add(3, Ordering::Relaxed);
        let before = counters.snapshot();
        counters.checkpoints_received.fetch_add(2, Ordering::Relaxed);
        counters.ancestor_requests.fetch_add(1, Ordering::Relaxed);
        let delta = &counters.snapshot() - &before;
        assert_eq!(delta, ProcessingCountersSnapshot { checkpoints_received: 2, ancestor_requests: 1, ..Default::default() });
    }
}
