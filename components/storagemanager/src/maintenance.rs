use crate::{errors::StorageError, gc::GarbageCollector};
use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
    time::Duration,
};
use tangle_core::{core::Core, debug, info, service::Service};

const SERVICE_NAME: &str = "maintenance";

/// Runs a single garbage collection pass every `interval` until shutdown. A zero
/// interval disables the service.
pub struct MaintenanceService {
    gc: Arc<GarbageCollector>,
    interval: Duration,
    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,
}

impl MaintenanceService {
    pub fn new(gc: Arc<GarbageCollector>, interval: Duration) -> Self {
        let (shutdown_sender, shutdown_receiver) = bounded(1);
        Self { gc, interval, shutdown_sender, shutdown_receiver }
    }

    fn worker(self: Arc<Self>) {
        let ticker = tick(self.interval);
        loop {
            let keep_running = select! {
                recv(ticker) -> _ => self.run_pass(),
                recv(self.shutdown_receiver) -> _ => false,
            };
            if !keep_running {
                break;
            }
        }
        debug!("{} worker exiting", SERVICE_NAME);
    }

    /// Returns false once the collector is closed
    fn run_pass(&self) -> bool {
        match self.gc.run_garbage_collection() {
            Ok(run) => {
                debug!("periodic garbage collection reclaimed {} bytes", run.reclaimed());
                true
            }
            Err(StorageError::Closed) => false,
            // Already logged by the collector, the next tick retries
            Err(_) => true,
        }
    }
}

impl Service for MaintenanceService {
    fn ident(self: Arc<MaintenanceService>) -> &'static str {
        SERVICE_NAME
    }

    fn start(self: Arc<MaintenanceService>, _core: Arc<Core>) -> Vec<JoinHandle<()>> {
        if self.interval.is_zero() {
            info!("periodic database garbage collection is disabled");
            return vec![];
        }
        info!("periodic database garbage collection every {:?}", self.interval);
        vec![thread::Builder::new()
            .name(SERVICE_NAME.to_string())
            .spawn(move || self.worker())
            .unwrap_or_else(|err| panic!("cannot spawn the {} worker: {}", SERVICE_NAME, err))]
    }

    fn stop(self: Arc<MaintenanceService>) {
        let _ = self.shutdown_sender.try_send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tangle_database::prelude::{CompactionOutcome, StorageEngine, StoreResult};
    use tangle_notify::{bus::EventBus, events::EventType};

    #[derive(Default)]
    struct CountingEngine {
        calls: Mutex<usize>,
    }

    impl StorageEngine for CountingEngine {
        fn compact(&self, _discard_ratio: f64) -> StoreResult<CompactionOutcome> {
            *self.calls.lock() += 1;
            Ok(CompactionOutcome::NothingToCompact)
        }

        fn flush(&self) -> StoreResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_periodic_passes_until_stopped() {
        let bus = Arc::new(EventBus::new());
        let (sender, receiver) = crossbeam_channel::unbounded();
        bus.subscribe_fn(EventType::CleanupFinished, move |_| {
            let _ = sender.send(());
        });
        let engine = Arc::new(CountingEngine::default());
        let gc = Arc::new(GarbageCollector::new(engine.clone(), bus));
        let service = Arc::new(MaintenanceService::new(gc, Duration::from_millis(5)));

        let handles = service.clone().start(Arc::new(Core::new()));
        for _ in 0..3 {
            receiver.recv_timeout(Duration::from_secs(10)).unwrap();
        }
        service.clone().stop();
        handles.into_iter().for_each(|h| h.join().unwrap());
        assert!(*engine.calls.lock() >= 3);
    }

    #[test]
    fn test_zero_interval_disables_the_worker() {
        let gc = Arc::new(GarbageCollector::new(Arc::new(CountingEngine::default()), Arc::new(EventBus::new())));
        let service = Arc::new(MaintenanceService::new(gc, Duration::ZERO));
        assert!(service.clone().start(Arc::new(Core::new())).is_empty());
    }

    #[test]
    fn test_closed_collector_ends_the_worker() {
        let gc = Arc::new(GarbageCollector::new(Arc::new(CountingEngine::default()), Arc::new(EventBus::new())));
        gc.close();
        let service = Arc::new(MaintenanceService::new(gc, Duration::from_millis(1)));
        service.start(Arc::new(Core::new())).into_iter().for_each(|h| h.join().unwrap());
    }
}
