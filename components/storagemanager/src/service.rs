use crate::manager::StorageManager;
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use tangle_core::{core::Core, error, service::Service, trace};
use tangle_utils::triggers::SingleTrigger;

const SERVICE_NAME: &str = "storage";

/// Closes the store at shutdown. Bound first so that it is stopped last, once every
/// other service has ceased writing.
pub struct StorageService {
    manager: Arc<StorageManager>,
    shutdown: SingleTrigger,
}

impl StorageService {
    pub fn new(manager: Arc<StorageManager>) -> Self {
        Self { manager, shutdown: SingleTrigger::new() }
    }

    fn worker(self: Arc<Self>, core: Arc<Core>) {
        self.shutdown.wait();
        trace!("{} worker closing the store", SERVICE_NAME);
        if let Err(err) = self.manager.shutdown(core.is_halted()) {
            error!("cannot close the database cleanly: {}", err);
        }
    }
}

impl Service for StorageService {
    fn ident(self: Arc<StorageService>) -> &'static str {
        SERVICE_NAME
    }

    fn start(self: Arc<StorageService>, core: Arc<Core>) -> Vec<JoinHandle<()>> {
        vec![thread::Builder::new()
            .name(SERVICE_NAME.to_string())
            .spawn(move || self.worker(core))
            .unwrap_or_else(|err| panic!("cannot spawn the {} worker: {}", SERVICE_NAME, err))]
    }

    fn stop(self: Arc<StorageService>) {
        self.shutdown.fire();
    }
}
