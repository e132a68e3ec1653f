use crate::service::Service;
use crate::{trace, warn};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use triggered::{Listener, Trigger};

/// Process exit code of an orderly shutdown
pub const EXIT_CODE_OK: i32 = 0;
/// Process exit code for a panic or an invalid command line
pub const EXIT_CODE_ERROR: i32 = 1;
/// Process exit code after a checkpoint was received below the pruning index
pub const EXIT_CODE_CONSISTENCY_VIOLATION: i32 = 2;
/// Process exit code when the on-disk database schema does not match the node version
pub const EXIT_CODE_DATABASE_VERSION_MISMATCH: i32 = 3;

pub struct Core {
    keep_running: AtomicBool,
    exit_code: AtomicI32,
    services: Mutex<Vec<Arc<dyn Service>>>,
    shutdown_trigger: Trigger,
    shutdown_listener: Listener,
}

impl Core {
    pub fn new() -> Core {
        let (shutdown_trigger, shutdown_listener) = triggered::trigger();
        Core {
            keep_running: AtomicBool::new(true),
            exit_code: AtomicI32::new(EXIT_CODE_OK),
            services: Mutex::new(Vec::new()),
            shutdown_trigger,
            shutdown_listener,
        }
    }

    pub fn keep_running(&self) -> bool {
        self.keep_running.load(Ordering::SeqCst)
    }

    /// Requests an orderly shutdown. Services are stopped by [`Core::run`] in reverse
    /// binding order, each one being joined before the next is signaled.
    pub fn shutdown(self: &Arc<Core>) {
        if !self.keep_running.swap(false, Ordering::SeqCst) {
            return;
        }
        trace!("signaling core shutdown...");
        self.shutdown_trigger.trigger();
    }

    /// Requests an orderly shutdown terminating the process with `exit_code`.
    ///
    /// Only the first non-zero exit code is retained.
    pub fn halt(self: &Arc<Core>, exit_code: i32) {
        let _ = self.exit_code.compare_exchange(EXIT_CODE_OK, exit_code, Ordering::SeqCst, Ordering::SeqCst);
        self.shutdown();
    }

    /// Returns true if the shutdown was triggered by [`Core::halt`]
    pub fn is_halted(&self) -> bool {
        self.exit_code() != EXIT_CODE_OK
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code.load(Ordering::SeqCst)
    }

    pub fn bind<T>(&self, service: Arc<T>)
    where
        T: Service,
    {
        self.services.lock().unwrap().push(service);
    }

    /// Starts all bound services, blocks until a shutdown is requested and then stops
    /// and joins the services from the last bound to the first.
    ///
    /// Returns the process exit code.
    pub fn run(self: &Arc<Core>) -> i32 {
        let services = self.services.lock().unwrap().clone();
        let mut workers = Vec::with_capacity(services.len());
        for service in services {
            let handles = service.clone().start(self.clone());
            workers.push((service, handles));
        }
        trace!("core is starting {} workers", workers.iter().map(|(_, handles)| handles.len()).sum::<usize>());

        self.shutdown_listener.wait();

        for (service, handles) in workers.into_iter().rev() {
            let ident = service.clone().ident();
            trace!("shutting down: {}", ident);
            service.stop();
            for handle in handles {
                if let Err(err) = handle.join() {
                    warn!("thread join failure in {}: {:?}", ident, err);
                }
            }
        }

        // Drop all services and cleanup
        self.services.lock().unwrap().clear();

        trace!("... core is shut down");
        self.exit_code()
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::{self, JoinHandle};
    use triggered::trigger;

    struct OrderedService {
        name: &'static str,
        stopped: Arc<Mutex<Vec<&'static str>>>,
        exit: (Trigger, Listener),
    }

    impl OrderedService {
        fn new(name: &'static str, stopped: Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self { name, stopped, exit: trigger() })
        }
    }

    impl Service for OrderedService {
        fn ident(self: Arc<Self>) -> &'static str {
            self.name
        }

        fn start(self: Arc<Self>, _core: Arc<Core>) -> Vec<JoinHandle<()>> {
            vec![thread::spawn(move || {
                self.exit.1.wait();
                self.stopped.lock().unwrap().push(self.name);
            })]
        }

        fn stop(self: Arc<Self>) {
            self.exit.0.trigger();
        }
    }

    #[test]
    fn test_services_stop_in_reverse_order() {
        let stopped = Arc::new(Mutex::new(Vec::new()));
        let core = Arc::new(Core::new());
        core.bind(OrderedService::new("storage", stopped.clone()));
        core.bind(OrderedService::new("consensus", stopped.clone()));
        core.bind(OrderedService::new("ingress", stopped.clone()));

        let runner = {
            let core = core.clone();
            thread::spawn(move || core.run())
        };
        core.shutdown();
        assert_eq!(runner.join().unwrap(), EXIT_CODE_OK);
        assert_eq!(*stopped.lock().unwrap(), vec!["ingress", "consensus", "storage"]);
        assert!(!core.is_halted());
    }

    #[test]
    fn test_halt_keeps_first_exit_code() {
        let stopped = Arc::new(Mutex::new(Vec::new()));
        let core = Arc::new(Core::new());
        core.bind(OrderedService::new("storage", stopped.clone()));

        let runner = {
            let core = core.clone();
            thread::spawn(move || core.run())
        };
        core.halt(EXIT_CODE_CONSISTENCY_VIOLATION);
        core.halt(EXIT_CODE_ERROR);
        assert_eq!(runner.join().unwrap(), EXIT_CODE_CONSISTENCY_VIOLATION);
        assert!(core.is_halted());
        assert!(!core.keep_running());
        assert_eq!(*stopped.lock().unwrap(), vec!["storage"]);
    }
}
