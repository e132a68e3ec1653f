use crate::{
    core::{Core, EXIT_CODE_ERROR},
    info, warn,
};
use std::sync::{
    Arc, Weak,
    atomic::{AtomicU64, Ordering},
};

/// Interrupts received before the process is terminated without an orderly shutdown
const FORCED_EXIT_SIGNALS: u64 = 3;

/// Routes SIGINT and SIGTERM to [`Core::shutdown`]
pub struct Signals {
    core: Weak<Core>,
    received: AtomicU64,
}

impl Signals {
    pub fn new(core: &Arc<Core>) -> Signals {
        Signals { core: Arc::downgrade(core), received: AtomicU64::new(0) }
    }

    pub fn init(self: &Arc<Signals>) {
        let signals = self.clone();
        if let Err(err) = ctrlc::set_handler(move || signals.on_signal()) {
            warn!("cannot install the signal handler: {}", err);
        }
    }

    fn on_signal(&self) {
        let received = self.received.fetch_add(1, Ordering::SeqCst) + 1;
        if received >= FORCED_EXIT_SIGNALS {
            println!("^SIGNAL - halting");
            std::process::exit(EXIT_CODE_ERROR);
        }
        info!("^SIGNAL - shutting down... (signal {} more times to halt)", FORCED_EXIT_SIGNALS - received);
        if let Some(core) = self.core.upgrade() {
            core.shutdown();
        }
    }
}
