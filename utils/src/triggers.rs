pub use triggered::{Listener, Trigger};

/// One-shot stop signal shared between a service and its worker threads.
///
/// Firing is idempotent and releases every current and future waiter.
#[derive(Debug, Clone)]
pub struct SingleTrigger {
    pub trigger: Trigger,
    pub listener: Listener,
}

impl SingleTrigger {
    pub fn new() -> SingleTrigger {
        let (trigger, listener) = triggered::trigger();
        SingleTrigger { trigger, listener }
    }

    pub fn fire(&self) {
        self.trigger.trigger();
    }

    /// Blocks the calling thread until [`SingleTrigger::fire`] was called
    pub fn wait(&self) {
        self.listener.clone().wait();
    }

    pub fn is_triggered(&self) -> bool {
        self.listener.is_triggered()
    }
}

impl Default for SingleTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_fire_releases_all_waiters() {
        let stop = SingleTrigger::new();
        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let stop = stop.clone();
                thread::spawn(move || stop.wait())
            })
            .collect();
        assert!(!stop.is_triggered());
        stop.fire();
        stop.fire();
        waiters.into_iter().for_each(|w| w.join().unwrap());
        assert!(stop.is_triggered());
        // Waiting after the fact returns immediately
        stop.wait();
    }
}
