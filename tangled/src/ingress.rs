use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::{
    sync::Arc,
    thread::{self, JoinHandle},
};
use tangle_consensus::consensus::Consensus;
use tangle_consensus_core::checkpoint::MarkerHandle;
use tangle_core::{core::Core, debug, error, service::Service, trace, warn};

const SERVICE_NAME: &str = "checkpoint-ingress";

/// Entry point of validated checkpoint markers. Markers are received from the
/// validation layer, stored by index and processed in arrival order.
///
/// This is the single handler of fatal consensus errors: the diagnostic is logged and
/// the core is halted with the exit code of the error.
pub struct CheckpointIngress {
    consensus: Arc<Consensus>,
    receiver: Receiver<MarkerHandle>,
    shutdown_sender: Sender<()>,
    shutdown_receiver: Receiver<()>,
}

impl CheckpointIngress {
    pub fn new(consensus: Arc<Consensus>, receiver: Receiver<MarkerHandle>) -> Self {
        let (shutdown_sender, shutdown_receiver) = bounded(1);
        Self { consensus, receiver, shutdown_sender, shutdown_receiver }
    }

    fn worker(self: Arc<Self>, core: Arc<Core>) {
        loop {
            let received = select! {
                recv(self.receiver) -> marker => Some(marker),
                recv(self.shutdown_receiver) -> _ => None,
            };
            let Some(received) = received else {
                break;
            };
            let Ok(marker) = received else {
                debug!("checkpoint source disconnected");
                break;
            };
            if !self.handle(&core, marker) {
                break;
            }
        }
        trace!("{} worker exiting", SERVICE_NAME);
    }

    /// Returns false after a fatal error
    fn handle(&self, core: &Arc<Core>, marker: MarkerHandle) -> bool {
        if let Err(err) = self.consensus.store_marker(&marker) {
            warn!("cannot store checkpoint {}: {}", marker, err);
        }
        match self.consensus.process_checkpoint(marker) {
            Ok(_) => true,
            Err(err) => {
                error!("{}", err);
                error!("halting the node, the data directory may need to be reset");
                core.halt(err.exit_code());
                false
            }
        }
    }
}

impl Service for CheckpointIngress {
    fn ident(self: Arc<CheckpointIngress>) -> &'static str {
        SERVICE_NAME
    }

    fn start(self: Arc<CheckpointIngress>, core: Arc<Core>) -> Vec<JoinHandle<()>> {
        vec![thread::Builder::new()
            .name(SERVICE_NAME.to_string())
            .spawn(move || self.worker(core))
            .unwrap_or_else(|err| panic!("cannot spawn the {} worker: {}", SERVICE_NAME, err))]
    }

    fn stop(self: Arc<CheckpointIngress>) {
        let _ = self.shutdown_sender.try_send(());
    }
}
