use crossbeam_channel::{Receiver, Sender, unbounded};
use tangle_consensus_core::{CheckpointIndex, api::AncestorRequester, checkpoint::MarkerHandle};
use tangle_core::{debug, warn};
use tangle_hashes::Hash;

/// A request handed to the peer layer
#[derive(Debug)]
pub enum PeerRequest {
    /// Fetch the two ancestors of a checkpoint. The peer layer owns the marker reference
    /// until it drops the request.
    Ancestors(MarkerHandle),
    /// Fetch entries found missing while walking the past of a checkpoint
    Entries(Vec<Hash>),
    /// Fetch a checkpoint marker that solidification is waiting for
    Checkpoint(CheckpointIndex),
}

/// Fire-and-forget queue of requests toward the peer layer
pub struct RequestQueue {
    sender: Sender<PeerRequest>,
}

impl RequestQueue {
    pub fn new() -> (Self, Receiver<PeerRequest>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    fn send(&self, request: PeerRequest) {
        // A failed send hands the request back, dropping it releases any marker it holds
        if let Err(err) = self.sender.send(request) {
            warn!("peer layer is not listening, dropping {:?}", err.into_inner());
        }
    }
}

impl AncestorRequester for RequestQueue {
    fn request_ancestors(&self, marker: MarkerHandle) {
        debug!("requesting the ancestors of checkpoint {}", marker);
        self.send(PeerRequest::Ancestors(marker));
    }

    fn request_entries(&self, hashes: Vec<Hash>) {
        debug!("requesting {} missing entries", hashes.len());
        self.send(PeerRequest::Entries(hashes));
    }

    fn request_checkpoint(&self, index: CheckpointIndex) {
        debug!("requesting missing checkpoint {}", index);
        self.send(PeerRequest::Checkpoint(index));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tangle_consensus_core::checkpoint::{AncestorRefs, CheckpointMarker};

    #[test]
    fn test_marker_is_released_with_the_request() {
        let (queue, receiver) = RequestQueue::new();
        let marker = MarkerHandle::new(CheckpointMarker::new(7, AncestorRefs::new(1.into(), 2.into())));
        queue.request_ancestors(marker.retain());
        queue.request_entries(vec![3.into()]);
        queue.request_checkpoint(6);
        assert_eq!(marker.ref_count(), 2);

        match receiver.recv().unwrap() {
            PeerRequest::Ancestors(requested) => assert_eq!(requested.index, 7),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(marker.ref_count(), 1);
        assert!(matches!(receiver.recv().unwrap(), PeerRequest::Entries(hashes) if hashes == vec![Hash::from(3u64)]));
        assert!(matches!(receiver.recv().unwrap(), PeerRequest::Checkpoint(6)));
    }

    #[test]
    fn test_disconnected_peer_layer_releases_marker() {
        let (queue, receiver) = RequestQueue::new();
        drop(receiver);
        let marker = MarkerHandle::new(CheckpointMarker::new(1, AncestorRefs::new(1.into(), 2.into())));
        queue.request_ancestors(marker.retain());
        assert_eq!(marker.ref_count(), 1);
    }
}
