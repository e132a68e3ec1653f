use crate::{
    CheckpointIndex,
    checkpoint::{AncestorRefs, MarkerHandle},
};
use tangle_hashes::Hash;

pub mod counters;

/// Outbound requests to the peer layer for missing tangle entries.
///
/// Requests are fire-and-forget, nothing is returned to the caller.
pub trait AncestorRequester: Send + Sync {
    /// Requests the two entries referenced by a checkpoint. Takes ownership of the
    /// handle, released once the request completes or is abandoned.
    fn request_ancestors(&self, marker: MarkerHandle);

    /// Requests arbitrary missing entries found while walking the tangle
    fn request_entries(&self, hashes: Vec<Hash>);

    /// Requests a checkpoint marker known to exist but never received, which blocks
    /// solidity from advancing past `index - 1`
    fn request_checkpoint(&self, index: CheckpointIndex);
}

/// Read access to the local tangle
pub trait TangleReader: Send + Sync {
    /// The ancestor references of an entry, `None` if the entry is not stored locally
    fn ancestors(&self, hash: Hash) -> Option<AncestorRefs>;

    /// Whether the entry and its whole past are known to be present
    fn is_solid(&self, hash: Hash) -> bool;
}

/// Write access to the solidity flags of the local tangle
pub trait TangleStore: TangleReader {
    fn mark_solid(&self, hashes: &[Hash]);
}
