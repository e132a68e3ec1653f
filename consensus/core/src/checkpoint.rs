use crate::CheckpointIndex;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, ops::Deref, sync::Arc};
use tangle_hashes::{Hash, Hasher, MarkerIdHasher};

/// The two tangle entries directly referenced by a checkpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AncestorRefs {
    pub trunk: Hash,
    pub branch: Hash,
}

impl AncestorRefs {
    pub fn new(trunk: Hash, branch: Hash) -> Self {
        Self { trunk, branch }
    }

    /// The referenced entries, deduplicated when trunk and branch coincide
    pub fn hashes(&self) -> impl Iterator<Item = Hash> {
        let branch = (self.branch != self.trunk).then_some(self.branch);
        std::iter::once(self.trunk).chain(branch)
    }
}

/// An immutable checkpoint marker as issued by the coordinating authority
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointMarker {
    pub index: CheckpointIndex,
    pub id: Hash,
    pub ancestors: AncestorRefs,
}

impl CheckpointMarker {
    /// Builds a marker, deriving its id from the index and the ancestor references
    pub fn new(index: CheckpointIndex, ancestors: AncestorRefs) -> Self {
        let mut hasher = MarkerIdHasher::new();
        hasher.update(index.to_le_bytes()).update(ancestors.trunk).update(ancestors.branch);
        Self { index, id: hasher.finalize(), ancestors }
    }
}

/// A shared owning reference to a [`CheckpointMarker`].
///
/// Each handle is one acquisition: [`MarkerHandle::retain`] acquires a new one and
/// dropping a handle releases it. The marker is freed with its last handle.
///
/// Functions taking a `MarkerHandle` by value take ownership of that reference, functions
/// taking `&MarkerHandle` borrow it and must `retain` to keep the marker past the call.
#[derive(Debug)]
pub struct MarkerHandle(Arc<CheckpointMarker>);

impl MarkerHandle {
    pub fn new(marker: CheckpointMarker) -> Self {
        Self(Arc::new(marker))
    }

    #[must_use]
    pub fn retain(&self) -> Self {
        Self(self.0.clone())
    }

    /// Number of live handles to the same marker
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn marker(&self) -> &CheckpointMarker {
        &self.0
    }
}

impl Deref for MarkerHandle {
    type Target = CheckpointMarker;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<CheckpointMarker> for MarkerHandle {
    fn from(marker: CheckpointMarker) -> Self {
        Self::new(marker)
    }
}

impl Display for MarkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.index, self.id)
    }
}
