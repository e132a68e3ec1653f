pub mod api;
pub mod checkpoint;
pub mod errors;

/// Index assigned to checkpoint markers by the issuing authority, strictly ordered
pub type CheckpointIndex = u32;
