use crate::CheckpointIndex;
use tangle_core::core::EXIT_CODE_CONSISTENCY_VIOLATION;
use tangle_hashes::Hash;
use thiserror::Error;

/// A condition the node cannot continue from. Returned up to the single top-level
/// handler which performs an orderly shutdown, never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("synced too far! index: {index} ({id}), pruning index: {pruning_index}")]
    BelowPruningIndex { index: CheckpointIndex, id: Hash, pruning_index: CheckpointIndex },
}

impl FatalError {
    /// Process exit code of the shutdown caused by this error
    pub fn exit_code(&self) -> i32 {
        match self {
            FatalError::BelowPruningIndex { .. } => EXIT_CODE_CONSISTENCY_VIOLATION,
        }
    }
}

pub type FatalResult<T> = std::result::Result<T, FatalError>;
