pub mod checkpoint_processor;
pub mod solidification;

pub use tangle_consensus_core::api::counters::{ProcessingCounters, ProcessingCountersSnapshot};
