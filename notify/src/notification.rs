use crate::events::EventType;
use std::{
    fmt::Display,
    time::{Duration, SystemTime},
};
use tangle_consensus_core::{CheckpointIndex, checkpoint::MarkerHandle};

/// A notification published on the [`crate::bus::EventBus`].
///
/// Marker payloads are owned handles: the notification holds one reference for the
/// duration of the publication. Listeners needing the marker afterwards `retain` it.
#[derive(Debug)]
pub enum Notification {
    CheckpointReceived(MarkerHandle),
    LatestCheckpointChanged(MarkerHandle),
    SolidCheckpointChanged { index: CheckpointIndex },
    CleanupStarted { start: SystemTime },
    CleanupFinished { start: SystemTime, end: SystemTime, reclaimed: Option<u64> },
}

impl Notification {
    pub fn event_type(&self) -> EventType {
        match self {
            Notification::CheckpointReceived(_) => EventType::CheckpointReceived,
            Notification::LatestCheckpointChanged(_) => EventType::LatestCheckpointChanged,
            Notification::SolidCheckpointChanged { .. } => EventType::SolidCheckpointChanged,
            Notification::CleanupStarted { .. } => EventType::CleanupStarted,
            Notification::CleanupFinished { .. } => EventType::CleanupFinished,
        }
    }

    pub fn marker(&self) -> Option<&MarkerHandle> {
        match self {
            Notification::CheckpointReceived(marker) | Notification::LatestCheckpointChanged(marker) => Some(marker),
            _ => None,
        }
    }
}

impl Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Notification::CheckpointReceived(marker) => write!(f, "CheckpointReceived {}", marker),
            Notification::LatestCheckpointChanged(marker) => write!(f, "LatestCheckpointChanged {}", marker),
            Notification::SolidCheckpointChanged { index } => write!(f, "SolidCheckpointChanged {}", index),
            Notification::CleanupStarted { .. } => write!(f, "CleanupStarted"),
            Notification::CleanupFinished { start, end, reclaimed } => {
                let elapsed = end.duration_since(*start).unwrap_or(Duration::ZERO);
                match reclaimed {
                    Some(bytes) => write!(f, "CleanupFinished in {:?}, {} bytes reclaimed", elapsed, bytes),
                    None => write!(f, "CleanupFinished in {:?}, failed", elapsed),
                }
            }
        }
    }
}
