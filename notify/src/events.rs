use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

macro_rules! event_type_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident {
        $($(#[$variant_meta:meta])* $variant_name:ident = $val:expr,)*
    }) => {
        $(#[$meta])* $vis enum $name {
            $($(#[$variant_meta])* $variant_name = $val,)*
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $($name::$variant_name => write!(f, stringify!($variant_name))),*
                }
            }
        }
        pub const EVENT_TYPE_ARRAY: [EventType; EVENT_COUNT] = [
            $($name::$variant_name),*
        ];
    }
}

event_type_enum! {
    /// Event type classifying notifications (see [`crate::notification::Notification`])
    #[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
    #[serde(rename_all = "kebab-case")]
    pub enum EventType {
        CheckpointReceived = 0,
        LatestCheckpointChanged = 1,
        SolidCheckpointChanged = 2,
        CleanupStarted = 3,
        CleanupFinished = 4,
    }
}

pub const EVENT_COUNT: usize = 5;

/// Generic array with [`EventType`] strongly-typed index
#[derive(Default, Clone, Debug)]
pub struct EventArray<T>([T; EVENT_COUNT]);

impl<T> EventArray<T> {
    pub fn from_fn<F>(cb: F) -> Self
    where
        F: FnMut(usize) -> T,
    {
        Self(core::array::from_fn(cb))
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventType, &T)> {
        EVENT_TYPE_ARRAY.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<EventType> for EventArray<T> {
    type Output = T;

    fn index(&self, index: EventType) -> &Self::Output {
        &self.0[index as usize]
    }
}

impl<T> IndexMut<EventType> for EventArray<T> {
    fn index_mut(&mut self, index: EventType) -> &mut Self::Output {
        &mut self.0[index as usize]
    }
}
