use crate::{
    events::{EventArray, EventType},
    listener::{Listener, ListenerId},
    notification::Notification,
};
use parking_lot::RwLock;
use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};
use tangle_core::trace;

type Subscribers = Vec<(ListenerId, Arc<dyn Listener>)>;

/// Synchronous publish/subscribe registry.
///
/// [`EventBus::publish`] runs every listener of the event type inline, in the
/// publisher's thread and in subscription order, before returning. A slow listener
/// therefore slows the publisher down.
#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<EventArray<Subscribers>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, event: EventType, listener: Arc<dyn Listener>) -> ListenerId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.subscribers.write()[event].push((id, listener));
        trace!("[EventBus] listener {} subscribed to {}", id, event);
        id
    }

    pub fn subscribe_fn<F>(&self, event: EventType, callback: F) -> ListenerId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.subscribe(event, Arc::new(callback))
    }

    /// Returns false if the listener was not subscribed
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut subscribers = self.subscribers.write();
        for event in crate::events::EVENT_TYPE_ARRAY {
            let list = &mut subscribers[event];
            if let Some(position) = list.iter().position(|(listener_id, _)| *listener_id == id) {
                list.remove(position);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, event: EventType) -> usize {
        self.subscribers.read()[event].len()
    }

    /// Consumes the notification, releasing any marker reference it holds once all
    /// listeners returned.
    ///
    /// Listeners are snapshotted first, so a listener may subscribe or unsubscribe
    /// from within its callback without deadlocking.
    pub fn publish(&self, notification: Notification) {
        let listeners = self.subscribers.read()[notification.event_type()].clone();
        for (_, listener) in listeners.iter() {
            listener.on_notification(&notification);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::SystemTime;
    use tangle_consensus_core::checkpoint::{AncestorRefs, CheckpointMarker, MarkerHandle};

    fn marker(index: u32) -> MarkerHandle {
        MarkerHandle::new(CheckpointMarker::new(index, AncestorRefs::new(1.into(), 2.into())))
    }

    #[test]
    fn test_publish_in_subscription_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            let log = log.clone();
            bus.subscribe_fn(EventType::SolidCheckpointChanged, move |n| log.lock().push(format!("{} {}", name, n)));
        }
        let other = log.clone();
        bus.subscribe_fn(EventType::CleanupStarted, move |_| other.lock().push("cleanup".to_owned()));

        bus.publish(Notification::SolidCheckpointChanged { index: 4 });
        assert_eq!(
            *log.lock(),
            vec!["first SolidCheckpointChanged 4", "second SolidCheckpointChanged 4", "third SolidCheckpointChanged 4"]
        );
    }

    #[test]
    fn test_unsubscribe() {
        let bus = EventBus::new();
        let id = bus.subscribe_fn(EventType::CleanupStarted, |_| {});
        bus.subscribe_fn(EventType::CleanupStarted, |_| {});
        assert_eq!(bus.listener_count(EventType::CleanupStarted), 2);
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        assert_eq!(bus.listener_count(EventType::CleanupStarted), 1);
        bus.publish(Notification::CleanupStarted { start: SystemTime::now() });
    }

    #[test]
    fn test_marker_released_after_publication() {
        let bus = EventBus::new();
        let retained = Arc::new(Mutex::new(Vec::new()));
        let sink = retained.clone();
        bus.subscribe_fn(EventType::CheckpointReceived, move |n| {
            if let Some(marker) = n.marker() {
                sink.lock().push(marker.retain());
            }
        });
        bus.subscribe_fn(EventType::CheckpointReceived, |n| assert!(n.marker().is_some()));

        let handle = marker(9);
        bus.publish(Notification::CheckpointReceived(handle.retain()));
        // The publication released its own reference, the retaining listener kept one
        assert_eq!(handle.ref_count(), 2);
        retained.lock().clear();
        assert_eq!(handle.ref_count(), 1);

        // Without listeners the reference is released right away
        bus.publish(Notification::LatestCheckpointChanged(handle.retain()));
        assert_eq!(handle.ref_count(), 1);
    }

    #[test]
    fn test_listener_may_unsubscribe_itself() {
        let bus = Arc::new(EventBus::new());
        let calls = Arc::new(AtomicU64::new(0));
        let id = Arc::new(AtomicU64::new(u64::MAX));
        let weak_bus = Arc::downgrade(&bus);
        let listener_id = {
            let (calls, id) = (calls.clone(), id.clone());
            bus.subscribe_fn(EventType::SolidCheckpointChanged, move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                if let Some(bus) = weak_bus.upgrade() {
                    bus.unsubscribe(id.load(Ordering::SeqCst));
                }
            })
        };
        id.store(listener_id, Ordering::SeqCst);

        bus.publish(Notification::SolidCheckpointChanged { index: 1 });
        bus.publish(Notification::SolidCheckpointChanged { index: 2 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(bus.listener_count(EventType::SolidCheckpointChanged), 0);
    }
}
