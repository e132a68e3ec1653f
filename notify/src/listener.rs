use crate::notification::Notification;

pub type ListenerId = u64;

/// An observer of bus notifications, invoked synchronously by the publishing thread
pub trait Listener: Send + Sync {
    fn on_notification(&self, notification: &Notification);
}

impl<F> Listener for F
where
    F: Fn(&Notification) + Send + Sync,
{
    fn on_notification(&self, notification: &Notification) {
        self(notification)
    }
}
