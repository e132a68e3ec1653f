use crate::core::Core;
use std::{sync::Arc, thread::JoinHandle};

/// A long running component bound to the [`Core`].
///
/// `start` spawns the service workers, `stop` signals them to exit. The core joins
/// the returned handles right after calling `stop`.
pub trait Service: Send + Sync + 'static {
    fn ident(self: Arc<Self>) -> &'static str;
    fn start(self: Arc<Self>, core: Arc<Core>) -> Vec<JoinHandle<()>>;
    fn stop(self: Arc<Self>);
}
