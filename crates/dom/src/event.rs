//! Event listeners and dispatch.

use indextree::NodeId;
use std::sync::Arc;

/// A registered event callback.
///
/// Handlers are compared by `Arc` identity: registering the exact same
/// handler for the same event type twice is a no-op.
pub type EventHandler = Arc<dyn Fn(&Event) + Send + Sync>;

/// A dispatched event.
#[derive(Clone)]
pub struct Event {
    /// Event type, e.g. `"click"`.
    pub event_type: String,
    /// The node the event was dispatched on.
    pub target: NodeId,
}

/// Listener registration options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// Remove the listener after its first invocation.
    pub once: bool,
    /// Capture-phase flag; stored for parity with the host API, unused by
    /// the flat dispatch model.
    pub capture: bool,
}

/// A listener attached to one node.
#[derive(Clone)]
pub(crate) struct Listener {
    pub event_type: String,
    pub handler: EventHandler,
    pub options: ListenerOptions,
}

impl Listener {
    /// Whether this listener is the same `(type, handler)` pair.
    pub fn same_registration(&self, event_type: &str, handler: &EventHandler) -> bool {
        self.event_type == event_type && Arc::ptr_eq(&self.handler, handler)
    }
}
