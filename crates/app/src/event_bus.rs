//! In-process event bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use bristlebot_domain::event::SessionEvent;

use crate::ports::EventSink;

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Emitting succeeds even when there are no active subscribers
/// (the event is simply dropped).
#[derive(Clone)]
pub struct InProcessEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events emitted *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl EventSink for InProcessEventBus {
    fn emit(&self, event: SessionEvent) {
        tracing::debug!(kind = event.kind(), "emitting event");
        // Fails only when nobody is subscribed.
        let _ = self.sender.send(event);
    }
}
