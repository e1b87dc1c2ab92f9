//! Event sink port: the single listener the UI layer registers.

use bristlebot_domain::event::SessionEvent;

/// Receives typed notifications destined for the UI layer.
///
/// Emitting must not block: implementations hand the event off (channel,
/// queue, log) and return immediately.
pub trait EventSink {
    /// Deliver one event.
    fn emit(&self, event: SessionEvent);
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: SessionEvent) {
        (**self).emit(event);
    }
}
