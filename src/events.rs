//! Decoration-dirty notifications.
//!
//! The store and the group registry never call into rendering. Every mutation
//! that changes what a gutter should show emits a [`DecorationEvent`] on an
//! mpsc channel; the integration layer drains the channel (see
//! [`crate::decoration::DecorationRefresher`]) and rebuilds what it needs.

use crate::group::GroupId;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};

/// Something that invalidates rendered decorations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecorationEvent {
    /// Bookmarks of this file were added, removed, moved or re-texted.
    FileChanged(String),
    /// Color, shape or icon of a group changed.
    GroupStyleChanged(GroupId),
    /// A group was deleted; its handles can be released.
    GroupRemoved(GroupId),
    /// Active group or global visibility flags changed.
    VisibilityChanged,
    /// Every decoration must be re-derived (config change, reload).
    StyleReset,
}

/// Sending half of the decoration event channel.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<DecorationEvent>,
}

impl EventSink {
    /// Emit an event. A dropped receiver is not an error: nobody renders.
    pub fn emit(&self, event: DecorationEvent) {
        if let Err(e) = self.sender.send(event) {
            log::trace!("Decoration event dropped, no consumer: {:?}", e.0);
        }
    }

    pub fn file_changed(&self, path: &str) {
        self.emit(DecorationEvent::FileChanged(path.to_string()));
    }
}

/// Receiving half of the decoration event channel.
#[derive(Debug)]
pub struct DecorationEvents {
    receiver: Receiver<DecorationEvent>,
}

impl DecorationEvents {
    /// Check for a pending event (non-blocking).
    pub fn try_recv(&self) -> Option<DecorationEvent> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Take every pending event in emission order.
    pub fn drain(&self) -> Vec<DecorationEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Create a connected sink/receiver pair.
pub fn decoration_channel() -> (EventSink, DecorationEvents) {
    let (sender, receiver) = channel();
    (EventSink { sender }, DecorationEvents { receiver })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, events) = decoration_channel();
        sink.file_changed("a.rs");
        sink.emit(DecorationEvent::VisibilityChanged);

        assert_eq!(
            events.drain(),
            vec![
                DecorationEvent::FileChanged("a.rs".to_string()),
                DecorationEvent::VisibilityChanged,
            ]
        );
        assert!(events.try_recv().is_none());
    }

    #[test]
    fn test_emit_without_receiver_is_silent() {
        let (sink, events) = decoration_channel();
        drop(events);
        sink.emit(DecorationEvent::StyleReset);
    }
}
