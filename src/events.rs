//! Capture notifications.
//!
//! The engine fires three notifications synchronously from within the pull
//! path: one per delivered frame, one per surplus frame recycled without
//! delivery, and one per duplicate delivery scheduled to catch up with the
//! clock. Subscribers receive them over flume channels; a subscriber that
//! goes away is pruned on the next emission.

use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureEvent {
    /// A frame was delivered to the consumer.
    FrameCaptured,
    /// A surplus frame was grabbed and recycled without delivery.
    FrameDropped,
    /// A duplicate delivery was scheduled to compensate for lag.
    FrameInserted,
}

#[derive(Default)]
pub(crate) struct EventHub {
    subscribers: Vec<flume::Sender<CaptureEvent>>,
}

impl EventHub {
    pub(crate) fn subscribe(&mut self) -> flume::Receiver<CaptureEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: CaptureEvent) {
        trace!(?event, "capture event");
        self.subscribers.retain(|tx| tx.send(event).is_ok());
    }
}
