use bytes::Bytes;
use std::time::Duration;

/// Consumer-visible frame handle with zero-copy semantics.
///
/// The data is a borrowed view of a device buffer slot; the slot is not
/// recycled to the hardware queue until every handle referencing it has
/// been released through the pool.
#[derive(Debug, Clone)]
pub struct FrameHandle {
    pub(crate) slot: usize,
    pub(crate) data: Bytes,
    pub(crate) timestamp: Duration,
}

impl FrameHandle {
    /// Buffer ring slot backing this frame.
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Frame data, sized to the negotiated frame byte size.
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Delivery timestamp on the session timeline.
    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
