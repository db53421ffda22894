//! Raw video frame capture engine.
//!
//! Pulls raw frames from a hardware capture device and hands them to a
//! downstream consumer one at a time, at a negotiated pixel layout and
//! pacing. The engine negotiates a pixel format between consumer-offered
//! candidates and device capability, bridges the device's buffer ring to
//! reference-counted frame handles, and soft-syncs delivery against a wall
//! clock by dropping or duplicating frames when a fixed output rate is
//! required.
//!
//! The hardware itself sits behind the [`VideoDevice`] trait; this crate
//! never allocates or frees device buffer memory, it only borrows it.

pub mod capture;
pub mod clock;
pub mod error;
pub mod events;

use serde::{Deserialize, Serialize};

pub use capture::device::{GrabbedFrame, VideoDevice, VideoStandard};
pub use capture::format::{
    CaptureConfig, FormatNegotiator, FormatTable, Palette, PixelFormatCandidate,
};
pub use capture::frame::FrameHandle;
pub use capture::pool::CaptureBufferPool;
pub use capture::session::{CaptureSession, SessionState};
pub use clock::{Clock, MonotonicClock};
pub use error::{CaptureError, DeviceError, NegotiationError, PoolError, StateError};
pub use events::CaptureEvent;

/// Read-write configuration surface of a capture session.
///
/// `width`/`height`/`palette` feed the next format negotiation; they do not
/// retroactively change an already negotiated configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureOptions {
    pub width: u32,
    pub height: u32,
    /// Fixed palette preference. `None` means any palette the consumer
    /// offers and the device accepts.
    pub palette: Option<Palette>,
    /// Drop/insert frames to hold a fixed rate (true) or adapt the rate to
    /// however many frames the device produces (false).
    pub use_fixed_fps: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            width: 160,
            height: 120,
            palette: None,
            use_fixed_fps: true,
        }
    }
}
