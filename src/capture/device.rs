//! Device I/O collaborator seam.
//!
//! The low-level driver (ioctls, mmap'd buffer rings, grab/requeue
//! primitives) lives behind [`VideoDevice`]. The engine only sequences
//! calls on this trait; buffer memory is owned by the implementation and
//! borrowed out as [`Bytes`] views.

use std::time::Duration;

use bytes::Bytes;

use crate::capture::format::Palette;
use crate::error::DeviceError;

/// NTSC delivers ~29.97 frames per second, everything else 25.
const NTSC_FPS: f64 = 30000.0 / 1001.0;
const PAL_FPS: f64 = 25.0;

/// Video standard reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoStandard {
    Ntsc,
    #[default]
    Pal,
    Secam,
}

impl VideoStandard {
    /// Nominal frame rate of the standard, used as the fixed-rate target.
    pub fn nominal_fps(self) -> f64 {
        match self {
            VideoStandard::Ntsc => NTSC_FPS,
            VideoStandard::Pal | VideoStandard::Secam => PAL_FPS,
        }
    }
}

/// A frame dequeued from the device's buffer ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabbedFrame {
    /// Index of the ring slot holding the frame data.
    pub slot: usize,
    /// Device-reported capture time, on the device's monotonic timeline.
    pub captured_at: Duration,
}

/// Hardware capture device collaborator.
///
/// Implementations must be internally synchronized: `grab_frame` may block
/// the capture thread while another thread requeues a slot, and
/// `capture_stop` must unblock a parked `grab_frame` via a cooperative stop
/// signal.
pub trait VideoDevice: Send + Sync {
    fn open(&self) -> Result<(), DeviceError>;
    fn close(&self) -> Result<(), DeviceError>;

    fn is_open(&self) -> bool;
    /// Whether capture buffers are mapped (i.e. `capture_init` succeeded
    /// and `capture_deinit` has not run since).
    fn is_active(&self) -> bool;

    /// Whether the device can capture in the given palette at all.
    fn query_capability(&self, palette: Palette) -> bool;
    /// Program frame geometry and palette.
    fn set_capture(&self, width: u32, height: u32, palette: Palette) -> Result<(), DeviceError>;

    /// Map the buffer ring.
    fn capture_init(&self) -> Result<(), DeviceError>;
    /// Unmap the buffer ring; invalidates all slots.
    fn capture_deinit(&self) -> Result<(), DeviceError>;
    /// Enqueue all mapped buffers and start streaming.
    fn capture_start(&self) -> Result<(), DeviceError>;
    /// Stop streaming. Must unblock a thread parked in `grab_frame`.
    fn capture_stop(&self) -> Result<(), DeviceError>;

    /// Dequeue the next captured frame. Blocks until data is ready, the
    /// device's own timeout elapses, or the stream is stopped.
    fn grab_frame(&self) -> Result<GrabbedFrame, DeviceError>;
    /// Return a slot to the capture queue, making it grabbable again.
    fn requeue_frame(&self, slot: usize) -> Result<(), DeviceError>;
    /// Borrow the data region of a slot. Cheap; no copy of pixel data.
    fn frame_data(&self, slot: usize) -> Result<Bytes, DeviceError>;

    /// Number of slots in the mapped buffer ring (0 when not mapped).
    fn num_buffers(&self) -> usize;
    /// Currently configured video standard.
    fn video_standard(&self) -> Result<VideoStandard, DeviceError>;
}
