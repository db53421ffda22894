//! Capture session lifecycle and pull path.
//!
//! The session drives Null→Ready→Paused→Playing, sequences negotiation and
//! streaming start/stop across the negotiator, the buffer pool, and the
//! pacer, and exposes the property surface the host pipeline adapts to its
//! own plugin ABI.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::capture::device::VideoDevice;
use crate::capture::format::{
    CaptureConfig, FormatNegotiator, FormatTable, Palette, PixelFormatCandidate,
};
use crate::capture::frame::FrameHandle;
use crate::capture::pacer::FramePacer;
use crate::capture::pool::CaptureBufferPool;
use crate::clock::{Clock, MonotonicClock};
use crate::error::{CaptureError, NegotiationError, StateError};
use crate::events::{CaptureEvent, EventHub};
use crate::CaptureOptions;

/// Lifecycle state. Transitions are only valid between adjacent states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Null,
    Ready,
    Paused,
    Playing,
}

pub struct CaptureSession {
    device: Arc<dyn VideoDevice>,
    state: SessionState,
    options: CaptureOptions,
    config: Option<CaptureConfig>,
    negotiator: FormatNegotiator,
    pool: CaptureBufferPool,
    pacer: FramePacer,
    clock: Arc<dyn Clock>,
    clock_attached: bool,
    events: EventHub,
}

impl CaptureSession {
    pub fn new(device: Arc<dyn VideoDevice>) -> Self {
        Self::with_options(device, CaptureOptions::default())
    }

    pub fn with_options(device: Arc<dyn VideoDevice>, options: CaptureOptions) -> Self {
        let pool = CaptureBufferPool::new(device.clone());
        Self {
            device,
            state: SessionState::Null,
            options,
            config: None,
            negotiator: FormatNegotiator::new(FormatTable::builtin()),
            pool,
            pacer: FramePacer::default(),
            clock: Arc::new(MonotonicClock::new()),
            clock_attached: false,
            events: EventHub::default(),
        }
    }

    /// Inject the pipeline master clock used for fixed-rate pacing.
    pub fn set_clock(&mut self, clock: Arc<dyn Clock>) {
        self.clock = clock;
        self.clock_attached = true;
    }

    /// Subscribe to frame-captured/dropped/inserted notifications. Events
    /// are sent synchronously from within [`pull_frame`](Self::pull_frame).
    pub fn subscribe(&mut self) -> flume::Receiver<CaptureEvent> {
        self.events.subscribe()
    }

    /// Pool handle for consumers that release frames from other threads.
    pub fn buffer_pool(&self) -> CaptureBufferPool {
        self.pool.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Request a lifecycle transition. Only adjacent transitions are legal;
    /// anything else fails before any side effect. A failure in the
    /// transition's side-effecting step leaves the state unchanged.
    pub fn set_state(&mut self, target: SessionState) -> Result<(), StateError> {
        use SessionState::*;

        if self.state == target {
            return Ok(());
        }

        match (self.state, target) {
            (Null, Ready) => self.device.open()?,
            (Ready, Null) => self.device.close()?,
            (Ready, Paused) => {
                // Negotiation is not performed here; it happens lazily the
                // first time a consumer links with a candidate list.
                self.pacer.sync.reset();
            }
            (Paused, Playing) => {
                self.device.capture_start()?;
                self.pacer.sync.shift_anchor(self.clock.now());
            }
            (Playing, Paused) => {
                self.device.capture_stop()?;
                self.pacer.sync.shift_anchor(self.clock.now());
            }
            (Paused, Ready) => {
                if self.device.is_active() {
                    self.device.capture_deinit()?;
                }
                self.pool.clear();
                self.config = None;
            }
            (from, to) => return Err(StateError::NonAdjacent { from, to }),
        }

        info!(from = ?self.state, to = ?target, "state transition");
        self.state = target;
        Ok(())
    }

    /// Negotiate a capture format from consumer-offered candidates.
    ///
    /// Honors the fixed palette preference when one is set. A `Deferred`
    /// outcome (device not yet open) should be retried later; `Refused` is
    /// terminal for this candidate list.
    pub fn negotiate(
        &mut self,
        candidates: &[PixelFormatCandidate],
    ) -> Result<&CaptureConfig, NegotiationError> {
        let config = self
            .negotiator
            .negotiate(&*self.device, candidates, self.options.palette)?;
        Ok(self.config.insert(config))
    }

    /// Pull one frame.
    ///
    /// Blocks while the device grabs. In fixed-rate mode with an attached
    /// clock, the pacer may recycle surplus grabs or schedule duplicate
    /// deliveries to keep the delivered frame count synchronized with the
    /// clock. A grab failure surfaces as `EndOfStream`.
    pub fn pull_frame(&mut self) -> Result<FrameHandle, CaptureError> {
        let buffer_size = self
            .config
            .as_ref()
            .map(|c| c.buffer_size)
            .ok_or(CaptureError::NotNegotiated)?;

        let fixed = self.options.use_fixed_fps;
        let period = if fixed {
            1.0 / self.fixed_frame_rate()?
        } else {
            0.0
        };

        let (slot, captured_at) = if self.pacer.sync.pending_emits > 0 {
            (self.pacer.reuse_last()?, None)
        } else if fixed && self.clock_attached {
            let slot = self.pacer.grab_paced(
                &*self.device,
                &self.pool,
                &mut self.events,
                &*self.clock,
                period,
            )?;
            (slot, None)
        } else {
            let grab = self.pacer.grab_single(&*self.device, &self.pool)?;
            (grab.slot, Some(grab.captured_at))
        };

        let timestamp = if fixed {
            Duration::from_secs_f64(self.pacer.sync.frames_handled as f64 * period)
        } else {
            captured_at
                .unwrap_or_default()
                .saturating_sub(self.pacer.sync.anchor)
        };

        let handle = self.pool.allocate(slot, timestamp, buffer_size)?;
        self.pacer.sync.frames_handled += 1;
        self.events.emit(CaptureEvent::FrameCaptured);
        Ok(handle)
    }

    /// Target rate for fixed-rate capture, from the device-reported video
    /// standard. Fails fast when the device is not open rather than
    /// substituting a default.
    fn fixed_frame_rate(&self) -> Result<f64, CaptureError> {
        if !self.device.is_open() {
            return Err(CaptureError::RateUnavailable);
        }
        Ok(self.device.video_standard()?.nominal_fps())
    }

    // Property surface. Reads prefer the active configuration; writes feed
    // the next negotiation.

    pub fn width(&self) -> u32 {
        self.config
            .as_ref()
            .map_or(self.options.width, |c| c.width)
    }

    pub fn set_width(&mut self, width: u32) {
        self.options.width = width;
    }

    pub fn height(&self) -> u32 {
        self.config
            .as_ref()
            .map_or(self.options.height, |c| c.height)
    }

    pub fn set_height(&mut self, height: u32) {
        self.options.height = height;
    }

    /// Active palette id when negotiated, else the fixed preference, else 0
    /// for auto.
    pub fn palette_id(&self) -> u32 {
        self.config
            .as_ref()
            .map(|c| c.palette)
            .or(self.options.palette)
            .map_or(0, Palette::id)
    }

    /// Set the fixed palette preference; `None` restores auto.
    pub fn set_palette(&mut self, palette: Option<Palette>) {
        self.options.palette = palette;
    }

    pub fn palette_name(&self) -> Option<&'static str> {
        self.config.as_ref().map(|c| c.palette.name())
    }

    pub fn num_buffers(&self) -> usize {
        self.device.num_buffers()
    }

    pub fn buffer_size(&self) -> usize {
        self.config.as_ref().map_or(0, |c| c.buffer_size)
    }

    pub fn use_fixed_fps(&self) -> bool {
        self.options.use_fixed_fps
    }

    /// Changing the pacing mode mid-capture would corrupt the sync state;
    /// writes while capture is active are ignored, not errors.
    pub fn set_use_fixed_fps(&mut self, use_fixed_fps: bool) {
        if self.device.is_active() {
            debug!("ignoring use_fixed_fps write while capture is active");
            return;
        }
        self.options.use_fixed_fps = use_fixed_fps;
    }

    pub fn config(&self) -> Option<&CaptureConfig> {
        self.config.as_ref()
    }

    /// Total deliveries, counting duplicate deliveries of one grab.
    pub fn frames_handled(&self) -> u64 {
        self.pacer.sync.frames_handled
    }

    /// Buffer pool consistency faults observed so far.
    pub fn pool_faults(&self) -> u64 {
        self.pool.fault_count()
    }
}
