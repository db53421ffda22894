//! Soft frame pacing.
//!
//! In fixed-rate mode the pacer keeps the delivered frame count locked to a
//! wall clock: if one second has elapsed on the clock, one second of video
//! must have been delivered. Grabs arriving faster than the target rate are
//! recycled undelivered; grabs arriving slower are delivered more than once.

use std::time::Duration;

use tracing::debug;

use crate::capture::device::{GrabbedFrame, VideoDevice};
use crate::capture::pool::CaptureBufferPool;
use crate::clock::Clock;
use crate::error::CaptureError;
use crate::events::{CaptureEvent, EventHub};

/// Drift window, in frame periods, on either side of the target before the
/// pacer drops or duplicates. Symmetric for early and late arrivals.
const DRIFT_WINDOW_PERIODS: f64 = 1.5;

/// Per-session pacing state.
///
/// Resets wholesale on Ready→Paused; `anchor` is adjusted, not reset, on
/// Paused↔Playing so elapsed-time math excludes pause intervals.
#[derive(Debug, Default)]
pub(crate) struct SyncClock {
    /// Deliveries so far, counting duplicate deliveries of one grab.
    pub frames_handled: u64,
    /// Deliveries still owed for `last_frame` before the next grab.
    pub pending_emits: u32,
    /// Wall-clock reference; `now - anchor` is time spent playing.
    pub anchor: Duration,
    /// Slot of the most recent grab.
    pub last_frame: Option<usize>,
}

impl SyncClock {
    pub(crate) fn reset(&mut self) {
        *self = SyncClock::default();
    }

    /// Fold the current time into the anchor. Applied symmetrically on
    /// entering and leaving Playing, which accumulates paused intervals out
    /// of the elapsed-time calculation.
    pub(crate) fn shift_anchor(&mut self, now: Duration) {
        self.anchor = now.saturating_sub(self.anchor);
    }
}

#[derive(Default)]
pub(crate) struct FramePacer {
    pub(crate) sync: SyncClock,
}

impl FramePacer {
    /// Consume one owed delivery of the last grab. O(1), no device call.
    pub(crate) fn reuse_last(&mut self) -> Result<usize, CaptureError> {
        match self.sync.last_frame {
            Some(slot) => {
                self.sync.pending_emits -= 1;
                Ok(slot)
            }
            None => {
                debug!("pending delivery without a prior grab");
                Err(CaptureError::EndOfStream)
            }
        }
    }

    /// Grab frames until one is accepted for delivery, dropping surplus
    /// grabs and scheduling duplicate deliveries as the clock dictates.
    /// Returns the accepted slot with one delivery already consumed.
    pub(crate) fn grab_paced(
        &mut self,
        device: &dyn VideoDevice,
        pool: &CaptureBufferPool,
        events: &mut EventHub,
        clock: &dyn Clock,
        period: f64,
    ) -> Result<usize, CaptureError> {
        loop {
            let grab = device.grab_frame().map_err(|err| {
                debug!(%err, "frame grab failed");
                CaptureError::EndOfStream
            })?;

            // Delivered video time vs wall-clock time spent playing.
            let target = self.sync.frames_handled as f64 * period;
            let elapsed = clock
                .now()
                .saturating_sub(self.sync.anchor)
                .as_secs_f64();
            let lead = target - elapsed;

            if lead > DRIFT_WINDOW_PERIODS * period {
                // Producing faster than required: this grab is surplus.
                events.emit(CaptureEvent::FrameDropped);
                device.requeue_frame(grab.slot)?;
                continue;
            }

            let mut deliveries: u32 = 1;
            if lead < -(DRIFT_WINDOW_PERIODS * period) {
                // Lagging far behind: write this frame twice to catch up.
                deliveries += 1;
                events.emit(CaptureEvent::FrameInserted);
            }

            pool.begin_use(grab.slot, deliveries);
            self.sync.last_frame = Some(grab.slot);
            self.sync.pending_emits = deliveries - 1;
            return Ok(grab.slot);
        }
    }

    /// Variable-rate path: grab exactly one frame, owed one delivery.
    pub(crate) fn grab_single(
        &mut self,
        device: &dyn VideoDevice,
        pool: &CaptureBufferPool,
    ) -> Result<GrabbedFrame, CaptureError> {
        let grab = device.grab_frame().map_err(|err| {
            debug!(%err, "frame grab failed");
            CaptureError::EndOfStream
        })?;

        pool.begin_use(grab.slot, 1);
        self.sync.last_frame = Some(grab.slot);
        Ok(grab)
    }
}
