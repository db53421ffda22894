//! Capture buffer pool.
//!
//! Bridges hardware-owned buffer slots to consumer-visible frame handles
//! without copying. The pool owns only the per-slot use-count bookkeeping
//! and the recycle trigger; slot memory belongs to the device.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::error;

use crate::capture::device::VideoDevice;
use crate::capture::frame::FrameHandle;
use crate::error::PoolError;

/// Cloneable handle to the shared pool state. Consumers hold a clone so
/// they can release frames from threads other than the capture thread.
#[derive(Clone)]
pub struct CaptureBufferPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    device: Arc<dyn VideoDevice>,
    /// Remaining deliveries owed per in-flight slot. A slot is present iff
    /// its count is positive; hitting zero removes it and requeues the
    /// underlying buffer.
    slots: Mutex<HashMap<usize, u32>>,
    faults: AtomicU64,
}

impl CaptureBufferPool {
    pub(crate) fn new(device: Arc<dyn VideoDevice>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                device,
                slots: Mutex::new(HashMap::new()),
                faults: AtomicU64::new(0),
            }),
        }
    }

    /// Record that `slot` owes `count` deliveries before it may recycle.
    /// Called by the pacer when it accepts a grab.
    pub(crate) fn begin_use(&self, slot: usize, count: u32) {
        let mut slots = self.inner.slots.lock().expect("pool lock poisoned");
        slots.insert(slot, count);
    }

    /// Build a consumer handle for a pacer-chosen slot, sized to the
    /// negotiated frame byte size. Fails when capture is not active.
    pub(crate) fn allocate(
        &self,
        slot: usize,
        timestamp: Duration,
        buffer_size: usize,
    ) -> Result<FrameHandle, PoolError> {
        if !self.inner.device.is_active() {
            return Err(PoolError::Inactive);
        }

        let data = self.inner.device.frame_data(slot)?;
        let data = if data.len() > buffer_size {
            data.slice(..buffer_size)
        } else {
            data
        };

        Ok(FrameHandle {
            slot,
            data,
            timestamp,
        })
    }

    /// Release one delivery of a frame. When the owning slot's use count
    /// reaches zero the underlying buffer is requeued to the hardware
    /// capture queue.
    ///
    /// May be called from any thread. Releasing a handle whose slot is not
    /// in flight is an internal consistency fault: it is counted, logged,
    /// and reported, but does not take the session down.
    pub fn release(&self, handle: &FrameHandle) -> Result<(), PoolError> {
        self.release_slot(handle.slot)
    }

    fn release_slot(&self, slot: usize) -> Result<(), PoolError> {
        // The decrement and the requeue stay under one lock so a consumer
        // release cannot race the pacer's surplus recycling.
        let mut slots = self.inner.slots.lock().expect("pool lock poisoned");
        match slots.get_mut(&slot) {
            Some(count) => {
                *count -= 1;
                if *count == 0 {
                    slots.remove(&slot);
                    self.inner.device.requeue_frame(slot)?;
                }
                Ok(())
            }
            None => {
                self.inner.faults.fetch_add(1, Ordering::Relaxed);
                error!(slot, "release of unrecognized frame handle");
                Err(PoolError::UnknownHandle { slot })
            }
        }
    }

    /// Number of consistency faults observed since the pool was created.
    pub fn fault_count(&self) -> u64 {
        self.inner.faults.load(Ordering::Relaxed)
    }

    /// Slots currently owing deliveries.
    pub fn in_flight(&self) -> usize {
        self.inner.slots.lock().expect("pool lock poisoned").len()
    }

    /// Forget all bookkeeping. Used when capture deinitializes and the
    /// device invalidates every slot.
    pub(crate) fn clear(&self) {
        self.inner.slots.lock().expect("pool lock poisoned").clear();
    }
}
