//! Wall-clock abstraction for frame pacing.

use std::time::{Duration, Instant};

/// Monotonic, non-blocking time source.
///
/// The host pipeline injects its master clock through
/// [`CaptureSession::set_clock`](crate::CaptureSession::set_clock) so that
/// frame pacing tracks the same timeline as the rest of the pipeline
/// (typically the audio clock).
pub trait Clock: Send + Sync {
    /// Current time. Must never go backwards.
    fn now(&self) -> Duration;
}

/// Default clock backed by [`Instant`], anchored at construction.
pub struct MonotonicClock {
    epoch: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
