//! Error types for the capture engine.

use thiserror::Error;

use crate::capture::session::SessionState;

/// Failures reported by the device I/O collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("device is not open")]
    NotOpen,

    #[error("capture is not initialized")]
    NotInitialized,

    #[error("capture stream stopped")]
    Stopped,

    #[error("device i/o error: {0}")]
    Io(String),
}

/// Outcome of a failed format negotiation.
///
/// `Deferred` is retryable: the device was not open yet, so no candidate
/// could be probed. `Refused` is terminal for the offered candidate list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NegotiationError {
    #[error("device not open, retry negotiation later")]
    Deferred,

    #[error("no offered format is supported by the device")]
    Refused,
}

/// Buffer pool failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("capture session is not active")]
    Inactive,

    #[error("released handle does not match any in-flight slot (slot {slot})")]
    UnknownHandle { slot: usize },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Failures surfaced by the frame pull path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The device could not produce a frame; the stream is over for the
    /// consumer. Not retried internally.
    #[error("capture stream ended")]
    EndOfStream,

    #[error("no capture format negotiated")]
    NotNegotiated,

    /// Fixed-rate capture needs a device-reported video standard; with the
    /// device closed there is no rate to hold.
    #[error("frame rate unavailable: device not open")]
    RateUnavailable,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// State machine transition failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("invalid state transition {from:?} -> {to:?}")]
    NonAdjacent {
        from: SessionState,
        to: SessionState,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),
}
