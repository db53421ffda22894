//! Pixel format negotiation.
//!
//! A consumer offers a priority-ordered list of fourcc/depth candidates;
//! the negotiator walks it first-match-wins against a fixed table of
//! canonical palette encodings and probes each structural match on the
//! device. No backtracking once the device accepts a candidate.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use v4l::FourCC;

use crate::capture::device::VideoDevice;
use crate::error::NegotiationError;

/// Pixel-layout family, identified by the classic V4L palette numbering
/// (exposed as the integer `palette` property, where 0 means auto).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Palette {
    Rgb565,
    Rgb24,
    Rgb32,
    Rgb555,
    Yuv422,
    Yuyv,
    Uyvy,
    Yuv420p,
    Yuv411,
}

impl Palette {
    /// Numeric palette id, matching the V4L convention.
    pub fn id(self) -> u32 {
        match self {
            Palette::Rgb565 => 3,
            Palette::Rgb24 => 4,
            Palette::Rgb32 => 5,
            Palette::Rgb555 => 6,
            Palette::Yuv422 => 7,
            Palette::Yuyv => 8,
            Palette::Uyvy => 9,
            Palette::Yuv411 => 11,
            Palette::Yuv420p => 15,
        }
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            3 => Some(Palette::Rgb565),
            4 => Some(Palette::Rgb24),
            5 => Some(Palette::Rgb32),
            6 => Some(Palette::Rgb555),
            7 => Some(Palette::Yuv422),
            8 => Some(Palette::Yuyv),
            9 => Some(Palette::Uyvy),
            11 => Some(Palette::Yuv411),
            15 => Some(Palette::Yuv420p),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Palette::Rgb565 => "RGB565",
            Palette::Rgb24 => "RGB24",
            Palette::Rgb32 => "RGB32",
            Palette::Rgb555 => "RGB555",
            Palette::Yuv422 => "YUV422",
            Palette::Yuyv => "YUYV",
            Palette::Uyvy => "UYVY",
            Palette::Yuv420p => "YUV420P",
            Palette::Yuv411 => "YUV411",
        }
    }
}

/// One pixel layout offered by the consumer, immutable per negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelFormatCandidate {
    pub fourcc: FourCC,
    /// Bit depth qualifier; only meaningful for the packed RGB fourcc.
    pub depth: Option<u32>,
    pub width: u32,
    pub height: u32,
}

impl PixelFormatCandidate {
    pub fn new(fourcc: FourCC, depth: Option<u32>, width: u32, height: u32) -> Self {
        Self {
            fourcc,
            depth,
            width,
            height,
        }
    }
}

/// Resolved capture configuration. Exactly one instance is authoritative at
/// a time; renegotiation replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    pub palette: Palette,
    pub fourcc: FourCC,
    pub width: u32,
    pub height: u32,
    /// Bytes per frame at the resolved layout.
    pub buffer_size: usize,
}

struct FormatRow {
    palette: Palette,
    fourcc: FourCC,
    /// Required candidate depth; `None` accepts any.
    depth: Option<u32>,
    /// Bytes per pixel as a ratio, so 1.5 B/px stays in integer math.
    bytes_num: u32,
    bytes_den: u32,
}

impl FormatRow {
    fn frame_bytes(&self, width: u32, height: u32) -> usize {
        (u64::from(width) * u64::from(height) * u64::from(self.bytes_num)
            / u64::from(self.bytes_den)) as usize
    }
}

/// Immutable table of canonical palette encodings. Built once and handed to
/// the negotiator; never shared mutable state.
pub struct FormatTable {
    rows: Vec<FormatRow>,
}

impl FormatTable {
    pub fn builtin() -> Self {
        let rgb = FourCC::new(b"RGB ");
        let rows = vec![
            FormatRow {
                palette: Palette::Yuv420p,
                fourcc: FourCC::new(b"I420"),
                depth: None,
                bytes_num: 3,
                bytes_den: 2,
            },
            FormatRow {
                palette: Palette::Yuv420p,
                fourcc: FourCC::new(b"IYUV"),
                depth: None,
                bytes_num: 3,
                bytes_den: 2,
            },
            FormatRow {
                palette: Palette::Yuv422,
                fourcc: FourCC::new(b"YUY2"),
                depth: None,
                bytes_num: 2,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Yuyv,
                fourcc: FourCC::new(b"YUY2"),
                depth: None,
                bytes_num: 2,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Uyvy,
                fourcc: FourCC::new(b"UYVY"),
                depth: None,
                bytes_num: 2,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Yuv411,
                fourcc: FourCC::new(b"Y41P"),
                depth: None,
                bytes_num: 3,
                bytes_den: 2,
            },
            FormatRow {
                palette: Palette::Rgb555,
                fourcc: rgb,
                depth: Some(15),
                bytes_num: 2,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Rgb565,
                fourcc: rgb,
                depth: Some(16),
                bytes_num: 2,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Rgb24,
                fourcc: rgb,
                depth: Some(24),
                bytes_num: 3,
                bytes_den: 1,
            },
            FormatRow {
                palette: Palette::Rgb32,
                fourcc: rgb,
                depth: Some(32),
                bytes_num: 4,
                bytes_den: 1,
            },
        ];
        Self { rows }
    }

    /// Structural match of a candidate, constrained to `fixed` when a
    /// palette preference is set. Returns the palette and frame byte size.
    fn resolve(
        &self,
        candidate: &PixelFormatCandidate,
        fixed: Option<Palette>,
    ) -> Option<(Palette, usize)> {
        self.rows
            .iter()
            .find(|row| {
                fixed.map_or(true, |p| row.palette == p)
                    && row.fourcc == candidate.fourcc
                    && row.depth.map_or(true, |d| candidate.depth == Some(d))
            })
            .map(|row| (row.palette, row.frame_bytes(candidate.width, candidate.height)))
    }
}

/// Result of evaluating one candidate against the table and the device.
enum CandidateOutcome {
    Accepted(CaptureConfig),
    DeviceRefused,
    Unmatched,
}

pub struct FormatNegotiator {
    table: FormatTable,
}

impl FormatNegotiator {
    pub fn new(table: FormatTable) -> Self {
        Self { table }
    }

    /// Walk the candidate list in offer order and return the first
    /// configuration the device accepts.
    ///
    /// A closed device defers the whole attempt; exhausting the list with
    /// the device open refuses it. A candidate the device turns down during
    /// probing is skipped, not fatal.
    pub fn negotiate(
        &self,
        device: &dyn VideoDevice,
        candidates: &[PixelFormatCandidate],
        fixed: Option<Palette>,
    ) -> Result<CaptureConfig, NegotiationError> {
        // Leftover buffers from an earlier negotiation must go before the
        // device geometry can change.
        if device.is_active() {
            device
                .capture_deinit()
                .map_err(|_| NegotiationError::Refused)?;
        } else if !device.is_open() {
            return Err(NegotiationError::Deferred);
        }

        for candidate in candidates {
            match self.try_candidate(device, candidate, fixed) {
                CandidateOutcome::Accepted(config) => {
                    info!(
                        palette = config.palette.name(),
                        fourcc = ?config.fourcc,
                        width = config.width,
                        height = config.height,
                        buffer_size = config.buffer_size,
                        "format negotiated"
                    );
                    return Ok(config);
                }
                CandidateOutcome::DeviceRefused => {
                    debug!(fourcc = ?candidate.fourcc, "device refused candidate");
                }
                CandidateOutcome::Unmatched => {}
            }
        }

        Err(NegotiationError::Refused)
    }

    fn try_candidate(
        &self,
        device: &dyn VideoDevice,
        candidate: &PixelFormatCandidate,
        fixed: Option<Palette>,
    ) -> CandidateOutcome {
        let Some((palette, buffer_size)) = self.table.resolve(candidate, fixed) else {
            return CandidateOutcome::Unmatched;
        };

        if !device.query_capability(palette) {
            return CandidateOutcome::DeviceRefused;
        }
        if device
            .set_capture(candidate.width, candidate.height, palette)
            .is_err()
        {
            return CandidateOutcome::DeviceRefused;
        }
        if device.capture_init().is_err() {
            return CandidateOutcome::DeviceRefused;
        }

        CandidateOutcome::Accepted(CaptureConfig {
            palette,
            fourcc: candidate.fourcc,
            width: candidate.width,
            height: candidate.height,
            buffer_size,
        })
    }
}
