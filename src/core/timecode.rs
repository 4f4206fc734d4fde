//! Frame/time mapping at a fixed frame rate
//!
//! **Why**: Annotations and previews live in the frame-index domain, media
//! transports in the millisecond domain. One rounding convention in one
//! place keeps stored annotations bound to the frames they were drawn on.
//!
//! **Used by**: engine (decode timestamps -> frame index), store lookups,
//! preview indexing, UI time labels.
//!
//! # Frame Rate Resolution
//!
//! `Fps` is resolved exactly once per loaded master, from the transport's
//! stream metadata. A non-positive or non-finite rate is a fatal load error:
//! guessing a default would silently remap every stored annotation onto the
//! wrong frames.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Validated frames-per-second value, guaranteed finite and positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fps(f64);

/// Frame rate metadata errors
#[derive(Debug, Clone, PartialEq)]
pub enum TimecodeError {
    /// Stream metadata did not yield a positive numeric frame rate
    FrameRateUnavailable(f64),
}

impl fmt::Display for TimecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimecodeError::FrameRateUnavailable(raw) => {
                write!(f, "frame rate unavailable (metadata reported {})", raw)
            }
        }
    }
}

impl std::error::Error for TimecodeError {}

impl Fps {
    /// Validate a raw metadata frame rate.
    pub fn new(raw: f64) -> Result<Self, TimecodeError> {
        if raw.is_finite() && raw > 0.0 {
            Ok(Self(raw))
        } else {
            Err(TimecodeError::FrameRateUnavailable(raw))
        }
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Fps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps", self.0)
    }
}

/// Timestamp of frame `idx` in milliseconds.
pub fn frame_to_ms(idx: u32, fps: Fps) -> u64 {
    (idx as f64 / fps.get() * 1000.0).round() as u64
}

/// Frame index displayed at timestamp `ms`.
pub fn ms_to_frame(ms: u64, fps: Fps) -> u32 {
    (ms as f64 / 1000.0 * fps.get()).round() as u32
}

/// Format a millisecond position as "mm:ss", or "hh:mm:ss" past one hour.
pub fn fmt_ms(ms: u64) -> String {
    let s = ms / 1000;
    let h = s / 3600;
    let m = (s % 3600) / 60;
    let s = s % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_rejects_bad_metadata() {
        assert!(Fps::new(0.0).is_err());
        assert!(Fps::new(-24.0).is_err());
        assert!(Fps::new(f64::NAN).is_err());
        assert!(Fps::new(f64::INFINITY).is_err());
        assert!(Fps::new(29.97).is_ok());
    }

    /// Round-trip within one frame for representative rates, including
    /// non-integer NTSC rates.
    #[test]
    fn test_round_trip() {
        for raw in [23.976, 24.0, 25.0, 29.97, 30.0, 59.94, 60.0, 120.0] {
            let fps = Fps::new(raw).unwrap();
            for idx in [0u32, 1, 29, 30, 45, 999, 100_000] {
                let back = ms_to_frame(frame_to_ms(idx, fps), fps);
                assert!(
                    back.abs_diff(idx) <= 1,
                    "{} fps: frame {} -> {} after round trip",
                    raw,
                    idx,
                    back
                );
            }
        }
    }

    #[test]
    fn test_known_mapping() {
        let fps = Fps::new(30.0).unwrap();
        assert_eq!(frame_to_ms(45, fps), 1500);
        assert_eq!(ms_to_frame(1500, fps), 45);
        assert_eq!(ms_to_frame(0, fps), 0);
    }

    #[test]
    fn test_fmt_ms() {
        assert_eq!(fmt_ms(0), "00:00");
        assert_eq!(fmt_ms(61_000), "01:01");
        assert_eq!(fmt_ms(3_661_000), "01:01:01");
        // sub-second positions truncate toward zero
        assert_eq!(fmt_ms(999), "00:00");
    }
}
