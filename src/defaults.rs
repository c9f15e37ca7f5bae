//! Default configuration constants for charla.
//!
//! Shared constants used across the transport, scheduler, and session layers
//! to ensure consistency and eliminate duplication.

/// Sample rate of synthesized voice audio in Hz.
///
/// The backend's speech synthesis emits 24kHz LINEAR16 mono; every chunk in a
/// stream shares this rate, so it is a constant rather than per-chunk metadata.
pub const SAMPLE_RATE: u32 = 24_000;

/// Scheduling guard in seconds.
///
/// A chunk is never scheduled closer than this to the device clock, so the
/// first unit of a session cannot underrun while the schedule call completes.
pub const SCHEDULE_GUARD_SECS: f64 = 0.010;

/// Tolerance in seconds when deciding the playback watermark has been reached.
///
/// Absorbs timer wake-up jitter so a completion check that lands a few
/// milliseconds early does not re-arm for a near-zero remainder.
pub const COMPLETION_TOLERANCE_SECS: f64 = 0.010;

/// Delimiter between frames in the chunked response body.
pub const FRAME_DELIMITER: &[u8] = b"\n\n";

/// Prefix carried by data frames; anything else is a control/comment frame.
pub const DATA_PREFIX: &str = "data: ";

/// Minimum size in bytes for a recording to be worth submitting.
///
/// Anything smaller is a misfire (button tapped, codec header only) and is
/// rejected before upload.
pub const MIN_CAPTURE_BYTES: usize = 100;

/// Default backend base URL.
pub const BACKEND_URL: &str = "http://127.0.0.1:5000";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_is_positive_and_small() {
        assert!(SCHEDULE_GUARD_SECS > 0.0);
        assert!(SCHEDULE_GUARD_SECS < 0.1);
    }

    #[test]
    fn frame_delimiter_is_blank_line() {
        assert_eq!(FRAME_DELIMITER, b"\n\n");
    }
}
