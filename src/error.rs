//! Error types for charla.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CharlaError {
    // Transport errors — terminal for the in-flight interaction
    #[error("Backend returned status {status}")]
    BackendStatus { status: u16 },

    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    // Per-frame decode errors — the frame is dropped, the stream continues
    #[error("Frame decode failed: {message}")]
    FrameDecode { message: String },

    // Per-chunk decode errors — the chunk is dropped, the session continues
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    // Audio output errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio playback failed: {message}")]
    AudioPlayback { message: String },

    // Capture handoff errors — the attempt is rejected, fencing state untouched
    #[error("Capture rejected: {message}")]
    Capture { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, CharlaError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_backend_status_display() {
        let error = CharlaError::BackendStatus { status: 502 };
        assert_eq!(error.to_string(), "Backend returned status 502");
    }

    #[test]
    fn test_frame_decode_display() {
        let error = CharlaError::FrameDecode {
            message: "expected value at line 1".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Frame decode failed: expected value at line 1"
        );
    }

    #[test]
    fn test_audio_decode_display() {
        let error = CharlaError::AudioDecode {
            message: "invalid base64".to_string(),
        };
        assert_eq!(error.to_string(), "Audio decode failed: invalid base64");
    }

    #[test]
    fn test_audio_device_not_found_display() {
        let error = CharlaError::AudioDeviceNotFound {
            device: "default".to_string(),
        };
        assert_eq!(error.to_string(), "Audio device not found: default");
    }

    #[test]
    fn test_audio_playback_display() {
        let error = CharlaError::AudioPlayback {
            message: "stream build failed".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Audio playback failed: stream build failed"
        );
    }

    #[test]
    fn test_capture_display() {
        let error = CharlaError::Capture {
            message: "recording too short".to_string(),
        };
        assert_eq!(error.to_string(), "Capture rejected: recording too short");
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: CharlaError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CharlaError>();
        assert_sync::<CharlaError>();
    }

    #[test]
    fn test_error_source_chain_io() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error: CharlaError = io_error.into();

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }
}
