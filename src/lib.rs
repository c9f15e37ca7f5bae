//! charla - Streaming client engine for a conversational voice tutor
//!
//! Consumes a framed event stream from the backend, renders text
//! incrementally, plays the synthesized voice reply gaplessly, and lets the
//! user interrupt an in-flight turn at any time without hearing or seeing
//! leftovers of the abandoned one.

// Enforce error handling discipline
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
pub mod client;
pub mod config;
pub mod conversation;
pub mod defaults;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;

// Core seams (device → scheduler → session → view)
pub use audio::{AudioScheduler, AudioSink, MockAudioSink, PlaybackDone};
pub use session::{ChatView, InteractionId, SessionController, UiStatus};

// Orchestration
pub use client::{BackendClient, RecordedAudio, TextReply};
pub use conversation::Conversation;

// Error handling
pub use error::{CharlaError, Result};

// Config
pub use config::Config;

#[cfg(feature = "cpal-audio")]
pub use audio::CpalAudioSink;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
