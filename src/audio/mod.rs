//! Gapless audio playback for streamed voice replies.
//!
//! ```text
//! base64 chunk ──▶ pcm decode ──▶ AudioScheduler ──▶ AudioSink (device)
//!                                      │
//!                                      └──▶ PlaybackDone (completion)
//! ```
//!
//! The scheduler places each decoded chunk back-to-back on the sink's clock so
//! playback stays seamless regardless of network arrival jitter.

pub mod completion;
pub mod pcm;
#[cfg(feature = "cpal-audio")]
pub mod playback;
pub mod scheduler;
pub mod sink;

pub use completion::PlaybackDone;
#[cfg(feature = "cpal-audio")]
pub use playback::CpalAudioSink;
pub use scheduler::AudioScheduler;
pub use sink::{AudioSink, MockAudioSink, UnitId};
