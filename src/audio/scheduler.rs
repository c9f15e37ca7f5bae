//! Gapless playback scheduling.
//!
//! Chunks arrive at irregular intervals and sizes; starting each one "on
//! arrival" would overlap or leave silence whenever arrival jitter differs
//! from chunk duration. The scheduler keeps a running watermark
//! (`next_play_time`) so every chunk starts exactly where the previous one
//! ends, decoupling playback smoothness from network timing as long as chunks
//! arrive faster than they play on average.

use crate::audio::completion::{CompletionSlot, PlaybackDone};
use crate::audio::pcm;
use crate::audio::sink::{AudioSink, lock_unpoisoned};
use crate::defaults;
use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

struct SchedulerState<S> {
    sink: S,
    sample_rate: u32,
    guard_secs: f64,
    next_play_time: f64,
    all_chunks_received: bool,
    // Session identity; bumped on begin_session and stop so timers armed for a
    // superseded session can never fire into the current one.
    epoch: u64,
    completion: CompletionSlot,
    // Captured at construction so completion timers can be spawned from any
    // thread, including device callback threads outside the runtime.
    runtime: tokio::runtime::Handle,
}

/// Schedules decoded chunks back-to-back on one shared audio sink.
///
/// Cheap to clone; clones share the same session state and sink.
pub struct AudioScheduler<S: AudioSink> {
    inner: Arc<Mutex<SchedulerState<S>>>,
}

impl<S: AudioSink> Clone for AudioScheduler<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AudioSink + 'static> AudioScheduler<S> {
    /// Creates a scheduler that owns `sink` as its single output device.
    ///
    /// # Panics
    /// Must be called within a tokio runtime; the runtime handle is captured
    /// here so the other methods can be called from any thread.
    pub fn new(sink: S, sample_rate: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerState {
                sink,
                sample_rate,
                guard_secs: defaults::SCHEDULE_GUARD_SECS,
                next_play_time: 0.0,
                all_chunks_received: false,
                epoch: 0,
                completion: CompletionSlot::default(),
                runtime: tokio::runtime::Handle::current(),
            })),
        }
    }

    /// Starts a fresh playback session.
    ///
    /// Always stops the previous session first, so at most one session's audio
    /// is ever audible. Resumes the device (the first call is the device
    /// initialization point) and resets the watermark to the device clock.
    ///
    /// Returns the session's completion handle; it resolves `true` when the
    /// last scheduled sample has actually finished rendering, `false` if the
    /// session is superseded before then.
    pub fn begin_session(&self) -> Result<PlaybackDone> {
        let mut state = lock_unpoisoned(&self.inner);
        state.sink.stop_all();
        state.epoch += 1;
        state.completion.cancel();
        state.sink.resume()?;
        state.next_play_time = state.sink.current_time();
        state.all_chunks_received = false;
        debug!(epoch = state.epoch, "playback session started");
        Ok(state.completion.arm())
    }

    /// Decodes one chunk payload and schedules it seamlessly after the
    /// previously scheduled audio.
    ///
    /// A payload that fails to decode is logged and skipped; one bad chunk
    /// must not stall the rest of the session. Sink scheduling failures are
    /// real device errors and propagate.
    pub fn play_chunk(&self, payload: &str) -> Result<()> {
        let samples = match pcm::decode_chunk(payload) {
            Ok(samples) => samples,
            Err(e) => {
                warn!(error = %e, "skipping undecodable audio chunk");
                return Ok(());
            }
        };
        if samples.is_empty() {
            return Ok(());
        }

        let mut state = lock_unpoisoned(&self.inner);
        let now = state.sink.current_time();
        let start = state.next_play_time.max(now + state.guard_secs);
        let duration = pcm::duration_secs(samples.len(), state.sample_rate);
        state.sink.schedule(samples, start)?;
        state.next_play_time = start + duration;
        self.evaluate_completion(&mut state);
        Ok(())
    }

    /// Marks the chunk stream as exhausted.
    ///
    /// This only means no more chunks will arrive; the last scheduled unit may
    /// still be rendering, so completion fires later, when the watermark is
    /// reached.
    pub fn finish_streaming(&self) {
        let mut state = lock_unpoisoned(&self.inner);
        state.all_chunks_received = true;
        debug!("all audio chunks received");
        self.evaluate_completion(&mut state);
    }

    /// Hard-stops every active unit and resets the session.
    ///
    /// Used both for explicit interruption and defensively at the start of
    /// every new session. The session's completion handle resolves as
    /// cancelled.
    pub fn stop(&self) {
        let mut state = lock_unpoisoned(&self.inner);
        state.sink.stop_all();
        state.epoch += 1;
        state.next_play_time = 0.0;
        state.all_chunks_received = false;
        state.completion.cancel();
        debug!("playback stopped");
    }

    /// Current watermark: the earliest time the next unit may start without
    /// overlapping scheduled audio.
    pub fn next_play_time(&self) -> f64 {
        lock_unpoisoned(&self.inner).next_play_time
    }

    /// Spawns a timer that fires the completion slot once the watermark has
    /// been reached, re-checking on wake since later chunks may have extended
    /// it. The epoch check keeps a stale timer from touching a newer session.
    fn evaluate_completion(&self, state: &mut SchedulerState<S>) {
        if !state.all_chunks_received || !state.completion.is_armed() {
            return;
        }
        let epoch = state.epoch;
        let runtime = state.runtime.clone();
        let scheduler = self.clone();
        runtime.spawn(async move {
            loop {
                let remaining = {
                    let state = lock_unpoisoned(&scheduler.inner);
                    if state.epoch != epoch || !state.completion.is_armed() {
                        return;
                    }
                    state.next_play_time - state.sink.current_time()
                };
                if remaining <= defaults::COMPLETION_TOLERANCE_SECS {
                    break;
                }
                tokio::time::sleep(Duration::from_secs_f64(remaining)).await;
            }

            let mut state = lock_unpoisoned(&scheduler.inner);
            if state.epoch == epoch {
                debug!("playback watermark reached");
                state.completion.fire();
            }
        });
    }
}
