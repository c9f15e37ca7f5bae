//! Output device abstraction.
//!
//! Exactly one sink instance backs all interactions in a session; the
//! scheduler enforces single-writer discipline by stopping the previous
//! session's units before scheduling new ones.

use crate::error::Result;
use std::sync::{Arc, Mutex, MutexGuard};

/// Identifier of one scheduled playback unit.
pub type UnitId = u64;

/// Trait for audio output devices.
///
/// This trait allows swapping implementations (real audio device vs mock).
/// Times are seconds on the device clock, which starts at zero and advances
/// only while the device renders.
pub trait AudioSink: Send {
    /// Ensure the device is running and able to render scheduled audio.
    ///
    /// Called at the start of every playback session; the first call is the
    /// device initialization point.
    fn resume(&mut self) -> Result<()>;

    /// Current position of the device clock in seconds.
    fn current_time(&self) -> f64;

    /// Schedule `samples` (mono, source rate) to start at `start_at` seconds
    /// on the device clock. The unit plays to its end unless [`stop_all`] is
    /// called; the sink drops it on natural completion.
    ///
    /// [`stop_all`]: AudioSink::stop_all
    fn schedule(&mut self, samples: Vec<f32>, start_at: f64) -> Result<UnitId>;

    /// Hard-stop and discard every unit that has not finished.
    fn stop_all(&mut self);
}

/// Locks a mutex, recovering the guard if a holder panicked.
pub(crate) fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// One unit recorded by the mock sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MockUnit {
    pub id: UnitId,
    pub start_at: f64,
    pub duration: f64,
    pub sample_count: usize,
}

#[derive(Debug, Default)]
struct MockState {
    clock: f64,
    next_id: UnitId,
    scheduled: Vec<MockUnit>,
    active: Vec<UnitId>,
    resume_count: u32,
    stop_all_count: u32,
}

/// Mock audio sink for testing.
///
/// The clock only moves when the test calls [`advance`]; scheduled units are
/// recorded for inspection and considered active until stopped or until the
/// clock passes their end.
///
/// [`advance`]: MockAudioSink::advance
#[derive(Debug, Clone)]
pub struct MockAudioSink {
    state: Arc<Mutex<MockState>>,
    sample_rate: u32,
    should_fail_resume: bool,
    should_fail_schedule: bool,
    error_message: String,
}

impl MockAudioSink {
    /// Create a new mock sink with a clock at zero.
    pub fn new(sample_rate: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            sample_rate,
            should_fail_resume: false,
            should_fail_schedule: false,
            error_message: "mock sink error".to_string(),
        }
    }

    /// Configure the mock to fail on resume.
    pub fn with_resume_failure(mut self) -> Self {
        self.should_fail_resume = true;
        self
    }

    /// Configure the mock to fail on schedule.
    pub fn with_schedule_failure(mut self) -> Self {
        self.should_fail_schedule = true;
        self
    }

    /// Configure the error message for failures.
    pub fn with_error_message(mut self, message: &str) -> Self {
        self.error_message = message.to_string();
        self
    }

    /// Advance the mock device clock by `secs`, retiring units that finished.
    pub fn advance(&self, secs: f64) {
        let mut state = lock_unpoisoned(&self.state);
        state.clock += secs;
        let clock = state.clock;
        let scheduled = state.scheduled.clone();
        state
            .active
            .retain(|id| match scheduled.iter().find(|u| u.id == *id) {
                Some(unit) => unit.start_at + unit.duration > clock,
                None => false,
            });
    }

    /// Every unit ever scheduled, in schedule order.
    pub fn scheduled(&self) -> Vec<MockUnit> {
        lock_unpoisoned(&self.state).scheduled.clone()
    }

    /// Units that have neither finished nor been stopped.
    pub fn active_units(&self) -> Vec<UnitId> {
        lock_unpoisoned(&self.state).active.clone()
    }

    /// Number of times `resume` was called.
    pub fn resume_count(&self) -> u32 {
        lock_unpoisoned(&self.state).resume_count
    }

    /// Number of times `stop_all` was called.
    pub fn stop_all_count(&self) -> u32 {
        lock_unpoisoned(&self.state).stop_all_count
    }
}

impl AudioSink for MockAudioSink {
    fn resume(&mut self) -> Result<()> {
        if self.should_fail_resume {
            return Err(crate::error::CharlaError::AudioPlayback {
                message: self.error_message.clone(),
            });
        }
        lock_unpoisoned(&self.state).resume_count += 1;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        lock_unpoisoned(&self.state).clock
    }

    fn schedule(&mut self, samples: Vec<f32>, start_at: f64) -> Result<UnitId> {
        if self.should_fail_schedule {
            return Err(crate::error::CharlaError::AudioPlayback {
                message: self.error_message.clone(),
            });
        }
        let mut state = lock_unpoisoned(&self.state);
        let id = state.next_id;
        state.next_id += 1;
        state.scheduled.push(MockUnit {
            id,
            start_at,
            duration: samples.len() as f64 / self.sample_rate as f64,
            sample_count: samples.len(),
        });
        state.active.push(id);
        Ok(id)
    }

    fn stop_all(&mut self) {
        let mut state = lock_unpoisoned(&self.state);
        state.active.clear();
        state.stop_all_count += 1;
    }
}
