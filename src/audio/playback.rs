//! Real audio output using CPAL (Cross-Platform Audio Library).

use crate::audio::sink::{AudioSink, UnitId, lock_unpoisoned};
use crate::defaults;
use crate::error::{CharlaError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::{Arc, Mutex};
use tracing::warn;

/// Run a closure with stderr temporarily redirected to /dev/null.
///
/// This suppresses noisy ALSA/JACK/PipeWire messages that CPAL triggers
/// when probing audio backends. The messages are harmless but confusing to users.
///
/// # Safety
/// Uses `libc::dup`/`libc::dup2` to save and restore file descriptor 2 (stderr).
/// Safe as long as no other thread is concurrently manipulating fd 2.
fn with_suppressed_stderr<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    unsafe {
        let saved_fd = libc::dup(2);
        let devnull = libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY);
        if saved_fd >= 0 && devnull >= 0 {
            libc::dup2(devnull, 2);
            libc::close(devnull);
        }

        let result = f();

        if saved_fd >= 0 {
            libc::dup2(saved_fd, 2);
            libc::close(saved_fd);
        }

        result
    }
}

/// Preferred device names for GNOME/PipeWire environments.
const PREFERRED_DEVICES: &[&str] = &["pipewire", "pulse", "PulseAudio"];

/// Check if a device is a preferred device.
fn is_preferred_device(name: &str) -> bool {
    let lower = name.to_lowercase();
    PREFERRED_DEVICES
        .iter()
        .any(|pref| lower.contains(&pref.to_lowercase()))
}

/// Get the best default output device, preferring PipeWire/PulseAudio.
///
/// This ensures we respect the desktop's audio device selection.
fn get_best_default_device() -> Result<cpal::Device> {
    with_suppressed_stderr(|| {
        let host = cpal::default_host();

        if let Ok(devices) = host.output_devices() {
            for device in devices {
                if let Ok(name) = device.name()
                    && is_preferred_device(&name)
                {
                    return Ok(device);
                }
            }
        }

        host.default_output_device()
            .ok_or_else(|| CharlaError::AudioDeviceNotFound {
                device: "default".to_string(),
            })
    })
}

/// Wrapper for cpal::Stream to make it Send.
///
/// SAFETY: We ensure that the stream is only accessed from a single thread at
/// a time through the Mutex wrapper in CpalAudioSink. The stream methods are
/// called synchronously and don't cross thread boundaries unsafely.
struct SendableStream(cpal::Stream);

unsafe impl Send for SendableStream {}

/// One region of source-rate samples committed to the device timeline.
struct ScheduledUnit {
    /// Start position in native device frames.
    start_frame: u64,
    samples: Vec<f32>,
}

impl ScheduledUnit {
    /// True once the device clock has consumed every sample of this unit.
    fn finished(&self, rendered_frames: u64, step: f64) -> bool {
        rendered_frames > self.start_frame
            && ((rendered_frames - self.start_frame) as f64 * step) as usize >= self.samples.len()
    }
}

#[derive(Default)]
struct MixerState {
    /// Device clock: native frames rendered since the stream started.
    rendered_frames: u64,
    next_id: UnitId,
    units: Vec<ScheduledUnit>,
}

/// Renders `frames` device frames starting at clock `base` into `out`,
/// mixing every scheduled unit that covers each instant and fanning the mono
/// signal out to all channels. `step` converts device frames to source-sample
/// offsets (source rate / native rate).
fn render_frames(units: &[ScheduledUnit], base: u64, channels: usize, step: f64, out: &mut [f32]) {
    let frames = out.len() / channels;
    for i in 0..frames {
        let t = base + i as u64;
        let mut acc = 0.0f32;
        for unit in units {
            if t < unit.start_frame {
                continue;
            }
            let idx = ((t - unit.start_frame) as f64 * step) as usize;
            if let Some(&sample) = unit.samples.get(idx) {
                acc += sample;
            }
        }
        let value = acc.clamp(-1.0, 1.0);
        for ch in 0..channels {
            out[i * channels + ch] = value;
        }
    }
}

/// Real audio output implementation using CPAL.
///
/// Runs the device at its native config and renders scheduled 24kHz mono
/// units into it from the stream callback, sample-accurately: the device
/// clock is the count of frames actually rendered, so unit boundaries land
/// exactly where the scheduler committed them.
///
/// Note: The stream is wrapped in SendableStream + Mutex to make it Send.
/// This is safe because we ensure exclusive access through the Mutex.
pub struct CpalAudioSink {
    device: cpal::Device,
    stream: Arc<Mutex<Option<SendableStream>>>,
    mixer: Arc<Mutex<MixerState>>,
    native_rate: u32,
    native_channels: usize,
    sample_format: cpal::SampleFormat,
    source_rate: u32,
}

impl CpalAudioSink {
    /// Create a new CPAL output sink.
    ///
    /// # Arguments
    /// * `device_name` - Optional device name. If None, uses the best default
    ///   output device (prefers PipeWire/PulseAudio).
    ///
    /// # Errors
    /// Returns errors if the device is not found or its output config cannot
    /// be queried.
    pub fn new(device_name: Option<&str>) -> Result<Self> {
        let device = with_suppressed_stderr(|| {
            let host = cpal::default_host();

            if let Some(name) = device_name {
                let devices = host
                    .output_devices()
                    .map_err(|e| CharlaError::AudioPlayback {
                        message: format!("Failed to enumerate output devices: {}", e),
                    })?;

                let mut found_device = None;
                for dev in devices {
                    if let Ok(dev_name) = dev.name()
                        && dev_name == name
                    {
                        found_device = Some(dev);
                        break;
                    }
                }

                found_device.ok_or_else(|| CharlaError::AudioDeviceNotFound {
                    device: name.to_string(),
                })
            } else {
                get_best_default_device()
            }
        })?;

        let default_config =
            device
                .default_output_config()
                .map_err(|e| CharlaError::AudioPlayback {
                    message: format!("Failed to query default output config: {}", e),
                })?;

        Ok(Self {
            device,
            stream: Arc::new(Mutex::new(None)),
            mixer: Arc::new(Mutex::new(MixerState::default())),
            native_rate: default_config.sample_rate().0,
            native_channels: default_config.channels() as usize,
            sample_format: default_config.sample_format(),
            source_rate: defaults::SAMPLE_RATE,
        })
    }

    /// Device frames consumed per source sample.
    fn step(&self) -> f64 {
        self.source_rate as f64 / self.native_rate as f64
    }

    /// Build the output stream at the device's native config.
    fn build_stream(&self) -> Result<cpal::Stream> {
        use cpal::SampleFormat;

        let stream_config = cpal::StreamConfig {
            channels: self.native_channels as u16,
            sample_rate: cpal::SampleRate(self.native_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let err_callback = |err| {
            warn!("Audio stream error: {}", err);
        };

        let channels = self.native_channels;
        let step = self.step();

        match self.sample_format {
            SampleFormat::F32 => {
                let mixer = Arc::clone(&self.mixer);
                self.device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                            let mut state = lock_unpoisoned(&mixer);
                            let base = state.rendered_frames;
                            render_frames(&state.units, base, channels, step, data);
                            state.rendered_frames += (data.len() / channels) as u64;
                            let rendered = state.rendered_frames;
                            state.units.retain(|u| !u.finished(rendered, step));
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| CharlaError::AudioPlayback {
                        message: format!("Failed to build f32 output stream: {}", e),
                    })
            }
            SampleFormat::I16 => {
                let mixer = Arc::clone(&self.mixer);
                self.device
                    .build_output_stream(
                        &stream_config,
                        move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                            let mut state = lock_unpoisoned(&mixer);
                            let base = state.rendered_frames;
                            let mut float_buf = vec![0.0f32; data.len()];
                            render_frames(&state.units, base, channels, step, &mut float_buf);
                            for (dst, src) in data.iter_mut().zip(float_buf.iter()) {
                                *dst = (src * i16::MAX as f32) as i16;
                            }
                            state.rendered_frames += (data.len() / channels) as u64;
                            let rendered = state.rendered_frames;
                            state.units.retain(|u| !u.finished(rendered, step));
                        },
                        err_callback,
                        None,
                    )
                    .map_err(|e| CharlaError::AudioPlayback {
                        message: format!("Failed to build i16 output stream: {}", e),
                    })
            }
            fmt => Err(CharlaError::AudioPlayback {
                message: format!("Unsupported native sample format: {:?}", fmt),
            }),
        }
    }
}

impl AudioSink for CpalAudioSink {
    fn resume(&mut self) -> Result<()> {
        {
            let stream_guard = lock_unpoisoned(&self.stream);
            if stream_guard.is_some() {
                return Ok(()); // Already running
            }
        }

        let stream = self.build_stream()?;
        stream.play().map_err(|e| CharlaError::AudioPlayback {
            message: format!("Failed to start audio stream: {}", e),
        })?;

        let mut stream_guard = lock_unpoisoned(&self.stream);
        *stream_guard = Some(SendableStream(stream));
        Ok(())
    }

    fn current_time(&self) -> f64 {
        lock_unpoisoned(&self.mixer).rendered_frames as f64 / self.native_rate as f64
    }

    fn schedule(&mut self, samples: Vec<f32>, start_at: f64) -> Result<UnitId> {
        let mut state = lock_unpoisoned(&self.mixer);
        let id = state.next_id;
        state.next_id += 1;
        state.units.push(ScheduledUnit {
            start_frame: (start_at * self.native_rate as f64).round() as u64,
            samples,
        });
        Ok(id)
    }

    fn stop_all(&mut self) {
        lock_unpoisoned(&self.mixer).units.clear();
    }
}
