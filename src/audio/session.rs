//! Microphone capture session
//!
//! Owns the cpal input stream and the state it shares with the audio
//! callback: a fixed-size ring of recent samples feeding the spectral
//! sampler, an optional recording buffer, and an optional loopback queue
//! for the speaker monitor. The callback only ever takes one short lock;
//! it never blocks on recording or loopback consumers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use log::{error, info};

use super::sampler::{SpectralSampler, FFT_SIZE};

/// Configuration constants for the capture path
mod constants {
    /// Gain applied to samples routed to the loopback monitor
    pub const MONITOR_GAIN: f32 = 0.5;

    /// Upper bound on buffered loopback samples before the oldest are
    /// dropped (~170 ms at 48 kHz). Dropping beats stalling the callback.
    pub const LOOPBACK_QUEUE_MAX: usize = 8192;
}

use constants::*;

/// Capture state shared between the audio callback and the UI thread.
#[derive(Clone)]
pub struct SharedInput {
    inner: Arc<Mutex<InputInner>>,
}

struct InputInner {
    /// Most recent samples, oldest overwritten first
    ring: Vec<f32>,
    write_pos: usize,
    /// Accumulates samples while a recording is armed
    recording: Option<Vec<f32>>,
    /// Pending samples for the loopback monitor, pre-scaled by gain
    loopback: Option<VecDeque<f32>>,
}

impl SharedInput {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(InputInner {
                ring: vec![0.0; FFT_SIZE],
                write_pos: 0,
                recording: None,
                loopback: None,
            })),
        }
    }

    /// Feed interleaved samples from the capture callback. Takes the first
    /// channel of each frame as the mono signal.
    pub fn push_samples(&self, interleaved: &[f32], channels: usize) {
        let channels = channels.max(1);
        let mut inner = self.inner.lock().unwrap();
        let ring_len = inner.ring.len();

        for frame in interleaved.chunks(channels) {
            let sample = frame[0];

            let pos = inner.write_pos;
            inner.ring[pos] = sample;
            inner.write_pos = (pos + 1) % ring_len;

            if let Some(recording) = inner.recording.as_mut() {
                recording.push(sample);
            }
            if let Some(queue) = inner.loopback.as_mut() {
                if queue.len() >= LOOPBACK_QUEUE_MAX {
                    queue.pop_front();
                }
                queue.push_back(sample * MONITOR_GAIN);
            }
        }
    }

    /// Copy the ring into `out`, oldest sample first. `out` must be the
    /// ring's length.
    pub fn copy_ring(&self, out: &mut [f32]) {
        let inner = self.inner.lock().unwrap();
        let len = inner.ring.len().min(out.len());
        for (i, slot) in out.iter_mut().take(len).enumerate() {
            *slot = inner.ring[(inner.write_pos + i) % inner.ring.len()];
        }
    }

    /// Arm recording; subsequent callback samples accumulate.
    pub fn start_recording(&self) {
        self.inner.lock().unwrap().recording = Some(Vec::new());
    }

    /// Disarm recording and return everything captured since arming.
    pub fn stop_recording(&self) -> Vec<f32> {
        self.inner.lock().unwrap().recording.take().unwrap_or_default()
    }

    pub fn is_recording(&self) -> bool {
        self.inner.lock().unwrap().recording.is_some()
    }

    /// Samples captured so far in the armed recording.
    pub fn recorded_len(&self) -> usize {
        self.inner
            .lock()
            .unwrap()
            .recording
            .as_ref()
            .map_or(0, Vec::len)
    }

    /// Enable or disable the loopback queue. Disabling discards anything
    /// still buffered.
    pub fn set_loopback(&self, enabled: bool) {
        let mut inner = self.inner.lock().unwrap();
        inner.loopback = enabled.then(VecDeque::new);
    }

    /// Drain buffered loopback samples into `out`, zero-filling on
    /// underrun.
    pub fn fill_loopback(&self, out: &mut [f32]) {
        let mut inner = self.inner.lock().unwrap();
        match inner.loopback.as_mut() {
            Some(queue) => {
                for slot in out.iter_mut() {
                    *slot = queue.pop_front().unwrap_or(0.0);
                }
            }
            None => out.fill(0.0),
        }
    }
}

impl Default for SharedInput {
    fn default() -> Self {
        Self::new()
    }
}

/// A running capture stream plus the sampler analyzing it.
pub struct CaptureSession {
    // Held so the stream keeps running; dropped on teardown
    _stream: cpal::Stream,
    shared: SharedInput,
    sampler: SpectralSampler,
    device_name: String,
    sample_rate: u32,
}

impl CaptureSession {
    /// Open a capture session on `device` at its default input config.
    pub fn open(device: &cpal::Device) -> Result<Self> {
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_input_config()
            .with_context(|| format!("no supported input config on '{device_name}'"))?;

        if supported.sample_format() != SampleFormat::F32 {
            bail!(
                "input device '{}' does not offer f32 samples ({:?})",
                device_name,
                supported.sample_format()
            );
        }

        let channels = supported.channels();
        if channels == 0 {
            bail!("input device '{device_name}' reported 0 channels");
        }
        let sample_rate = supported.sample_rate().0;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let shared = SharedInput::new();
        let callback_shared = shared.clone();
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    callback_shared.push_samples(data, channels as usize);
                },
                |err| error!("capture stream error: {err}"),
                None,
            )
            .with_context(|| format!("failed to build input stream on '{device_name}'"))?;
        stream.play().context("failed to start input stream")?;

        let sampler = SpectralSampler::new(shared.clone(), sample_rate);
        info!(
            "capture session on '{}': {} Hz, {} channels, {} bins",
            device_name,
            sample_rate,
            channels,
            sampler.bin_count()
        );

        Ok(Self {
            _stream: stream,
            shared,
            sampler,
            device_name,
            sample_rate,
        })
    }

    pub fn sampler(&self) -> &SpectralSampler {
        &self.sampler
    }

    pub fn shared(&self) -> &SharedInput {
        &self.shared
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
