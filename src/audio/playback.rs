//! Playback of recorded clips and the live loopback monitor
//!
//! Both run cpal output streams on the selected playback device. Clip
//! playback steps through an in-memory buffer with a fractional position,
//! so clips recorded at one rate play correctly on a device running at
//! another. The loopback monitor drains the capture session's pre-scaled
//! queue; it assumes capture and playback run at the same rate, which holds
//! on the single shared clock of typical desktop audio servers.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::SampleFormat;
use log::error;

use super::session::SharedInput;

/// Playback position shared with the output callback.
#[derive(Clone)]
struct SharedPlayback {
    inner: Arc<Mutex<PlaybackInner>>,
}

struct PlaybackInner {
    samples: Vec<f32>,
    /// Fractional read position into `samples`
    position: f64,
    /// Source-rate samples consumed per output frame
    step: f64,
    playing: bool,
}

impl SharedPlayback {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(PlaybackInner {
                samples: Vec::new(),
                position: 0.0,
                step: 1.0,
                playing: false,
            })),
        }
    }

    fn load(&self, samples: Vec<f32>, step: f64) {
        let mut inner = self.inner.lock().unwrap();
        inner.samples = samples;
        inner.position = 0.0;
        inner.step = step;
        inner.playing = true;
    }

    /// Write the next output frames, fanning mono out to every channel.
    /// Marks playback finished at end of clip and emits silence after.
    fn write_frames(&self, data: &mut [f32], channels: usize) {
        let mut inner = self.inner.lock().unwrap();
        for frame in data.chunks_mut(channels.max(1)) {
            let index = inner.position as usize;
            if !inner.playing || index >= inner.samples.len() {
                inner.playing = false;
                frame.fill(0.0);
                continue;
            }
            frame.fill(inner.samples[index]);
            inner.position += inner.step;
        }
    }

    fn progress(&self) -> f32 {
        let inner = self.inner.lock().unwrap();
        if inner.samples.is_empty() {
            0.0
        } else {
            (inner.position / inner.samples.len() as f64).min(1.0) as f32
        }
    }

    fn is_playing(&self) -> bool {
        self.inner.lock().unwrap().playing
    }

    fn halt(&self) {
        self.inner.lock().unwrap().playing = false;
    }
}

/// Plays one clip at a time on an output device.
pub struct Player {
    stream: Option<cpal::Stream>,
    shared: SharedPlayback,
}

impl Player {
    pub fn new() -> Self {
        Self {
            stream: None,
            shared: SharedPlayback::new(),
        }
    }

    /// Start playing `samples` (mono, recorded at `src_rate`) on `device`,
    /// replacing any clip already playing.
    pub fn play(&mut self, device: &cpal::Device, samples: Vec<f32>, src_rate: u32) -> Result<()> {
        self.stop();

        let (config, channels) = output_config(device)?;
        let step = src_rate as f64 / config.sample_rate.0 as f64;
        self.shared.load(samples, step);

        let shared = self.shared.clone();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    shared.write_frames(data, channels);
                },
                |err| error!("playback stream error: {err}"),
                None,
            )
            .context("failed to build playback stream")?;
        stream.play().context("failed to start playback stream")?;

        self.stream = Some(stream);
        Ok(())
    }

    /// Stop and release the output stream.
    pub fn stop(&mut self) {
        self.shared.halt();
        self.stream = None;
    }

    /// True while the clip has frames left to play.
    pub fn is_playing(&self) -> bool {
        self.stream.is_some() && self.shared.is_playing()
    }

    /// Fraction of the clip consumed so far.
    pub fn progress(&self) -> f32 {
        self.shared.progress()
    }
}

impl Default for Player {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes the live microphone to an output device at monitor gain.
pub struct LoopbackMonitor {
    stream: Option<cpal::Stream>,
}

impl LoopbackMonitor {
    pub fn new() -> Self {
        Self { stream: None }
    }

    /// Start draining `input`'s loopback queue to `device`. The caller must
    /// have enabled the queue on the capture side first.
    pub fn start(&mut self, device: &cpal::Device, input: SharedInput) -> Result<()> {
        let (config, channels) = output_config(device)?;

        let mut mono: Vec<f32> = Vec::new();
        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels.max(1);
                    mono.resize(frames, 0.0);
                    input.fill_loopback(&mut mono);
                    for (frame, &sample) in data.chunks_mut(channels.max(1)).zip(&mono) {
                        frame.fill(sample);
                    }
                },
                |err| error!("loopback stream error: {err}"),
                None,
            )
            .context("failed to build loopback stream")?;
        stream.play().context("failed to start loopback stream")?;

        self.stream = Some(stream);
        Ok(())
    }

    pub fn stop(&mut self) {
        self.stream = None;
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Default for LoopbackMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Default f32 output config for `device`, with its channel count.
fn output_config(device: &cpal::Device) -> Result<(cpal::StreamConfig, usize)> {
    let name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_output_config()
        .with_context(|| format!("no supported output config on '{name}'"))?;
    if supported.sample_format() != SampleFormat::F32 {
        bail!(
            "output device '{}' does not offer f32 samples ({:?})",
            name,
            supported.sample_format()
        );
    }

    let channels = supported.channels().max(1);
    let config = cpal::StreamConfig {
        channels,
        sample_rate: supported.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    Ok((config, channels as usize))
}
