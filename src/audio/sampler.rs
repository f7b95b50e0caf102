//! Spectral sampler: the shared frequency-domain analysis node
//!
//! Wraps FFT analysis of the live input ring into the snapshot interface the
//! render sinks consume. One sampler exists per capture session; every sink
//! reads it through `bin_count()`/`read_into()` and nothing else, so no sink
//! can reconfigure the transform underneath the others.
//!
//! # Algorithm
//! A fixed 2048-sample window is pulled from the ring, Hann-windowed and run
//! through the FFT. Per-bin magnitudes are exponentially smoothed across
//! refreshes (the node's own time smoothing, separate from the per-sink
//! level smoothers) and quantized to bytes on a -100..-30 dB scale.
//!
//! A refresh throttle keeps the analysis to one pass per frame even with
//! several sinks ticking: readers inside the throttle window observe the
//! same magnitudes.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use log::warn;
use spectrum_analyzer::scaling::divide_by_N;
use spectrum_analyzer::windows::hann_window;
use spectrum_analyzer::{samples_fft_to_spectrum, FrequencyLimit};

use super::session::SharedInput;

/// Transform size in samples. Fixed for the lifetime of a session; yields
/// 1024 frequency bins.
pub const FFT_SIZE: usize = 2048;

/// Exponential smoothing factor applied to magnitudes across refreshes
const TIME_SMOOTHING: f32 = 0.8;
/// Magnitude mapped to byte 0
const MIN_DB: f32 = -100.0;
/// Magnitude mapped to byte 255
const MAX_DB: f32 = -30.0;
/// Minimum time between analysis passes
const REFRESH_INTERVAL: Duration = Duration::from_millis(8);

/// Shared, read-only view of the live input spectrum.
pub struct SpectralSampler {
    input: SharedInput,
    sample_rate: u32,
    inner: Mutex<SamplerInner>,
}

struct SamplerInner {
    /// Time-smoothed linear magnitudes, one per bin
    magnitudes: Vec<f32>,
    /// Scratch buffer for the windowed sample frame
    frame: Vec<f32>,
    last_refresh: Option<Instant>,
}

impl SpectralSampler {
    /// Build a sampler over `input`. The bin count is discovered from one
    /// silent transform and never changes afterwards.
    pub fn new(input: SharedInput, sample_rate: u32) -> Self {
        let bins = transform(&vec![0.0; FFT_SIZE], sample_rate).len();
        Self {
            input,
            sample_rate,
            inner: Mutex::new(SamplerInner {
                magnitudes: vec![0.0; bins],
                frame: vec![0.0; FFT_SIZE],
                last_refresh: None,
            }),
        }
    }

    /// Number of frequency bins per snapshot. Fixed for the session.
    pub fn bin_count(&self) -> usize {
        self.inner.lock().unwrap().magnitudes.len()
    }

    /// Fill `out` with the current per-bin byte magnitudes.
    ///
    /// Runs an analysis pass if the cached one is stale; callers within the
    /// same frame see identical data. `out` should be `bin_count()` long;
    /// excess bins are left untouched.
    pub fn read_into(&self, out: &mut [u8]) {
        let mut inner = self.inner.lock().unwrap();

        let stale = inner
            .last_refresh
            .map_or(true, |at| at.elapsed() >= REFRESH_INTERVAL);
        if stale {
            self.refresh(&mut inner);
            inner.last_refresh = Some(Instant::now());
        }

        for (byte, &magnitude) in out.iter_mut().zip(inner.magnitudes.iter()) {
            *byte = quantize(magnitude);
        }
    }

    /// One analysis pass: pull the latest frame, transform, fold the new
    /// magnitudes into the smoothed ones.
    fn refresh(&self, inner: &mut SamplerInner) {
        let mut frame = std::mem::take(&mut inner.frame);
        self.input.copy_ring(&mut frame);
        let spectrum = transform(&frame, self.sample_rate);
        inner.frame = frame;

        if spectrum.len() != inner.magnitudes.len() {
            // Transform size is fixed, so this cannot happen mid-session
            warn!(
                "spectrum length changed from {} to {}",
                inner.magnitudes.len(),
                spectrum.len()
            );
            return;
        }

        for (smoothed, new) in inner.magnitudes.iter_mut().zip(spectrum) {
            *smoothed = *smoothed * TIME_SMOOTHING + new * (1.0 - TIME_SMOOTHING);
        }
    }
}

/// Window and transform one frame, returning linear per-bin magnitudes.
fn transform(frame: &[f32], sample_rate: u32) -> Vec<f32> {
    let windowed = hann_window(frame);
    match samples_fft_to_spectrum(
        &windowed,
        sample_rate,
        FrequencyLimit::All,
        Some(&divide_by_N),
    ) {
        Ok(spectrum) => spectrum.data().iter().map(|(_, value)| value.val()).collect(),
        Err(err) => {
            warn!("spectrum analysis failed: {err:?}");
            vec![0.0; FFT_SIZE / 2]
        }
    }
}

/// Map a linear magnitude onto the 0-255 byte scale used by snapshots.
fn quantize(magnitude: f32) -> u8 {
    let db = 20.0 * magnitude.max(1e-10).log10();
    let scaled = ((db - MIN_DB) / (MAX_DB - MIN_DB)).clamp(0.0, 1.0);
    (scaled * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantize_clamps_to_byte_range() {
        // Silence bottoms out
        assert_eq!(quantize(0.0), 0);
        // At or above -30 dB saturates
        assert_eq!(quantize(10f32.powf(MAX_DB / 20.0)), 255);
        assert_eq!(quantize(1.0), 255);
        // Middle of the window lands mid-scale
        let mid = quantize(10f32.powf(-65.0 / 20.0));
        assert!((120..=135).contains(&mid), "got {mid}");
    }

    #[test]
    fn quantize_is_monotone() {
        let mut previous = 0u8;
        for exponent in -120..0 {
            let byte = quantize(10f32.powf(exponent as f32 / 20.0));
            assert!(byte >= previous);
            previous = byte;
        }
    }

    #[test]
    fn bin_count_is_fixed_per_session() {
        let sampler = SpectralSampler::new(SharedInput::new(), 48_000);
        let bins = sampler.bin_count();
        // Half the transform size, give or take the library's endpoint bins
        assert!(
            (FFT_SIZE / 2 - 1..=FFT_SIZE / 2 + 1).contains(&bins),
            "got {bins} bins"
        );

        let mut snapshot = vec![0u8; bins];
        sampler.read_into(&mut snapshot);
        assert_eq!(sampler.bin_count(), bins);
    }

    #[test]
    fn silent_input_yields_silent_snapshot() {
        let sampler = SpectralSampler::new(SharedInput::new(), 48_000);
        let mut snapshot = vec![255u8; sampler.bin_count()];
        sampler.read_into(&mut snapshot);
        assert!(snapshot.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_concentrates_energy_near_its_bin() {
        let input = SharedInput::new();
        let sample_rate = 48_000u32;
        let tone_hz = 1_000.0f32;
        let samples: Vec<f32> = (0..FFT_SIZE)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (std::f32::consts::TAU * tone_hz * t).sin()
            })
            .collect();
        input.push_samples(&samples, 1);

        let sampler = SpectralSampler::new(input, sample_rate);
        let mut snapshot = vec![0u8; sampler.bin_count()];
        // Several reads so the time smoothing converges on the tone
        for _ in 0..12 {
            sampler.read_into(&mut snapshot);
            std::thread::sleep(Duration::from_millis(9));
        }

        let bin_width = sample_rate as f32 / FFT_SIZE as f32;
        let tone_bin = (tone_hz / bin_width).round() as usize;
        let far_bin = tone_bin + 200;
        assert!(
            snapshot[tone_bin] > snapshot[far_bin],
            "tone bin {} <= far bin {}",
            snapshot[tone_bin],
            snapshot[far_bin]
        );
        assert!(snapshot[tone_bin] > 0);
    }
}
