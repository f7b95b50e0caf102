//! Volume and noise estimation from a frequency-domain snapshot
//!
//! Pure functions: one snapshot of per-bin byte magnitudes in, one scalar in
//! [0, 100] out. No state, no allocation, no failure modes. Every sink runs
//! its readings through these so bars, panel, and mirror agree on what the
//! microphone is doing.
//!
//! # Algorithm
//! Volume restricts the snapshot to the speech sub-band (roughly 300-3400 Hz
//! for a 2048-sample transform), blends RMS with peak, log-compresses into a
//! -60..0 dB window and applies a square-root perceptual curve. Noise reads
//! the high sub-band with plain RMS and a power curve.

use std::ops::Range;

/// Start of the speech sub-band as a fraction of the bin count
const SPEECH_BAND_START: f32 = 0.1;
/// End (exclusive) of the speech sub-band as a fraction of the bin count
const SPEECH_BAND_END: f32 = 0.4;
/// Start of the high-frequency noise sub-band as a fraction of the bin count
const NOISE_BAND_START: f32 = 0.7;

/// RMS contribution to the blended level
const RMS_WEIGHT: f32 = 0.7;
/// Peak contribution to the blended level
const PEAK_WEIGHT: f32 = 0.3;

/// Floor added before taking the logarithm, keeps log10 away from zero
const LOG_FLOOR: f32 = 1e-4;
/// Width of the dB window mapped onto [0, 1] (-60 dB up to 0 dB)
const DB_RANGE: f32 = 60.0;
/// Exponent of the noise level curve
const NOISE_CURVE: f32 = 0.7;

/// Speech sub-band bin range for a snapshot of `len` bins.
///
/// Indices truncate toward zero, so 1024 bins give 102..409.
pub fn speech_band(len: usize) -> Range<usize> {
    let start = (len as f32 * SPEECH_BAND_START) as usize;
    let end = (len as f32 * SPEECH_BAND_END) as usize;
    start..end.max(start)
}

/// High-frequency sub-band bin range for a snapshot of `len` bins.
pub fn noise_band(len: usize) -> Range<usize> {
    let start = (len as f32 * NOISE_BAND_START) as usize;
    start..len.max(start)
}

/// RMS of a slice of byte magnitudes. Empty slices read as silence.
fn band_rms(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = bins.iter().map(|&b| (b as f32) * (b as f32)).sum();
    (sum_squares / bins.len() as f32).sqrt()
}

/// Maximum of a slice of byte magnitudes. Empty slices read as silence.
fn band_peak(bins: &[u8]) -> f32 {
    bins.iter().copied().max().unwrap_or(0) as f32
}

/// Estimate the perceived input volume from one frequency snapshot.
///
/// Returns a finite value in [0, 100]. A silent snapshot returns 0, a
/// saturated one lands at the clamp ceiling of 100.
pub fn estimate_volume(bins: &[u8]) -> f32 {
    let band = speech_band(bins.len());
    let rms = band_rms(&bins[band.clone()]);
    let peak = band_peak(&bins[band]);

    let combined = rms * RMS_WEIGHT + peak * PEAK_WEIGHT;
    let normalized = combined / 255.0 + LOG_FLOOR;
    let db = 20.0 * normalized.log10();

    // Map -60..0 dB linearly onto [0, 1], then lift quiet levels with a
    // square-root curve so the meter tracks perceived loudness.
    let scaled = ((db + DB_RANGE) / DB_RANGE).clamp(0.0, 1.0);
    (scaled.sqrt() * 100.0).clamp(0.0, 100.0)
}

/// Estimate the background-noise level from one frequency snapshot.
///
/// Reads only the high sub-band; sustained broadband hiss shows up here
/// while speech mostly does not. Returns a finite value in [0, 100].
pub fn estimate_noise(bins: &[u8]) -> f32 {
    let rms = band_rms(&bins[noise_band(bins.len())]);
    ((rms / 255.0).powf(NOISE_CURVE) * 100.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(len: usize, value: u8) -> Vec<u8> {
        vec![value; len]
    }

    #[test]
    fn band_indices_truncate() {
        assert_eq!(speech_band(1024), 102..409);
        assert_eq!(noise_band(1024), 716..1024);
        // Smallest snapshot with both bands non-empty
        assert_eq!(speech_band(3), 0..1);
        assert_eq!(noise_band(3), 2..3);
    }

    #[test]
    fn silence_reads_zero() {
        let bins = uniform(1024, 0);
        assert_eq!(estimate_volume(&bins), 0.0);
        assert_eq!(estimate_noise(&bins), 0.0);
    }

    #[test]
    fn saturation_reads_full_scale() {
        let bins = uniform(1024, 255);
        assert!(estimate_volume(&bins) > 99.0);
        assert!((estimate_noise(&bins) - 100.0).abs() < 0.01);
    }

    #[test]
    fn outputs_stay_in_range_and_finite() {
        for len in [0usize, 1, 2, 3, 16, 512, 1024, 4096] {
            for value in [0u8, 1, 17, 128, 254, 255] {
                let bins = uniform(len, value);
                for estimate in [estimate_volume(&bins), estimate_noise(&bins)] {
                    assert!(estimate.is_finite(), "len={len} value={value}");
                    assert!((0.0..=100.0).contains(&estimate), "len={len} value={value}");
                }
            }
        }
    }

    #[test]
    fn empty_sub_band_is_silent() {
        // Two bins leave the speech band empty (0..0)
        assert!(speech_band(2).is_empty());
        assert_eq!(estimate_volume(&uniform(2, 200)), 0.0);
    }

    #[test]
    fn volume_monotone_under_uniform_gain() {
        let mut previous = 0.0f32;
        for value in (0u8..=255).step_by(5) {
            let volume = estimate_volume(&uniform(1024, value));
            assert!(
                volume >= previous,
                "volume dropped from {previous} to {volume} at magnitude {value}"
            );
            previous = volume;
        }
    }

    #[test]
    fn speech_band_tone_matches_formula() {
        // Speech band fully driven at 200, everything else silent:
        // rms = peak = 200, combined = 200, db ~= -2.11,
        // scaled ~= 0.965, volume ~= 98.2.
        let mut bins = vec![0u8; 1024];
        for bin in &mut bins[102..409] {
            *bin = 200;
        }
        let volume = estimate_volume(&bins);
        assert!((volume - 98.2).abs() < 1.0, "got {volume}");
    }

    #[test]
    fn noise_ignores_speech_band() {
        let mut bins = vec![0u8; 1024];
        for bin in &mut bins[102..409] {
            *bin = 255;
        }
        assert_eq!(estimate_noise(&bins), 0.0);

        let mut hiss = vec![0u8; 1024];
        for bin in &mut hiss[716..] {
            *bin = 60;
        }
        // (60/255)^0.7 * 100
        let expected = (60.0f32 / 255.0).powf(0.7) * 100.0;
        assert!((estimate_noise(&hiss) - expected).abs() < 0.01);
    }
}
