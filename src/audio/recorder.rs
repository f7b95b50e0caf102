//! WAV recording of captured clips
//!
//! Writes what the capture session accumulated to mono 32-bit float WAV
//! files with timestamped names, and reads them back for playback.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hound::{SampleFormat, WavSpec, WavWriter};
use log::info;

/// Writes capture-session clips into a recordings directory.
pub struct WavRecorder {
    spec: WavSpec,
    recordings_dir: PathBuf,
}

impl WavRecorder {
    pub fn new(sample_rate: u32, recordings_dir: PathBuf) -> Self {
        Self {
            spec: WavSpec {
                channels: 1,
                sample_rate,
                bits_per_sample: 32,
                sample_format: SampleFormat::Float,
            },
            recordings_dir,
        }
    }

    /// Default recordings directory under the user data dir.
    pub fn default_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("micmon")
            .join("recordings")
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    /// Write `samples` to a new timestamped WAV file, returning its path.
    pub fn save(&self, samples: &[f32]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.recordings_dir).with_context(|| {
            format!(
                "failed to create recordings directory {}",
                self.recordings_dir.display()
            )
        })?;

        let name = format!(
            "recording_{}.wav",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.recordings_dir.join(name);

        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut writer = WavWriter::new(BufWriter::new(file), self.spec)
            .context("failed to create WAV writer")?;
        for &sample in samples {
            writer.write_sample(sample).context("failed to write sample")?;
        }
        writer.finalize().context("failed to finalize WAV file")?;

        info!("saved {} samples to {}", samples.len(), path.display());
        Ok(path)
    }

    /// Read a WAV file into mono f32 samples, returning the sample rate.
    ///
    /// Integer formats are rescaled to [-1, 1]; multi-channel files take
    /// the first channel.
    pub fn load(path: &Path) -> Result<(Vec<f32>, u32)> {
        let reader = hound::WavReader::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;

        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .context("failed to read samples")?,
            SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<_, _>>()
                    .context("failed to read samples")?
            }
        };

        let mono: Vec<f32> = samples.into_iter().step_by(channels).collect();
        Ok((mono, spec.sample_rate))
    }

    /// Duration of a clip in seconds.
    pub fn duration_seconds(sample_count: usize, sample_rate: u32) -> f64 {
        sample_count as f64 / sample_rate.max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_recordings_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("micmon-test-{}-{}", tag, std::process::id()))
    }

    #[test]
    fn duration_follows_sample_rate() {
        assert_eq!(WavRecorder::duration_seconds(48_000, 48_000), 1.0);
        assert_eq!(WavRecorder::duration_seconds(24_000, 48_000), 0.5);
        assert_eq!(WavRecorder::duration_seconds(0, 48_000), 0.0);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = temp_recordings_dir("roundtrip");
        let recorder = WavRecorder::new(48_000, dir.clone());

        let samples: Vec<f32> = (0..1000).map(|i| (i as f32 / 1000.0) - 0.5).collect();
        let path = recorder.save(&samples).expect("save failed");

        let (loaded, rate) = WavRecorder::load(&path).expect("load failed");
        assert_eq!(rate, 48_000);
        assert_eq!(loaded.len(), samples.len());
        for (a, b) in loaded.iter().zip(&samples) {
            assert!((a - b).abs() < 1e-6);
        }

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let missing = temp_recordings_dir("missing").join("nope.wav");
        assert!(WavRecorder::load(&missing).is_err());
    }
}
