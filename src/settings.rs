use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::analysis::smoother;

#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub smoothing: Smoothing,
    #[serde(default)]
    pub recording: RecordingSettings,
}

/// Label boundaries for the feedback panel. Presentation policy, so users
/// may move them without touching the analysis itself.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Volume below this reads "Low"
    pub volume_low: f32,
    /// Volume below this reads "Good", at or above it "High"
    pub volume_good: f32,
    /// Noise below this reads "Low"
    pub noise_low: f32,
    /// Noise below this reads "Moderate", at or above it "High"
    pub noise_moderate: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            volume_low: 15.0,
            volume_good: 70.0,
            noise_low: 20.0,
            noise_moderate: 50.0,
        }
    }
}

/// Smoother rates, defaulting to the canonical constants.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Smoothing {
    pub attack: f32,
    pub decay: f32,
    pub noise_rate: f32,
}

impl Default for Smoothing {
    fn default() -> Self {
        Self {
            attack: smoother::VOLUME_ATTACK,
            decay: smoother::VOLUME_DECAY,
            noise_rate: smoother::NOISE_RATE,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecordingSettings {
    /// Where WAV clips land; defaults to the user data dir
    pub directory: Option<PathBuf>,
}

impl Settings {
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("micmon")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_canonical_constants() {
        let settings = Settings::default();
        assert_eq!(settings.thresholds.volume_low, 15.0);
        assert_eq!(settings.thresholds.volume_good, 70.0);
        assert_eq!(settings.thresholds.noise_low, 20.0);
        assert_eq!(settings.thresholds.noise_moderate, 50.0);
        assert_eq!(settings.smoothing.attack, smoother::VOLUME_ATTACK);
        assert_eq!(settings.smoothing.decay, smoother::VOLUME_DECAY);
        assert!(settings.recording.directory.is_none());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let settings: Settings = toml::from_str(
            "[thresholds]\nvolume_low = 25.0\n\n[recording]\ndirectory = \"/tmp/clips\"\n",
        )
        .unwrap();
        assert_eq!(settings.thresholds.volume_low, 25.0);
        assert_eq!(settings.thresholds.volume_good, 70.0);
        assert_eq!(
            settings.recording.directory.as_deref(),
            Some(std::path::Path::new("/tmp/clips"))
        );
    }

    #[test]
    fn garbage_config_falls_back_to_defaults() {
        let settings: Settings = toml::from_str("not toml at all ][").unwrap_or_default();
        assert_eq!(settings.thresholds.volume_good, 70.0);
    }
}
