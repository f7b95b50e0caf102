//! Audio quality feedback panel sink
//!
//! Turns the smoothed signals into the qualitative readout: a volume line
//! and a background-noise line, each with a label, a percentage and a meter
//! bar. Volume runs through the history-weighted smoothing mode so the
//! label holds steady through syllable gaps; noise uses the symmetric rate.

use crossterm::style::Color;

use crate::analysis::estimator;
use crate::analysis::smoother::{LevelSmoother, VolumeHistory};
use crate::audio::SpectralSampler;
use crate::settings::{Smoothing, Thresholds};
use crate::terminal::Terminal;

use super::{Rect, RenderSink};

pub struct PanelSink {
    snapshot: Vec<u8>,
    history: VolumeHistory,
    volume: LevelSmoother,
    noise: LevelSmoother,
    thresholds: Thresholds,
}

impl PanelSink {
    pub fn new(bin_count: usize, smoothing: &Smoothing, thresholds: Thresholds) -> Self {
        Self {
            snapshot: vec![0; bin_count],
            history: VolumeHistory::new(),
            volume: LevelSmoother::new(smoothing.attack, smoothing.decay),
            noise: LevelSmoother::symmetric(smoothing.noise_rate),
            thresholds,
        }
    }

    /// Current smoothed readings, volume then noise.
    pub fn levels(&self) -> (f32, f32) {
        (self.volume.value(), self.noise.value())
    }
}

impl RenderSink for PanelSink {
    fn tick(&mut self, sampler: &SpectralSampler, elapsed_ms: f32, term: &mut Terminal, area: Rect) {
        if area.w < 10 || area.h == 0 {
            return;
        }

        sampler.read_into(&mut self.snapshot);
        let current = estimator::estimate_volume(&self.snapshot);
        self.history.push(current);
        let volume = self.volume.advance(self.history.target(current), elapsed_ms);
        let noise = self
            .noise
            .advance(estimator::estimate_noise(&self.snapshot), elapsed_ms);

        let x = area.x as i32;
        let y = area.y as i32;
        let meter_w = area.w.saturating_sub(2) as i32;

        term.set_str(x, y, "Audio Quality", Some(Color::White), true);

        let volume_text = format!(
            "Volume:           {} ({:.0}%)",
            volume_label(volume, &self.thresholds),
            volume
        );
        term.set_str(x, y + 1, &volume_text, Some(volume_color(volume, &self.thresholds)), false);
        draw_meter(term, x, y + 2, meter_w, volume / 100.0, Color::Blue);

        let noise_text = format!(
            "Background Noise: {} ({:.0}%)",
            noise_label(noise, &self.thresholds),
            noise
        );
        term.set_str(x, y + 4, &noise_text, Some(noise_color(noise, &self.thresholds)), false);
        draw_meter(term, x, y + 5, meter_w, noise / 100.0, Color::Magenta);
    }
}

pub fn volume_label(volume: f32, thresholds: &Thresholds) -> &'static str {
    if volume < thresholds.volume_low {
        "Low"
    } else if volume < thresholds.volume_good {
        "Good"
    } else {
        "High"
    }
}

/// Too-quiet reads as a warning, comfortable as good, too-hot as bad.
pub fn volume_color(volume: f32, thresholds: &Thresholds) -> Color {
    if volume < thresholds.volume_low {
        Color::Yellow
    } else if volume < thresholds.volume_good {
        Color::Green
    } else {
        Color::Red
    }
}

pub fn noise_label(noise: f32, thresholds: &Thresholds) -> &'static str {
    if noise < thresholds.noise_low {
        "Low"
    } else if noise < thresholds.noise_moderate {
        "Moderate"
    } else {
        "High"
    }
}

pub fn noise_color(noise: f32, thresholds: &Thresholds) -> Color {
    if noise < thresholds.noise_low {
        Color::Green
    } else if noise < thresholds.noise_moderate {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn draw_meter(term: &mut Terminal, x: i32, y: i32, width: i32, fraction: f32, color: Color) {
    let filled = (fraction.clamp(0.0, 1.0) * width as f32).round() as i32;
    for col in 0..width {
        let (ch, fg) = if col < filled {
            ('█', color)
        } else {
            ('░', Color::DarkGrey)
        };
        term.set(x + col, y, ch, Some(fg), false);
    }
}
