//! Spectrum bar visualizer sink
//!
//! Draws one column per terminal cell across its region, each column
//! averaging a contiguous slice of snapshot bins, with sub-cell tip
//! characters for smooth motion. The bottom row is an overall level meter
//! fed by this sink's own volume smoother.

use crossterm::style::Color;

use crate::analysis::estimator;
use crate::analysis::smoother::LevelSmoother;
use crate::audio::SpectralSampler;
use crate::settings::Smoothing;
use crate::terminal::Terminal;

use super::{Rect, RenderSink};

/// Partial-height tip characters, shortest first
const TIP_CHARS: [char; 3] = ['▁', '▄', '█'];

pub struct BarsSink {
    /// Snapshot buffer sized to the session's bin count at creation
    snapshot: Vec<u8>,
    volume: LevelSmoother,
}

impl BarsSink {
    pub fn new(bin_count: usize, smoothing: &Smoothing) -> Self {
        Self {
            snapshot: vec![0; bin_count],
            volume: LevelSmoother::new(smoothing.attack, smoothing.decay),
        }
    }
}

impl RenderSink for BarsSink {
    fn tick(&mut self, sampler: &SpectralSampler, elapsed_ms: f32, term: &mut Terminal, area: Rect) {
        if area.w == 0 || area.h < 2 {
            return;
        }

        sampler.read_into(&mut self.snapshot);
        let level = estimator::estimate_volume(&self.snapshot);
        let smoothed = self.volume.advance(level, elapsed_ms);

        let bar_rows = (area.h - 1) as usize;
        let columns = area.w as usize;
        let base_y = (area.y as i32) + bar_rows as i32 - 1;

        for col in 0..columns {
            let magnitude = column_average(&self.snapshot, col, columns);
            let height = magnitude / 255.0 * bar_rows as f32;
            let full = height as usize;
            let frac = height.fract();
            let x = area.x as i32 + col as i32;

            for row in 0..full.min(bar_rows) {
                let (color, bold) = bar_color(row as f32 / bar_rows as f32);
                term.set(x, base_y - row as i32, '█', Some(color), bold);
            }
            if frac > 0.0 && full < bar_rows {
                let tip = TIP_CHARS[((frac * (TIP_CHARS.len() - 1) as f32).round() as usize)
                    .min(TIP_CHARS.len() - 1)];
                let (color, bold) = bar_color(full as f32 / bar_rows as f32);
                term.set(x, base_y - full as i32, tip, Some(color), bold);
            }
        }

        draw_level_meter(term, area, smoothed);
    }
}

/// Average snapshot magnitude for one display column.
fn column_average(snapshot: &[u8], col: usize, columns: usize) -> f32 {
    if snapshot.is_empty() || columns == 0 {
        return 0.0;
    }
    let start = col * snapshot.len() / columns;
    let end = (((col + 1) * snapshot.len()) / columns).max(start + 1).min(snapshot.len());
    if start >= end {
        return 0.0;
    }
    let sum: u32 = snapshot[start..end].iter().map(|&b| b as u32).sum();
    sum as f32 / (end - start) as f32
}

/// Color for a bar cell by its height within the region.
fn bar_color(height_ratio: f32) -> (Color, bool) {
    if height_ratio < 0.5 {
        (Color::DarkGreen, false)
    } else if height_ratio < 0.75 {
        (Color::Green, false)
    } else if height_ratio < 0.9 {
        (Color::Yellow, false)
    } else {
        (Color::Red, true)
    }
}

/// Overall smoothed level on the region's bottom row.
fn draw_level_meter(term: &mut Terminal, area: Rect, smoothed: f32) {
    let y = area.bottom() as i32 - 1;
    let filled = (smoothed / 100.0 * area.w as f32).round() as i32;
    for col in 0..area.w as i32 {
        let (ch, color) = if col < filled {
            ('█', Color::Cyan)
        } else {
            ('·', Color::DarkGrey)
        };
        term.set(area.x as i32 + col, y, ch, Some(color), false);
    }
}
