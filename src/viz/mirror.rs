//! Mirror overlay sink
//!
//! Compact gauge floating over the bars region, the stand-in for the
//! original's picture-in-picture window: a bordered vertical level bar with
//! green/yellow/red tiers and a percentage readout underneath. Created and
//! torn down on toggle, so every appearance starts with fresh smoother
//! state.

use crossterm::style::Color;

use crate::analysis::estimator;
use crate::analysis::smoother::LevelSmoother;
use crate::audio::SpectralSampler;
use crate::settings::Smoothing;
use crate::terminal::Terminal;

use super::{Rect, RenderSink};

/// Gauge column width in cells
const GAUGE_COLS: i32 = 4;

pub struct MirrorSink {
    snapshot: Vec<u8>,
    volume: LevelSmoother,
}

impl MirrorSink {
    pub fn new(bin_count: usize, smoothing: &Smoothing) -> Self {
        Self {
            snapshot: vec![0; bin_count],
            volume: LevelSmoother::new(smoothing.attack, smoothing.decay),
        }
    }
}

impl RenderSink for MirrorSink {
    fn tick(&mut self, sampler: &SpectralSampler, elapsed_ms: f32, term: &mut Terminal, area: Rect) {
        if area.w < 8 || area.h < 5 {
            return;
        }

        sampler.read_into(&mut self.snapshot);
        let level = estimator::estimate_volume(&self.snapshot);
        let smoothed = self.volume.advance(level, elapsed_ms);

        draw_frame(term, area);

        // Gauge fills bottom-up between the border and the text row
        let gauge_rows = (area.h - 4) as i32;
        let gauge_x = area.x as i32 + (area.w as i32 - GAUGE_COLS) / 2;
        let gauge_bottom = area.y as i32 + 1 + gauge_rows - 1;
        let lit = (smoothed / 100.0 * gauge_rows as f32).round() as i32;

        for row in 0..gauge_rows {
            let (ch, color) = if row < lit {
                ('█', tier_color(row as f32 / gauge_rows as f32))
            } else {
                ('░', Color::DarkGrey)
            };
            for col in 0..GAUGE_COLS {
                term.set(gauge_x + col, gauge_bottom - row, ch, Some(color), false);
            }
        }

        let text = format!("{:.0}%", smoothed);
        let text_x = area.x as i32 + (area.w as i32 - text.len() as i32) / 2;
        term.set_str(text_x, area.bottom() as i32 - 2, &text, Some(Color::White), true);
    }
}

/// Gauge color by height: green base, yellow past 0.6, red at the top.
fn tier_color(height_ratio: f32) -> Color {
    if height_ratio < 0.6 {
        Color::Green
    } else if height_ratio < 0.85 {
        Color::Yellow
    } else {
        Color::Red
    }
}

fn draw_frame(term: &mut Terminal, area: Rect) {
    let (x0, y0) = (area.x as i32, area.y as i32);
    let (x1, y1) = (area.right() as i32 - 1, area.bottom() as i32 - 1);
    let fg = Some(Color::DarkGrey);

    for x in x0..=x1 {
        term.set(x, y0, '─', fg, false);
        term.set(x, y1, '─', fg, false);
    }
    for y in y0..=y1 {
        term.set(x0, y, '│', fg, false);
        term.set(x1, y, '│', fg, false);
    }
    term.set(x0, y0, '┌', fg, false);
    term.set(x1, y0, '┐', fg, false);
    term.set(x0, y1, '└', fg, false);
    term.set(x1, y1, '┘', fg, false);

    // Blank the interior so bars underneath do not bleed through
    for y in y0 + 1..y1 {
        for x in x0 + 1..x1 {
            term.set(x, y, ' ', None, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{SharedInput, SpectralSampler};

    #[test]
    fn tier_colors_follow_gradient_stops() {
        assert_eq!(tier_color(0.0), Color::Green);
        assert_eq!(tier_color(0.59), Color::Green);
        assert_eq!(tier_color(0.6), Color::Yellow);
        assert_eq!(tier_color(0.84), Color::Yellow);
        assert_eq!(tier_color(0.85), Color::Red);
        assert_eq!(tier_color(1.0), Color::Red);
    }

    #[test]
    fn silent_gauge_shows_zero_percent() {
        let sampler = SpectralSampler::new(SharedInput::new(), 48_000);
        let mut sink = MirrorSink::new(sampler.bin_count(), &Smoothing::default());
        let mut term = Terminal::with_size(20, 12);
        let area = Rect {
            x: 2,
            y: 1,
            w: 16,
            h: 10,
        };

        sink.tick(&sampler, 16.67, &mut term, area);

        let text_row: String = (0..20)
            .map(|x| term.cell(x, area.bottom() as i32 - 2).unwrap().ch)
            .collect();
        assert!(text_row.contains("0%"));
        // Border corners in place
        assert_eq!(term.cell(2, 1).unwrap().ch, '┌');
        assert_eq!(term.cell(17, 10).unwrap().ch, '┘');
    }

    #[test]
    fn overlay_blanks_what_is_underneath() {
        let sampler = SpectralSampler::new(SharedInput::new(), 48_000);
        let mut sink = MirrorSink::new(sampler.bin_count(), &Smoothing::default());
        let mut term = Terminal::with_size(20, 12);
        term.set_str(0, 3, "xxxxxxxxxxxxxxxxxxxx", None, false);
        let area = Rect {
            x: 2,
            y: 1,
            w: 16,
            h: 10,
        };

        sink.tick(&sampler, 16.67, &mut term, area);
        // Inside the frame the old content is gone; outside it survives
        assert_ne!(term.cell(4, 3).unwrap().ch, 'x');
        assert_eq!(term.cell(0, 3).unwrap().ch, 'x');
        assert_eq!(term.cell(19, 3).unwrap().ch, 'x');
    }

    #[test]
    fn cramped_areas_draw_nothing() {
        let sampler = SpectralSampler::new(SharedInput::new(), 48_000);
        let mut sink = MirrorSink::new(sampler.bin_count(), &Smoothing::default());
        let mut term = Terminal::with_size(20, 12);
        sink.tick(
            &sampler,
            16.67,
            &mut term,
            Rect {
                x: 0,
                y: 0,
                w: 6,
                h: 3,
            },
        );
        assert_eq!(term.cell(0, 0).unwrap().ch, ' ');
    }
}
