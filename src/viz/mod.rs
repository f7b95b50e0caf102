//! Render sinks and their shared contract
//!
//! Each sink consumes the analysis pipeline independently: per tick it pulls
//! a snapshot from the shared sampler, runs the estimators, advances its own
//! private smoother with its own elapsed time, and draws into its region.
//! Sinks never share smoother state, so two sinks fed the same snapshot may
//! disagree by a hair; that is accepted, not a synchronization bug.

pub mod bars;
pub mod driver;
pub mod mirror;
pub mod monitor;
pub mod panel;

use crate::audio::SpectralSampler;
use crate::terminal::Terminal;

/// Rows reserved for the feedback panel
const PANEL_ROWS: u16 = 6;
/// Mirror overlay dimensions
const OVERLAY_COLS: u16 = 16;
const OVERLAY_ROWS: u16 = 10;

/// Screen region a sink draws into
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

impl Rect {
    /// First column right of the region
    pub fn right(&self) -> u16 {
        self.x + self.w
    }

    /// First row below the region
    pub fn bottom(&self) -> u16 {
        self.y + self.h
    }
}

/// Where a sink is placed on screen
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    Bars,
    Panel,
    Overlay,
}

/// Per-frame screen split: bars on top, panel below, overlay floating in
/// the bars region's top-right corner.
pub struct Layout {
    pub bars: Rect,
    pub panel: Rect,
    pub overlay: Rect,
}

impl Layout {
    pub fn compute(width: u16, height: u16, header_rows: u16, footer_rows: u16) -> Self {
        let content_top = header_rows.min(height);
        let content_bottom = height.saturating_sub(footer_rows).max(content_top);
        let content_h = content_bottom - content_top;

        let panel_h = PANEL_ROWS.min(content_h);
        let bars_h = content_h - panel_h;

        let bars = Rect {
            x: 0,
            y: content_top,
            w: width,
            h: bars_h,
        };
        let panel = Rect {
            x: 0,
            y: content_top + bars_h,
            w: width,
            h: panel_h,
        };

        let overlay_w = OVERLAY_COLS.min(width);
        let overlay = Rect {
            x: width.saturating_sub(overlay_w),
            y: content_top,
            w: overlay_w,
            h: OVERLAY_ROWS.min(bars_h),
        };

        Self {
            bars,
            panel,
            overlay,
        }
    }

    pub fn rect(&self, place: Placement) -> Rect {
        match place {
            Placement::Bars => self.bars,
            Placement::Panel => self.panel,
            Placement::Overlay => self.overlay,
        }
    }
}

/// One independent consumer of the analysis pipeline.
///
/// `elapsed_ms` is the time since this sink's own previous tick; the first
/// tick after creation sees zero, leaving smoother state untouched.
pub trait RenderSink {
    fn tick(&mut self, sampler: &SpectralSampler, elapsed_ms: f32, term: &mut Terminal, area: Rect);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_regions_tile_the_content_area() {
        let layout = Layout::compute(80, 24, 2, 1);
        assert_eq!(layout.bars.y, 2);
        assert_eq!(layout.panel.y, layout.bars.bottom());
        assert_eq!(layout.panel.h, PANEL_ROWS);
        assert_eq!(layout.panel.bottom(), 23);
        assert_eq!(layout.bars.w, 80);
    }

    #[test]
    fn overlay_sits_in_the_top_right_of_the_bars_region() {
        let layout = Layout::compute(80, 24, 2, 1);
        assert_eq!(layout.overlay.right(), 80);
        assert_eq!(layout.overlay.y, layout.bars.y);
        assert!(layout.overlay.h <= layout.bars.h);
    }

    #[test]
    fn tiny_terminals_do_not_underflow() {
        for (w, h) in [(0, 0), (1, 1), (5, 2), (80, 3)] {
            let layout = Layout::compute(w, h, 2, 1);
            assert!(layout.bars.bottom() <= h.max(2));
            assert!(layout.panel.h <= h);
        }
    }
}
