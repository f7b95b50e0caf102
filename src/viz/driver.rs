//! Cooperative frame driver
//!
//! One scheduler stands in for the per-sink animation-frame chains: every
//! registered sink gets one tick per frame with the elapsed time since its
//! own previous tick. Registration hands back a cancellation handle;
//! canceled sinks leave at the top of the next frame and are never ticked
//! again, so nothing can draw against a torn-down capture session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::audio::SpectralSampler;
use crate::terminal::Terminal;

use super::{Layout, Placement, RenderSink};

/// Cancellation handle for one registered sink.
///
/// Dropping the handle does not cancel the sink; teardown has to be
/// explicit.
pub struct SinkHandle {
    active: Arc<AtomicBool>,
}

impl SinkHandle {
    /// Stop the sink's ticks. It is removed at the top of the next frame.
    pub fn cancel(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }
}

struct Slot {
    sink: Box<dyn RenderSink>,
    place: Placement,
    active: Arc<AtomicBool>,
    last_tick: Option<Instant>,
}

/// Drives all registered sinks, one tick per frame each.
pub struct FrameDriver {
    slots: Vec<Slot>,
}

impl FrameDriver {
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Register a sink at `place`, returning its cancellation handle.
    pub fn spawn(&mut self, sink: Box<dyn RenderSink>, place: Placement) -> SinkHandle {
        let active = Arc::new(AtomicBool::new(true));
        self.slots.push(Slot {
            sink,
            place,
            active: active.clone(),
            last_tick: None,
        });
        SinkHandle { active }
    }

    /// Tick every live sink once, drawing into its region from `layout`.
    pub fn run_frame(&mut self, sampler: &SpectralSampler, term: &mut Terminal, layout: &Layout) {
        // Canceled sinks leave before anything draws this frame
        self.slots.retain(|slot| slot.active.load(Ordering::Relaxed));

        let now = Instant::now();
        for slot in &mut self.slots {
            let elapsed_ms = slot
                .last_tick
                .map(|at| now.duration_since(at).as_secs_f32() * 1000.0)
                .unwrap_or(0.0);
            slot.last_tick = Some(now);
            slot.sink
                .tick(sampler, elapsed_ms, term, layout.rect(slot.place));
        }
    }

    /// Cancel and drop every sink. Must run before the sampled session is
    /// torn down.
    pub fn cancel_all(&mut self) {
        for slot in &self.slots {
            slot.active.store(false, Ordering::Relaxed);
        }
        self.slots.clear();
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }
}

impl Default for FrameDriver {
    fn default() -> Self {
        Self::new()
    }
}
