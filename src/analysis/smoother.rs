//! Temporal smoothing of estimator outputs
//!
//! Raw per-frame estimates jitter too much to display directly. Each render
//! sink owns one smoother per signal and advances it with the elapsed time
//! since that sink's previous tick; sinks never share smoother state, so a
//! slow sink cannot drag another sink's reading around.
//!
//! Volume uses asymmetric rates: a loud onset pulls the displayed level up
//! quickly, silence lets it fall off slowly. Noise uses one symmetric rate.
//! The feedback panel additionally keeps a short history of raw estimates
//! and smooths toward a recency-weighted average, which steadies the target
//! on fast-changing input without blunting the attack.

use std::collections::VecDeque;

/// Per-frame rate applied while the level is rising
pub const VOLUME_ATTACK: f32 = 0.3;
/// Per-frame rate applied while the level is falling
pub const VOLUME_DECAY: f32 = 0.05;
/// Symmetric per-frame rate for the noise signal
pub const NOISE_RATE: f32 = 0.1;
/// Elapsed time treated as one full frame when scaling rates (60 Hz cadence)
pub const REFERENCE_FRAME_MS: f32 = 16.67;
/// Maximum number of raw estimates kept by [`VolumeHistory`]
pub const HISTORY_LEN: usize = 30;

/// Attack/decay smoother over a [0, 100] signal.
pub struct LevelSmoother {
    value: f32,
    attack: f32,
    decay: f32,
}

impl LevelSmoother {
    /// Smoother with distinct attack and decay rates, starting at zero.
    pub fn new(attack: f32, decay: f32) -> Self {
        Self {
            value: 0.0,
            attack,
            decay,
        }
    }

    /// Smoother that rises and falls at the same rate.
    pub fn symmetric(rate: f32) -> Self {
        Self::new(rate, rate)
    }

    /// Advance toward `target` given `elapsed_ms` since this sink's last tick.
    ///
    /// Zero elapsed time leaves the stored value unchanged. Non-finite or
    /// out-of-range targets are clamped away before they can reach the
    /// stored state; the result is always finite and in [0, 100].
    pub fn advance(&mut self, target: f32, elapsed_ms: f32) -> f32 {
        let target = if target.is_finite() {
            target.clamp(0.0, 100.0)
        } else {
            self.value
        };

        let diff = target - self.value;
        let rate = if diff > 0.0 { self.attack } else { self.decay };
        let frames = (elapsed_ms / REFERENCE_FRAME_MS).clamp(0.0, 1.0);

        self.value = (self.value + diff * frames * rate).clamp(0.0, 100.0);
        self.value
    }

    /// Current smoothed value.
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Drop accumulated state. Only meant for sink (re)creation.
    pub fn reset(&mut self) {
        self.value = 0.0;
    }
}

/// Bounded history of raw volume estimates with a recency-weighted average.
pub struct VolumeHistory {
    samples: VecDeque<f32>,
}

impl VolumeHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_LEN),
        }
    }

    /// Record one raw estimate, discarding the oldest beyond the cap.
    pub fn push(&mut self, level: f32) {
        if self.samples.len() == HISTORY_LEN {
            self.samples.pop_front();
        }
        self.samples.push_back(level);
    }

    /// Exponentially weighted average, newest samples weighted heaviest.
    ///
    /// Weight for position `i` (oldest first) is `exp(i/len) / e`. An empty
    /// history reads as silence.
    pub fn weighted_average(&self) -> f32 {
        let len = self.samples.len();
        if len == 0 {
            return 0.0;
        }

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        for (i, &sample) in self.samples.iter().enumerate() {
            let weight = (i as f32 / len as f32).exp() / std::f32::consts::E;
            weighted_sum += sample * weight;
            weight_total += weight;
        }

        if weight_total > 0.0 {
            weighted_sum / weight_total
        } else {
            0.0
        }
    }

    /// Smoothing target for the current raw estimate.
    ///
    /// The average holds the target up through brief dips while the maximum
    /// keeps the attack on the raw signal.
    pub fn target(&self, current: f32) -> f32 {
        current.max(self.weighted_average())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl Default for VolumeHistory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Ticks until the smoother lands within 5 of `target`, one reference
    /// frame of elapsed time per tick.
    fn ticks_to_settle(smoother: &mut LevelSmoother, target: f32) -> usize {
        for tick in 1..1000 {
            smoother.advance(target, REFERENCE_FRAME_MS);
            if (smoother.value() - target).abs() < 5.0 {
                return tick;
            }
        }
        panic!("never settled toward {target}");
    }

    #[test]
    fn attack_is_faster_than_decay() {
        let mut smoother = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        let rise = ticks_to_settle(&mut smoother, 100.0);
        let fall = ticks_to_settle(&mut smoother, 0.0);
        assert!(
            rise < fall,
            "rise took {rise} ticks, fall took {fall} ticks"
        );
    }

    #[test]
    fn zero_elapsed_time_is_identity() {
        let mut smoother = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        smoother.advance(80.0, REFERENCE_FRAME_MS);
        let before = smoother.value();
        assert_eq!(smoother.advance(0.0, 0.0), before);
        assert_eq!(smoother.advance(100.0, 0.0), before);
    }

    #[test]
    fn independent_smoothers_agree() {
        let mut a = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        let mut b = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        let inputs = [
            (90.0, 16.0),
            (20.0, 33.0),
            (55.0, 8.0),
            (0.0, 16.67),
            (100.0, 5.0),
        ];
        for (target, elapsed) in inputs {
            assert_eq!(a.advance(target, elapsed), b.advance(target, elapsed));
        }
    }

    #[test]
    fn bad_targets_never_poison_state() {
        let mut smoother = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        smoother.advance(50.0, REFERENCE_FRAME_MS);
        let held = smoother.value();

        assert_eq!(smoother.advance(f32::NAN, REFERENCE_FRAME_MS), held);
        assert!(smoother.advance(f32::INFINITY, REFERENCE_FRAME_MS).is_finite());
        for _ in 0..100 {
            let value = smoother.advance(1e9, REFERENCE_FRAME_MS);
            assert!(value.is_finite());
            assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn long_frames_cap_at_one_reference_frame() {
        let mut slow = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        let mut fast = LevelSmoother::new(VOLUME_ATTACK, VOLUME_DECAY);
        slow.advance(100.0, REFERENCE_FRAME_MS);
        fast.advance(100.0, 500.0);
        assert_eq!(slow.value(), fast.value());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut smoother = LevelSmoother::symmetric(NOISE_RATE);
        smoother.advance(70.0, REFERENCE_FRAME_MS);
        assert!(smoother.value() > 0.0);
        smoother.reset();
        assert_eq!(smoother.value(), 0.0);
    }

    #[test]
    fn history_is_bounded() {
        let mut history = VolumeHistory::new();
        for i in 0..100 {
            history.push(i as f32);
        }
        assert_eq!(history.len(), HISTORY_LEN);
        // Oldest entries were discarded
        assert!(history.weighted_average() > 70.0);
    }

    #[test]
    fn weighted_average_of_constant_is_constant() {
        let mut history = VolumeHistory::new();
        for _ in 0..HISTORY_LEN {
            history.push(42.0);
        }
        assert!((history.weighted_average() - 42.0).abs() < 1e-3);
    }

    #[test]
    fn weighted_average_favors_recent_samples() {
        let mut history = VolumeHistory::new();
        for i in 0..HISTORY_LEN {
            history.push(i as f32);
        }
        let mean = (0..HISTORY_LEN).sum::<usize>() as f32 / HISTORY_LEN as f32;
        assert!(history.weighted_average() > mean);
    }

    #[test]
    fn target_holds_through_dips() {
        let mut history = VolumeHistory::new();
        for _ in 0..10 {
            history.push(80.0);
        }
        // A momentary dip should not drop the target to the raw value
        assert!(history.target(5.0) > 70.0);
        // A loud onset passes straight through
        assert_eq!(history.target(95.0), 95.0);
    }

    #[test]
    fn empty_history_reads_as_silence() {
        let history = VolumeHistory::new();
        assert_eq!(history.weighted_average(), 0.0);
        assert_eq!(history.target(30.0), 30.0);
    }
}
