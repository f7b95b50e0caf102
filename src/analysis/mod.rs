//! Real-time analysis pipeline shared by every render sink
//!
//! Snapshot in, smoothed 0-100 signals out: [`estimator`] holds the pure
//! per-snapshot math, [`smoother`] the per-sink temporal state.

pub mod estimator;
pub mod smoother;
