//! Head-stability scoring over a bounded sliding window.
//!
//! Each frame contributes one instantaneous sample derived from how far the
//! head reference point moved since the previous frame; the reported score is
//! the mean of the last [`WINDOW_CAPACITY`] samples. A fresh session's window
//! is seeded entirely with 1.0 so the first few frames are not penalized for
//! having no history.

use crate::detector::Point;
use std::collections::VecDeque;

/// Number of per-frame samples retained; oldest evicted first.
pub const WINDOW_CAPACITY: usize = 12;

/// Normalized displacement at which the instantaneous score reaches zero.
pub const DISPLACEMENT_FALLOFF: f64 = 0.03;

/// A window pre-filled to capacity with 1.0 (assume stable on first contact).
pub fn seeded_window() -> VecDeque<f64> {
    let mut window = VecDeque::with_capacity(WINDOW_CAPACITY);
    window.extend(std::iter::repeat(1.0).take(WINDOW_CAPACITY));
    window
}

/// Instantaneous stability in [0, 1] from frame-to-frame head displacement.
pub fn instantaneous(previous: &Point, current: &Point) -> f64 {
    let displacement = previous.distance(current);
    (1.0 - displacement / DISPLACEMENT_FALLOFF).clamp(0.0, 1.0)
}

/// Push a sample, evicting the oldest when at capacity, and return the mean
/// of the window contents.
pub fn push_and_mean(window: &mut VecDeque<f64>, sample: f64) -> f64 {
    if window.len() >= WINDOW_CAPACITY {
        window.pop_front();
    }
    window.push_back(sample);
    window.iter().sum::<f64>() / window.len() as f64
}
