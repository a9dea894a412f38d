//! # Scoring Engine
//!
//! Pure computation over per-session state plus one new detector output:
//! gaze scoring, head-stability scoring, exponential emotion smoothing, the
//! vocal state machine, and the composite confidence figure. Nothing in this
//! module touches locks or I/O; handlers call into it while holding the
//! session's entry lock.

pub mod emotion;
pub mod gaze;
pub mod mailbox;
pub mod stability;
pub mod vocal;

use serde::Serialize;
use std::collections::BTreeMap;

/// One frame's worth of derived behavioral signals. Ephemeral; never stored
/// beyond the latest-result mailbox.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSample {
    pub detected: bool,
    pub dominant_emotion: Option<String>,
    pub emotions: Option<BTreeMap<String, f64>>,
    pub gaze_score: f64,
    pub stability_score: f64,
    /// Composite confidence in [0, 100], one decimal.
    #[serde(rename = "confidence_score")]
    pub confidence: f64,
}

impl ScoreSample {
    /// Sample for a frame with no detectable face.
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            dominant_emotion: None,
            emotions: None,
            gaze_score: 0.0,
            stability_score: 0.0,
            confidence: 0.0,
        }
    }
}

/// Composite confidence: equal-weight blend of gaze and stability, reported
/// in [0, 100] rounded to one decimal.
pub fn confidence(gaze_score: f64, stability_score: f64) -> f64 {
    round1(gaze_score * 50.0 + stability_score * 50.0)
}

/// Round to one decimal place for API reporting.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_blend() {
        assert_eq!(confidence(1.0, 1.0), 100.0);
        assert_eq!(confidence(0.0, 0.0), 0.0);
        assert_eq!(confidence(1.0, 0.0), 50.0);
        assert_eq!(confidence(0.5, 0.5), 50.0);
    }

    #[test]
    fn test_confidence_rounding() {
        // 0.333 * 50 + 0.333 * 50 = 33.3
        assert_eq!(confidence(0.333, 0.333), 33.3);
    }
}
