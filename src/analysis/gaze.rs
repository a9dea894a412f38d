//! Gaze scoring from iris position within the eye corners.
//!
//! The iris ratio measures where the iris sits horizontally between the two
//! eye corners: 0.0 at the left corner, 1.0 at the right, 0.5 dead center.
//! The score decays linearly as the averaged ratio drifts from center and
//! bottoms out at [`GAZE_FALLOFF`] distance; a subject looking hard to one
//! side scores 0.

use crate::detector::EyeLandmarks;

/// Distance from center ratio at which the gaze score reaches zero.
pub const GAZE_FALLOFF: f64 = 0.15;

/// Horizontal iris position within one eye as a ratio in [0, 1].
///
/// A degenerate eye (zero corner-to-corner width) reports 0.5, i.e. centered,
/// rather than dividing by zero.
pub fn eye_ratio(eye: &EyeLandmarks) -> f64 {
    let width = eye.right_corner.x - eye.left_corner.x;
    if width == 0.0 {
        return 0.5;
    }
    (eye.iris.x - eye.left_corner.x) / width
}

/// Gaze score in [0, 1] from both eyes' landmarks.
pub fn gaze_score(left_eye: &EyeLandmarks, right_eye: &EyeLandmarks) -> f64 {
    let avg_ratio = (eye_ratio(left_eye) + eye_ratio(right_eye)) / 2.0;
    let distance = (avg_ratio - 0.5).abs();
    (1.0 - distance / GAZE_FALLOFF).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::Point;

    fn eye(left_x: f64, right_x: f64, iris_x: f64) -> EyeLandmarks {
        EyeLandmarks {
            iris: Point::new(iris_x, 0.5),
            left_corner: Point::new(left_x, 0.5),
            right_corner: Point::new(right_x, 0.5),
        }
    }

    #[test]
    fn test_centered_iris_scores_one() {
        let left = eye(0.30, 0.40, 0.35);
        let right = eye(0.60, 0.70, 0.65);
        assert_eq!(gaze_score(&left, &right), 1.0);
    }

    #[test]
    fn test_score_decreases_with_distance_from_center() {
        // Ratios 0.5, 0.6, 0.7; monotonically further off-center.
        let centered = gaze_score(&eye(0.0, 1.0, 0.5), &eye(0.0, 1.0, 0.5));
        let slight = gaze_score(&eye(0.0, 1.0, 0.6), &eye(0.0, 1.0, 0.6));
        let strong = gaze_score(&eye(0.0, 1.0, 0.7), &eye(0.0, 1.0, 0.7));
        assert!(centered > slight);
        assert!(slight > strong);
    }

    #[test]
    fn test_score_zero_at_falloff_distance() {
        // Ratio 0.65 is exactly 0.15 from center.
        let at_limit = gaze_score(&eye(0.0, 1.0, 0.65), &eye(0.0, 1.0, 0.65));
        assert_eq!(at_limit, 0.0);
        // Beyond the limit stays clamped at zero.
        let beyond = gaze_score(&eye(0.0, 1.0, 0.9), &eye(0.0, 1.0, 0.9));
        assert_eq!(beyond, 0.0);
    }

    #[test]
    fn test_zero_width_eye_treated_as_centered() {
        let degenerate = eye(0.4, 0.4, 0.4);
        assert_eq!(eye_ratio(&degenerate), 0.5);
        let normal = eye(0.0, 1.0, 0.5);
        assert_eq!(gaze_score(&degenerate, &normal), 1.0);
    }

    #[test]
    fn test_eyes_average() {
        // One eye centered, one at ratio 0.6; average ratio 0.55.
        let a = eye(0.0, 1.0, 0.5);
        let b = eye(0.0, 1.0, 0.6);
        let expected = 1.0 - 0.05 / GAZE_FALLOFF;
        assert!((gaze_score(&a, &b) - expected).abs() < 1e-12);
    }
}
