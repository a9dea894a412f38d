//! # Detector Collaborator Contracts
//!
//! The backend does not run face detection, emotion classification, or voice
//! activity detection itself. Those are external collaborators reached through
//! the traits in this module. Implementations are expected to be expensive
//! (model inference) and are always invoked off the request path that holds
//! session locks.
//!
//! ## Contract Notes:
//! - All landmark coordinates are normalized to [0, 1] relative to the frame.
//! - A [`VisualDetector`] returning `Ok(None)` means "no face in frame" and is
//!   a normal, frequent outcome; not an error.
//! - A [`VoiceActivityDetector`] is handed the decoded compressed-audio blob
//!   as-is; PCM conversion is the implementation's responsibility.
//! - Calls carry an implicit timeout enforced by the caller; implementations
//!   should not block indefinitely on their own.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Normalized 2D point in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Iris and eye-corner landmarks for a single eye.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EyeLandmarks {
    pub iris: Point,
    pub left_corner: Point,
    pub right_corner: Point,
}

/// One detected face: the head reference point plus per-eye landmarks.
///
/// The head point is whatever stable reference the backend provides (nose tip
/// for mediapipe); stability scoring only cares that it is consistent between
/// frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceObservation {
    pub head: Point,
    pub left_eye: EyeLandmarks,
    pub right_eye: EyeLandmarks,
}

/// Speech/silence statistics for one audio blob.
///
/// A blob with zero detected speech reports `trailing_silence_ms ==
/// duration_ms`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BlobStats {
    pub speech_ms: u64,
    pub silence_ms: u64,
    pub trailing_silence_ms: u64,
    pub duration_ms: u64,
}

/// Errors a detector call can produce.
#[derive(Debug, Clone)]
pub enum DetectorError {
    /// No backend registered for this detector kind. Misconfiguration, not a
    /// per-frame problem.
    Unavailable,
    /// The call exceeded the collaborator timeout.
    Timeout,
    /// The backend ran but failed on this input.
    Failed(String),
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::Unavailable => write!(f, "detector backend not initialized"),
            DetectorError::Timeout => write!(f, "detector call timed out"),
            DetectorError::Failed(msg) => write!(f, "detector failed: {}", msg),
        }
    }
}

impl std::error::Error for DetectorError {}

/// Frame bytes to face landmarks.
pub trait VisualDetector: Send + Sync {
    /// Identifier of the underlying backend, surfaced on the status endpoint.
    fn backend(&self) -> &str;

    /// Detect the most prominent face in the frame, if any.
    fn detect(&self, image: &[u8]) -> Result<Option<FaceObservation>, DetectorError>;
}

/// Frame bytes to raw per-label emotion probabilities (0..100).
pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, image: &[u8]) -> Result<BTreeMap<String, f64>, DetectorError>;
}

/// Compressed audio blob to speech/silence intervals.
pub trait VoiceActivityDetector: Send + Sync {
    fn analyze(&self, audio: &[u8]) -> Result<BlobStats, DetectorError>;
}
