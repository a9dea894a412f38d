//! Mutable per-session analysis state and its update rules.

use crate::analysis::vocal::{AudioAccumulator, VocalStatus};
use crate::analysis::{self, emotion, gaze, stability, ScoreSample};
use crate::detector::{BlobStats, FaceObservation, Point};
use std::collections::{BTreeMap, VecDeque};

/// Composite state for one analysis session.
///
/// The whole struct is mutated as a unit under the owning entry's lock; a
/// partially applied frame or audio update is never observable. The same
/// default is used whether the first touch comes from the frame path or the
/// audio path, so either modality can bootstrap a session the other will
/// later extend.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Smoothed label -> score vector; `None` until the first successful
    /// emotion classification.
    pub emotions: Option<BTreeMap<String, f64>>,

    /// Head reference point from the previous frame, normalized [0,1]².
    pub last_head_position: Point,

    /// Recent instantaneous stability samples, bounded by the window
    /// capacity; oldest evicted first.
    pub stability_history: VecDeque<f64>,

    /// Running speech/silence counters.
    pub audio: AudioAccumulator,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            emotions: None,
            last_head_position: Point::new(0.5, 0.5),
            stability_history: stability::seeded_window(),
            audio: AudioAccumulator::default(),
        }
    }
}

/// Result of folding one audio blob into a session.
#[derive(Debug, Clone, Copy)]
pub struct VocalSample {
    pub fluency: f64,
    pub is_speaking: bool,
    pub status: VocalStatus,
    pub silence_streak_secs: f64,
}

impl SessionState {
    /// Apply one detected frame: gaze, stability, and (when the classifier
    /// produced output) emotion smoothing, as a single composite update.
    ///
    /// `raw_emotions` is `None` when the emotion classifier failed for this
    /// frame; gaze and stability still update; the two sub-signals degrade
    /// independently.
    pub fn apply_frame(
        &mut self,
        observation: &FaceObservation,
        raw_emotions: Option<&BTreeMap<String, f64>>,
    ) -> ScoreSample {
        let gaze_score = gaze::gaze_score(&observation.left_eye, &observation.right_eye);

        let inst = stability::instantaneous(&self.last_head_position, &observation.head);
        let stability_score = stability::push_and_mean(&mut self.stability_history, inst);
        self.last_head_position = observation.head;

        if let Some(raw) = raw_emotions {
            emotion::smooth_into(&mut self.emotions, raw);
        }

        let dominant = self.emotions.as_ref().and_then(emotion::dominant);

        ScoreSample {
            detected: true,
            dominant_emotion: dominant,
            emotions: self.emotions.clone(),
            gaze_score,
            stability_score,
            confidence: analysis::confidence(gaze_score, stability_score),
        }
    }

    /// Apply one audio blob's VAD stats.
    pub fn apply_audio(&mut self, blob: &BlobStats) -> VocalSample {
        let is_speaking = self.audio.apply(blob);
        VocalSample {
            fluency: self.audio.fluency(),
            is_speaking,
            status: self.audio.status(),
            silence_streak_secs: self.audio.streak_seconds(),
        }
    }
}
