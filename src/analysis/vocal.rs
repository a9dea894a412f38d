//! Vocal state machine: speech/silence accumulation and fluency scoring.
//!
//! Each incoming audio blob's VAD stats are folded into the session's running
//! accumulator. The silence streak tracks the most recent unbroken run of
//! non-speech audio: a blob with meaningful speech resets the streak to that
//! blob's trailing silence (a speaking blob can still end in silence), while a
//! mostly-silent blob extends the streak by its silence.

use crate::detector::BlobStats;
use serde::{Deserialize, Serialize};

/// Minimum speech in a blob for it to count as "speaking".
pub const SPEECH_THRESHOLD_MS: u64 = 100;

/// Discrete classification of the current silence streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocalStatus {
    Fluent,
    Thinking,
    Stalling,
    Freeze,
}

impl VocalStatus {
    /// Classify a silence streak. Boundaries are exact and non-overlapping:
    /// `>10000` freeze, `(5000, 10000]` stalling, `(2000, 5000]` thinking,
    /// `<=2000` fluent.
    pub fn from_streak_ms(streak_ms: u64) -> Self {
        if streak_ms > 10_000 {
            VocalStatus::Freeze
        } else if streak_ms > 5_000 {
            VocalStatus::Stalling
        } else if streak_ms > 2_000 {
            VocalStatus::Thinking
        } else {
            VocalStatus::Fluent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VocalStatus::Fluent => "fluent",
            VocalStatus::Thinking => "thinking",
            VocalStatus::Stalling => "stalling",
            VocalStatus::Freeze => "freeze",
        }
    }
}

/// Cumulative speech/silence counters for one session.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AudioAccumulator {
    pub speech_ms: u64,
    pub silence_ms: u64,
    pub current_silence_streak_ms: u64,
}

impl AudioAccumulator {
    /// Fold one blob's stats into the running totals. Returns whether the
    /// blob counted as speaking.
    pub fn apply(&mut self, blob: &BlobStats) -> bool {
        self.speech_ms += blob.speech_ms;
        self.silence_ms += blob.silence_ms;

        let speaking = blob.speech_ms > SPEECH_THRESHOLD_MS;
        if speaking {
            self.current_silence_streak_ms = blob.trailing_silence_ms;
        } else {
            self.current_silence_streak_ms += blob.silence_ms;
        }
        speaking
    }

    /// Percentage of session audio that was speech, in [0, 100]. With no data
    /// yet this defaults to 100; an optimistic default, not an error.
    pub fn fluency(&self) -> f64 {
        let total = self.speech_ms + self.silence_ms;
        if total == 0 {
            return 100.0;
        }
        self.speech_ms as f64 / total as f64 * 100.0
    }

    pub fn status(&self) -> VocalStatus {
        VocalStatus::from_streak_ms(self.current_silence_streak_ms)
    }

    /// Current streak in seconds, one decimal, for reporting.
    pub fn streak_seconds(&self) -> f64 {
        super::round1(self.current_silence_streak_ms as f64 / 1000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(speech_ms: u64, silence_ms: u64, trailing_silence_ms: u64) -> BlobStats {
        BlobStats {
            speech_ms,
            silence_ms,
            trailing_silence_ms,
            duration_ms: speech_ms + silence_ms,
        }
    }

    #[test]
    fn test_status_boundaries() {
        assert_eq!(VocalStatus::from_streak_ms(2000), VocalStatus::Fluent);
        assert_eq!(VocalStatus::from_streak_ms(2001), VocalStatus::Thinking);
        assert_eq!(VocalStatus::from_streak_ms(5000), VocalStatus::Thinking);
        assert_eq!(VocalStatus::from_streak_ms(5001), VocalStatus::Stalling);
        assert_eq!(VocalStatus::from_streak_ms(10_000), VocalStatus::Stalling);
        assert_eq!(VocalStatus::from_streak_ms(10_001), VocalStatus::Freeze);
    }

    #[test]
    fn test_speaking_blob_resets_streak_to_trailing_silence() {
        let mut acc = AudioAccumulator {
            speech_ms: 0,
            silence_ms: 0,
            current_silence_streak_ms: 9000,
        };
        let speaking = acc.apply(&blob(500, 300, 300));
        assert!(speaking);
        assert_eq!(acc.current_silence_streak_ms, 300);
    }

    #[test]
    fn test_silent_blobs_accumulate_streak() {
        let mut acc = AudioAccumulator::default();
        assert!(!acc.apply(&blob(0, 1500, 1500)));
        assert!(!acc.apply(&blob(50, 1450, 1500)));
        assert_eq!(acc.current_silence_streak_ms, 2950);
        assert_eq!(acc.status(), VocalStatus::Thinking);
    }

    #[test]
    fn test_totals_accumulate_across_blobs() {
        let mut acc = AudioAccumulator::default();
        acc.apply(&blob(600, 400, 100));
        acc.apply(&blob(200, 800, 800));
        assert_eq!(acc.speech_ms, 800);
        assert_eq!(acc.silence_ms, 1200);
        assert_eq!(acc.fluency(), 40.0);
    }

    #[test]
    fn test_fluency_defaults_to_100_with_no_data() {
        let acc = AudioAccumulator::default();
        assert_eq!(acc.fluency(), 100.0);
    }

    #[test]
    fn test_threshold_is_strictly_greater() {
        // Exactly 100 ms of speech is still a mostly-silent blob.
        let mut acc = AudioAccumulator::default();
        assert!(!acc.apply(&blob(100, 900, 900)));
        assert_eq!(acc.current_silence_streak_ms, 900);
    }

    #[test]
    fn test_streak_seconds_one_decimal() {
        let acc = AudioAccumulator {
            speech_ms: 0,
            silence_ms: 0,
            current_silence_streak_ms: 2349,
        };
        assert_eq!(acc.streak_seconds(), 2.3);
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&VocalStatus::Stalling).unwrap(),
            "\"stalling\""
        );
    }
}
