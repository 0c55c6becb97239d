use serde::{Deserialize, Serialize};

/// Everything the report prompt is built from. Constructed fresh per run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub resume_text: String,
    pub duties: String,
    pub requirements: String,
    pub preferred: String,
}

/// Outcome of one successful analysis run. Replaced wholesale on every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Raw model output, never parsed or rewritten.
    pub final_result: String,
    /// Wall-clock time spent in the report generator only.
    pub latency_ms: u64,
}

/// A star rating in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StarRating(u8);

impl StarRating {
    pub const MAX: u8 = 5;

    /// Converts the widget's 0-based index into a 1-based score.
    pub fn from_index(index: u8) -> Option<Self> {
        Self::from_score(index.checked_add(1)?)
    }

    pub fn from_score(score: u8) -> Option<Self> {
        (1..=Self::MAX).contains(&score).then_some(Self(score))
    }

    pub fn score(self) -> u8 {
        self.0
    }

    pub fn stars(self) -> String {
        "⭐".repeat(self.0 as usize)
    }

    /// Canned sentiment label sent alongside the score.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "😭 Terrible",
            2 => "😞 Not great",
            3 => "😐 Okay",
            4 => "🙂 Good",
            _ => "😍 Excellent!",
        }
    }
}

/// A feedback submission. Transient: only ever turned into a notification.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackEvent {
    pub rating: StarRating,
    pub comment: String,
}
