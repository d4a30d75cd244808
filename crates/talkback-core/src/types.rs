//! Shared domain types.

use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp())
    }
}

/// A span of recognized speech.
///
/// Interim transcripts are transient hypotheses that overwrite each other as
/// the recognizer refines them; a final transcript is the unit of work handed
/// to the chat agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// The recognized text.
    pub text: String,
    /// Whether the recognizer marked this result complete.
    pub is_final: bool,
    /// Recognizer confidence in [0.0, 1.0]. Zero for interim results.
    pub confidence: f32,
}

impl Transcript {
    /// An interim (partial) hypothesis.
    pub fn interim(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_final: false,
            confidence: 0.0,
        }
    }

    /// A final result with the given confidence.
    pub fn final_result(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            is_final: true,
            confidence,
        }
    }

    /// Whether this transcript is a candidate for dispatch to the agent:
    /// final and non-empty after trimming.
    pub fn is_dispatchable(&self) -> bool {
        self.is_final && !self.text.trim().is_empty()
    }
}
