//! The status line the session exposes to the presentation layer.
//!
//! Every adapter or agent failure the coordinator absorbs ends up here as a
//! message plus a category; nothing else crosses the upward boundary.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity/kind of the current session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusCategory {
    /// Normal operation (e.g., actively listening).
    Success,
    /// A failure that ended or prevented the session.
    Error,
    /// A transient or informational condition (e.g., speaking, retrying).
    Warning,
    /// Work in progress (starting up, waiting for the agent).
    Loading,
    /// No session running.
    Idle,
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusCategory::Success => write!(f, "success"),
            StatusCategory::Error => write!(f, "error"),
            StatusCategory::Warning => write!(f, "warning"),
            StatusCategory::Loading => write!(f, "loading"),
            StatusCategory::Idle => write!(f, "idle"),
        }
    }
}

/// A human-readable status message with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub message: String,
    pub category: StatusCategory,
}

impl SessionStatus {
    pub fn new(message: impl Into<String>, category: StatusCategory) -> Self {
        Self {
            message: message.into(),
            category,
        }
    }

    /// The status a session carries before it has ever been started.
    pub fn ready() -> Self {
        Self::new("Ready to chat", StatusCategory::Idle)
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::ready()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_display() {
        assert_eq!(StatusCategory::Success.to_string(), "success");
        assert_eq!(StatusCategory::Error.to_string(), "error");
        assert_eq!(StatusCategory::Warning.to_string(), "warning");
        assert_eq!(StatusCategory::Loading.to_string(), "loading");
        assert_eq!(StatusCategory::Idle.to_string(), "idle");
    }

    #[test]
    fn test_category_serde_lowercase() {
        let json = serde_json::to_string(&StatusCategory::Loading).unwrap();
        assert_eq!(json, "\"loading\"");
        let back: StatusCategory = serde_json::from_str("\"warning\"").unwrap();
        assert_eq!(back, StatusCategory::Warning);
    }

    #[test]
    fn test_ready_status() {
        let status = SessionStatus::ready();
        assert_eq!(status.category, StatusCategory::Idle);
        assert_eq!(status.message, "Ready to chat");
        assert_eq!(SessionStatus::default(), status);
    }

    #[test]
    fn test_status_new() {
        let status = SessionStatus::new("Listening", StatusCategory::Success);
        assert_eq!(status.message, "Listening");
        assert_eq!(status.category, StatusCategory::Success);
    }
}
