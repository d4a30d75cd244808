use thiserror::Error;

/// Top-level error type for the Talkback system.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for TalkbackError` so that the `?` operator works
/// seamlessly across crate boundaries. The start-time failure taxonomy
/// (`Unsupported`, `PermissionDenied`) gets structured variants because the
/// coordinator branches on them; everything else wraps a message.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TalkbackError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Capability not available: {0}")]
    Unsupported(String),

    #[error("Microphone permission denied")]
    PermissionDenied,

    #[error("Recognition error: {0}")]
    Recognition(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for TalkbackError {
    fn from(err: toml::de::Error) -> Self {
        TalkbackError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for TalkbackError {
    fn from(err: toml::ser::Error) -> Self {
        TalkbackError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for TalkbackError {
    fn from(err: serde_json::Error) -> Self {
        TalkbackError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Talkback operations.
pub type Result<T> = std::result::Result<T, TalkbackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TalkbackError::Config("missing field".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing field");
    }

    #[test]
    fn test_unsupported_display() {
        let err = TalkbackError::Unsupported("speech synthesis".to_string());
        assert_eq!(err.to_string(), "Capability not available: speech synthesis");
    }

    #[test]
    fn test_permission_denied_display() {
        assert_eq!(
            TalkbackError::PermissionDenied.to_string(),
            "Microphone permission denied"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "device not found");
        let err: TalkbackError = io_err.into();
        assert!(matches!(err, TalkbackError::Io(_)));
        assert!(err.to_string().contains("device not found"));
    }

    #[test]
    fn test_error_from_toml_de() {
        let bad_toml = "invalid = [[[";
        let parsed: std::result::Result<toml::Value, _> = toml::from_str(bad_toml);
        let err: TalkbackError = parsed.unwrap_err().into();
        assert!(matches!(err, TalkbackError::Config(_)));
    }

    #[test]
    fn test_error_from_serde_json() {
        let parsed: std::result::Result<serde_json::Value, _> =
            serde_json::from_str("{ not json }");
        let err: TalkbackError = parsed.unwrap_err().into();
        assert!(matches!(err, TalkbackError::Serialization(_)));
    }

    #[test]
    fn test_result_type_with_question_mark() {
        fn inner() -> Result<String> {
            let io_result: std::result::Result<i32, std::io::Error> = Ok(42);
            let _value = io_result?;
            Ok("success".to_string())
        }

        assert_eq!(inner().unwrap(), "success");
    }
}
