//! Error types for the speech adapters.

use talkback_core::error::TalkbackError;

/// Errors from recognition and synthesis backends.
#[derive(Debug, thiserror::Error)]
pub enum SpeechError {
    #[error("Capability not available: {0}")]
    Unsupported(String),
    #[error("Microphone permission denied")]
    PermissionDenied,
    #[error("Recognizer already started")]
    AlreadyStarted,
    #[error("Recognition device error: {0}")]
    Device(String),
    #[error("Synthesis playback error: {0}")]
    Playback(String),
}

impl From<SpeechError> for TalkbackError {
    fn from(err: SpeechError) -> Self {
        match err {
            SpeechError::Unsupported(what) => TalkbackError::Unsupported(what),
            SpeechError::PermissionDenied => TalkbackError::PermissionDenied,
            SpeechError::AlreadyStarted => {
                TalkbackError::Recognition("recognizer already started".to_string())
            }
            SpeechError::Device(msg) => TalkbackError::Recognition(msg),
            SpeechError::Playback(msg) => TalkbackError::Synthesis(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = SpeechError::Device("microphone lost".to_string());
        assert_eq!(err.to_string(), "Recognition device error: microphone lost");
    }

    #[test]
    fn test_conversion_to_core_error() {
        let err: TalkbackError = SpeechError::PermissionDenied.into();
        assert!(matches!(err, TalkbackError::PermissionDenied));

        let err: TalkbackError = SpeechError::Unsupported("speech synthesis".to_string()).into();
        assert!(matches!(err, TalkbackError::Unsupported(_)));

        let err: TalkbackError = SpeechError::Playback("audio device busy".to_string()).into();
        assert!(matches!(err, TalkbackError::Synthesis(_)));

        let err: TalkbackError = SpeechError::AlreadyStarted.into();
        assert!(matches!(err, TalkbackError::Recognition(_)));
    }
}
