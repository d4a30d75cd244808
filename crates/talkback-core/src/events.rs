use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::Timestamp;

/// Lifecycle events emitted by the session coordinator.
///
/// Events are published on a broadcast channel for observers (logging, a
/// future UI feed). They are informational only; no component drives its own
/// state from them.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SessionEvent {
    /// A voice chat session was started.
    SessionStarted {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The session was stopped by command or fatal error.
    SessionStopped {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The recognizer began a listening pass.
    ListeningStarted {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// A final transcript was accepted for processing.
    TranscriptCaptured {
        session_id: Uuid,
        text: String,
        confidence: f32,
        timestamp: Timestamp,
    },

    /// The chat agent produced a reply.
    ReplyGenerated {
        session_id: Uuid,
        text: String,
        timestamp: Timestamp,
    },

    /// Playback of a reply began.
    SpeechStarted {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// Playback of a reply ended (naturally, by error, or by barge-in).
    SpeechEnded {
        session_id: Uuid,
        timestamp: Timestamp,
    },

    /// The recognizer reported a non-fatal error; listening will be retried.
    RecognitionErrored {
        session_id: Uuid,
        reason: String,
        timestamp: Timestamp,
    },
}

impl SessionEvent {
    /// Returns the timestamp of the event.
    pub fn timestamp(&self) -> Timestamp {
        match self {
            SessionEvent::SessionStarted { timestamp, .. }
            | SessionEvent::SessionStopped { timestamp, .. }
            | SessionEvent::ListeningStarted { timestamp, .. }
            | SessionEvent::TranscriptCaptured { timestamp, .. }
            | SessionEvent::ReplyGenerated { timestamp, .. }
            | SessionEvent::SpeechStarted { timestamp, .. }
            | SessionEvent::SpeechEnded { timestamp, .. }
            | SessionEvent::RecognitionErrored { timestamp, .. } => *timestamp,
        }
    }

    /// Returns a human-readable event name for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            SessionEvent::SessionStarted { .. } => "session_started",
            SessionEvent::SessionStopped { .. } => "session_stopped",
            SessionEvent::ListeningStarted { .. } => "listening_started",
            SessionEvent::TranscriptCaptured { .. } => "transcript_captured",
            SessionEvent::ReplyGenerated { .. } => "reply_generated",
            SessionEvent::SpeechStarted { .. } => "speech_started",
            SessionEvent::SpeechEnded { .. } => "speech_ended",
            SessionEvent::RecognitionErrored { .. } => "recognition_errored",
        }
    }

    /// Returns the session this event belongs to.
    pub fn session_id(&self) -> Uuid {
        match self {
            SessionEvent::SessionStarted { session_id, .. }
            | SessionEvent::SessionStopped { session_id, .. }
            | SessionEvent::ListeningStarted { session_id, .. }
            | SessionEvent::TranscriptCaptured { session_id, .. }
            | SessionEvent::ReplyGenerated { session_id, .. }
            | SessionEvent::SpeechStarted { session_id, .. }
            | SessionEvent::SpeechEnded { session_id, .. }
            | SessionEvent::RecognitionErrored { session_id, .. } => *session_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_timestamp() {
        let ts = Timestamp::now();
        let event = SessionEvent::SessionStarted {
            session_id: Uuid::new_v4(),
            timestamp: ts,
        };
        assert_eq!(event.timestamp(), ts);
    }

    #[test]
    fn test_event_name() {
        let event = SessionEvent::TranscriptCaptured {
            session_id: Uuid::new_v4(),
            text: "hello".to_string(),
            confidence: 0.9,
            timestamp: Timestamp::now(),
        };
        assert_eq!(event.event_name(), "transcript_captured");
    }

    #[test]
    fn test_event_session_id() {
        let id = Uuid::new_v4();
        let event = SessionEvent::SpeechEnded {
            session_id: id,
            timestamp: Timestamp::now(),
        };
        assert_eq!(event.session_id(), id);
    }

    #[test]
    fn test_event_serialization_round_trip() {
        let ts = Timestamp::now();
        let id = Uuid::new_v4();
        let events: Vec<SessionEvent> = vec![
            SessionEvent::SessionStarted {
                session_id: id,
                timestamp: ts,
            },
            SessionEvent::SessionStopped {
                session_id: id,
                timestamp: ts,
            },
            SessionEvent::ListeningStarted {
                session_id: id,
                timestamp: ts,
            },
            SessionEvent::TranscriptCaptured {
                session_id: id,
                text: "what time is it".to_string(),
                confidence: 0.88,
                timestamp: ts,
            },
            SessionEvent::ReplyGenerated {
                session_id: id,
                text: "It's noon.".to_string(),
                timestamp: ts,
            },
            SessionEvent::SpeechStarted {
                session_id: id,
                timestamp: ts,
            },
            SessionEvent::SpeechEnded {
                session_id: id,
                timestamp: ts,
            },
            SessionEvent::RecognitionErrored {
                session_id: id,
                reason: "no-speech".to_string(),
                timestamp: ts,
            },
        ];

        for event in &events {
            let json = serde_json::to_string(event).unwrap();
            let back: SessionEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(back.event_name(), event.event_name());
            assert_eq!(back.timestamp(), event.timestamp());
            assert_eq!(back.session_id(), event.session_id());
        }
    }
}
