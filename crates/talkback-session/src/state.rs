//! Session state machine with thread-safe transitions.
//!
//! Enforces valid transitions for the voice chat turn cycle:
//! - Idle -> Starting (start command, permission granted)
//! - Starting -> Listening (recognizer began capturing)
//! - Listening -> Processing (final transcript accepted)
//! - Processing -> Speaking (reply handed to synthesis)
//! - Speaking -> Listening (playback ended, next turn)
//! - Starting/Listening/Processing/Speaking -> Idle (stop command)
//!
//! At most one of listening/speaking/processing can hold because they are
//! projections of this single value, never independent flags.

use std::fmt;
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use talkback_core::error::TalkbackError;

/// Operational state of a voice chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    /// No session running. Ready to start.
    Idle,
    /// Permission granted; waiting for the first listening pass.
    Starting,
    /// Actively capturing and transcribing user speech.
    Listening,
    /// A final transcript is with the chat agent.
    Processing,
    /// Playing the agent's reply through synthesis.
    Speaking,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => write!(f, "Idle"),
            SessionState::Starting => write!(f, "Starting"),
            SessionState::Listening => write!(f, "Listening"),
            SessionState::Processing => write!(f, "Processing"),
            SessionState::Speaking => write!(f, "Speaking"),
        }
    }
}

impl SessionState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &SessionState) -> bool {
        matches!(
            (self, target),
            (SessionState::Idle, SessionState::Starting)
                | (SessionState::Starting, SessionState::Listening)
                | (SessionState::Listening, SessionState::Processing)
                | (SessionState::Processing, SessionState::Speaking)
                | (SessionState::Speaking, SessionState::Listening)
                // Stop is reachable from every non-idle state
                | (SessionState::Starting, SessionState::Idle)
                | (SessionState::Listening, SessionState::Idle)
                | (SessionState::Processing, SessionState::Idle)
                | (SessionState::Speaking, SessionState::Idle)
        )
    }
}

/// Thread-safe state machine for session transitions.
///
/// All transitions are validated before being applied, returning an error if
/// the requested transition is not permitted from the current state. The
/// check-and-update happens under one lock, so concurrent triggers cannot
/// both win the same transition.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: Arc<Mutex<SessionState>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Create a new state machine initialized to `Idle`.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::Idle)),
        }
    }

    /// Returns the current state.
    pub fn current(&self) -> SessionState {
        *self.state.lock().expect("state mutex poisoned")
    }

    /// Attempt to transition to the target state.
    pub fn transition(&self, target: SessionState) -> Result<(), TalkbackError> {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if state.can_transition_to(&target) {
            tracing::debug!("Session state: {} -> {}", *state, target);
            *state = target;
            Ok(())
        } else {
            Err(TalkbackError::Session(format!(
                "Invalid state transition: {} -> {}",
                *state, target
            )))
        }
    }

    /// Force the state machine back to Idle (used when stopping the session).
    pub fn reset(&self) {
        let mut state = self.state.lock().expect("state mutex poisoned");
        if *state != SessionState::Idle {
            tracing::debug!("Session state machine reset to Idle from {}", *state);
            *state = SessionState::Idle;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
