//! Talkback session crate - the turn-taking coordinator.
//!
//! `VoiceSession` mediates between the recognition adapter, the synthesis
//! adapter, and the chat agent so the system never talks over itself,
//! never re-processes a stale transcript, and never gets stuck. A strict
//! state machine replaces the pile of boolean flags such coordinators
//! usually accrete.

pub mod session;
pub mod state;

pub use session::{SessionSnapshot, VoiceSession};
pub use state::{SessionState, StateMachine};
