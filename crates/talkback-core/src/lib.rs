//! Talkback core crate - shared types, errors, configuration, and events.
//!
//! Everything the other Talkback crates agree on lives here: the error
//! taxonomy, the TOML configuration model, the status line shown to the
//! presentation layer, transcripts, and the session lifecycle events.

pub mod config;
pub mod error;
pub mod events;
pub mod status;
pub mod types;

pub use config::TalkbackConfig;
pub use error::{Result, TalkbackError};
pub use events::SessionEvent;
pub use status::{SessionStatus, StatusCategory};
pub use types::{Timestamp, Transcript};
