//! Talkback speech crate - recognition and synthesis adapters.
//!
//! Wraps platform speech capabilities behind backend traits, with adapters
//! that enforce the session-facing contracts: single-starter recognition,
//! supersede-on-speak synthesis, and error absorption. Includes scripted and
//! silent backends for testing without real platform speech engines.

pub mod error;
pub mod recognition;
pub mod synthesis;

pub use error::SpeechError;
pub use recognition::{
    RecognitionAdapter, RecognitionBackend, RecognitionEvent, ScriptedPass, ScriptedRecognition,
};
pub use synthesis::{
    select_voice, SilentSynthesis, SynthesisAdapter, SynthesisBackend, TimedSynthesis, Voice,
};
