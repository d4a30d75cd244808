//! Speech synthesis adapter.
//!
//! Wraps a platform text-to-speech engine behind `SynthesisBackend`. The
//! adapter guarantees at most one utterance in flight: a new `speak`
//! supersedes the previous one, cancellation resolves the pending call, and
//! playback failures are absorbed so the turn cycle always advances.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::error::SpeechError;

/// A synthesis voice exposed by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    pub name: String,
    /// BCP-47 language tag (e.g., "en-US").
    pub lang: String,
    /// Whether the voice is synthesized locally rather than streamed.
    pub local: bool,
}

/// Pick the best voice for a language prefix.
///
/// Preference order: a local voice matching the language, any voice matching
/// the language, then the first voice in the list. `None` when the platform
/// exposes no voices at all, in which case playback degrades to a silent
/// no-op.
pub fn select_voice<'a>(voices: &'a [Voice], lang: &str) -> Option<&'a Voice> {
    voices
        .iter()
        .find(|v| v.lang.starts_with(lang) && v.local)
        .or_else(|| voices.iter().find(|v| v.lang.starts_with(lang)))
        .or_else(|| voices.first())
}

/// Platform text-to-speech engine.
pub trait SynthesisBackend: Send + Sync {
    /// Whether the platform exposes a speech synthesis capability.
    fn is_supported(&self) -> bool;

    /// Synthesize and play `text`, resolving when playback ends naturally,
    /// by error, or by cancellation.
    fn speak(&self, text: &str) -> impl Future<Output = Result<(), SpeechError>> + Send;

    /// Cancel in-flight playback. Must take effect promptly enough that a
    /// superseding utterance does not overlap audio with the old one.
    fn cancel(&self);
}

// =============================================================================
// Adapter
// =============================================================================

/// Session-facing synthesis adapter.
pub struct SynthesisAdapter<B: SynthesisBackend> {
    backend: B,
    speaking: AtomicBool,
    // Monotonic utterance counter so a superseded speak cannot clear the
    // speaking flag set by its successor.
    generation: AtomicU64,
}

impl<B: SynthesisBackend> SynthesisAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            speaking: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Access the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the platform exposes a synthesis capability.
    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    /// Whether an utterance is currently playing.
    pub fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    /// Speak `text`, cancelling any utterance still in flight.
    ///
    /// Empty or whitespace-only text resolves immediately without producing
    /// audio. Playback failures are logged and swallowed; the future always
    /// resolves so the caller's turn cycle advances.
    pub async fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            debug!("Empty utterance, nothing to speak");
            return;
        }
        if !self.backend.is_supported() {
            debug!("No synthesis capability, dropping utterance");
            return;
        }

        self.backend.cancel();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.speaking.store(true, Ordering::SeqCst);

        if let Err(e) = self.backend.speak(text).await {
            warn!(error = %e, "Synthesis failed, treating utterance as finished");
        }

        if self.generation.load(Ordering::SeqCst) == generation {
            self.speaking.store(false, Ordering::SeqCst);
        }
    }

    /// Cancel in-flight playback immediately. The pending `speak` resolves.
    pub fn stop(&self) {
        self.backend.cancel();
        self.speaking.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Backends
// =============================================================================

/// Synthesis backend that "plays" for a duration proportional to text length.
///
/// Used by tests and demos: no audio is produced, but timing and cancellation
/// behave like a real engine. Clones share all state.
#[derive(Clone)]
pub struct TimedSynthesis {
    voice: Option<Voice>,
    per_char: Duration,
    fail_playback: bool,
    cancelled: Arc<Notify>,
    utterances: Arc<Mutex<Vec<String>>>,
    cancel_count: Arc<AtomicUsize>,
}

impl TimedSynthesis {
    pub fn new(per_char: Duration) -> Self {
        Self {
            voice: None,
            per_char,
            fail_playback: false,
            cancelled: Arc::new(Notify::new()),
            utterances: Arc::new(Mutex::new(Vec::new())),
            cancel_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Build with a platform voice list, selecting per the locale policy.
    pub fn with_voices(voices: &[Voice], lang: &str, per_char: Duration) -> Self {
        let mut backend = Self::new(per_char);
        backend.voice = select_voice(voices, lang).cloned();
        match &backend.voice {
            Some(v) => debug!(voice = %v.name, "Synthesis voice selected"),
            None => debug!("No synthesis voices available, playback will be silent"),
        }
        backend
    }

    /// A backend whose playback always errors.
    pub fn failing() -> Self {
        let mut backend = Self::new(Duration::from_millis(1));
        backend.fail_playback = true;
        backend
    }

    /// The selected voice, if any.
    pub fn voice(&self) -> Option<&Voice> {
        self.voice.as_ref()
    }

    /// Texts passed to `speak`, in order.
    pub fn utterances(&self) -> Vec<String> {
        self.utterances.lock().expect("utterance mutex poisoned").clone()
    }

    /// Number of times `cancel` was invoked.
    pub fn cancel_count(&self) -> usize {
        self.cancel_count.load(Ordering::SeqCst)
    }
}

impl SynthesisBackend for TimedSynthesis {
    fn is_supported(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        self.utterances
            .lock()
            .expect("utterance mutex poisoned")
            .push(text.to_string());

        if self.fail_playback {
            return Err(SpeechError::Playback("audio device unavailable".to_string()));
        }

        let duration = self.per_char * text.chars().count().max(1) as u32;
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled.notified() => {
                debug!("Playback cancelled mid-utterance");
            }
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancel_count.fetch_add(1, Ordering::SeqCst);
        self.cancelled.notify_waiters();
    }
}

/// Capability-absent synthesis backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentSynthesis;

impl SynthesisBackend for SilentSynthesis {
    fn is_supported(&self) -> bool {
        false
    }

    async fn speak(&self, _text: &str) -> Result<(), SpeechError> {
        Ok(())
    }

    fn cancel(&self) {}
}

// =============================================================================
// Tests
// =============================================================================
