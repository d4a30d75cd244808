//! Speech recognition adapter.
//!
//! Wraps a platform recognizer behind `RecognitionBackend` and enforces the
//! session-facing contract in `RecognitionAdapter`: start is a no-op while a
//! pass is live or a previous start is still pending (platform recognizers
//! error if double-started), stop is idempotent, and backend errors transition
//! to not-listening instead of propagating.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use talkback_core::types::Transcript;

use crate::error::SpeechError;

/// Events emitted by a recognition pass.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionEvent {
    /// The recognizer began capturing audio.
    Started,
    /// A recognized chunk. Interim results overwrite the working transcript;
    /// a final result marks the transcript ready for consumption.
    Result(Transcript),
    /// The pass ended: silence timeout, explicit stop, or after an error.
    Ended,
    /// A non-fatal recognizer error. The pass is over; the session decides
    /// whether to retry.
    Error(String),
}

/// Platform speech-to-text engine.
///
/// A backend runs one capture pass at a time: `start` launches a pass that
/// reports progress through the event sender and errors if a pass is already
/// live. `stop` ends the current pass (the `Ended` event still fires).
pub trait RecognitionBackend: Send + Sync {
    /// Whether the platform exposes a speech recognition capability.
    fn is_supported(&self) -> bool;

    /// Request microphone access from the platform.
    fn request_permission(&self) -> impl Future<Output = Result<(), SpeechError>> + Send;

    /// Begin a capture pass, reporting events through `events`.
    fn start(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> impl Future<Output = Result<(), SpeechError>> + Send;

    /// End the current pass. Safe to call when no pass is live.
    fn stop(&self);
}

// =============================================================================
// Adapter
// =============================================================================

/// Session-facing recognition adapter.
///
/// Tracks listening state and the running transcript, and guards against
/// double starts: only one pass may be live or starting at a time. The
/// adapter does not consume the event stream itself; the session coordinator
/// feeds each event back through [`RecognitionAdapter::apply`] so observable
/// state stays consistent with what the coordinator has seen.
pub struct RecognitionAdapter<B: RecognitionBackend> {
    backend: B,
    listening: AtomicBool,
    starting: AtomicBool,
    transcript: Mutex<String>,
    confidence: Mutex<f32>,
}

impl<B: RecognitionBackend> RecognitionAdapter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            listening: AtomicBool::new(false),
            starting: AtomicBool::new(false),
            transcript: Mutex::new(String::new()),
            confidence: Mutex::new(0.0),
        }
    }

    /// Access the wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Whether the platform exposes a recognition capability.
    pub fn is_supported(&self) -> bool {
        self.backend.is_supported()
    }

    /// Request microphone access.
    pub async fn request_permission(&self) -> Result<(), SpeechError> {
        self.backend.request_permission().await
    }

    /// Whether a capture pass is currently live.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::SeqCst)
    }

    /// Latest interim-or-final transcript text.
    pub fn transcript(&self) -> String {
        self.transcript.lock().expect("transcript mutex poisoned").clone()
    }

    /// Confidence of the most recent final result.
    pub fn confidence(&self) -> f32 {
        *self.confidence.lock().expect("confidence mutex poisoned")
    }

    /// Clear accumulated transcript state.
    pub fn reset_transcript(&self) {
        self.transcript
            .lock()
            .expect("transcript mutex poisoned")
            .clear();
        *self.confidence.lock().expect("confidence mutex poisoned") = 0.0;
    }

    /// Begin listening.
    ///
    /// No-op (not an error) if a pass is already live or a previous start is
    /// still pending; two live recognizers must never exist. A backend
    /// `AlreadyStarted` error is likewise absorbed: the pass we raced against
    /// is the pass we wanted.
    pub async fn start_listening(
        &self,
        events: &mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), SpeechError> {
        if !self.backend.is_supported() {
            return Err(SpeechError::Unsupported("speech recognition".to_string()));
        }
        if self.listening.load(Ordering::SeqCst) {
            debug!("Already listening, skipping start");
            return Ok(());
        }
        if self.starting.swap(true, Ordering::SeqCst) {
            debug!("Start already pending, skipping start");
            return Ok(());
        }

        let result = self.backend.start(events.clone()).await;
        self.starting.store(false, Ordering::SeqCst);

        match result {
            Ok(()) => Ok(()),
            Err(SpeechError::AlreadyStarted) => {
                debug!("Recognizer already started, treating as listening");
                self.listening.store(true, Ordering::SeqCst);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to start recognition");
                Err(e)
            }
        }
    }

    /// Stop listening. Idempotent; safe when not listening.
    pub fn stop_listening(&self) {
        self.backend.stop();
        self.listening.store(false, Ordering::SeqCst);
        self.starting.store(false, Ordering::SeqCst);
    }

    /// Fold an observed event into adapter state.
    pub fn apply(&self, event: &RecognitionEvent) {
        match event {
            RecognitionEvent::Started => {
                self.listening.store(true, Ordering::SeqCst);
            }
            RecognitionEvent::Result(t) => {
                *self.transcript.lock().expect("transcript mutex poisoned") = t.text.clone();
                if t.is_final {
                    *self.confidence.lock().expect("confidence mutex poisoned") = t.confidence;
                }
            }
            RecognitionEvent::Ended => {
                self.listening.store(false, Ordering::SeqCst);
            }
            RecognitionEvent::Error(reason) => {
                debug!(reason = %reason, "Recognition error, no longer listening");
                self.listening.store(false, Ordering::SeqCst);
            }
        }
    }
}

// =============================================================================
// Scripted backend
// =============================================================================

/// One pre-planned capture pass for [`ScriptedRecognition`].
#[derive(Debug, Clone)]
pub struct ScriptedPass {
    /// Transcript chunks to emit, in order.
    pub transcripts: Vec<Transcript>,
    /// If set, the pass ends with this error instead of a normal `Ended`.
    pub error: Option<String>,
}

impl ScriptedPass {
    /// A pass where the user says nothing (silence timeout).
    pub fn silence() -> Self {
        Self {
            transcripts: Vec::new(),
            error: None,
        }
    }

    /// A pass with an interim hypothesis followed by the final result.
    pub fn utterance(text: &str) -> Self {
        let cut = text
            .char_indices()
            .nth(text.chars().count() / 2)
            .map(|(i, _)| i)
            .unwrap_or(0);
        Self {
            transcripts: vec![
                Transcript::interim(&text[..cut]),
                Transcript::final_result(text, 0.9),
            ],
            error: None,
        }
    }

    /// A pass emitting only the final result.
    pub fn final_only(text: &str, confidence: f32) -> Self {
        Self {
            transcripts: vec![Transcript::final_result(text, confidence)],
            error: None,
        }
    }

    /// A pass that fails mid-capture.
    pub fn failure(reason: &str) -> Self {
        Self {
            transcripts: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

/// Scripted recognition backend for tests and demos.
///
/// Each `start` plays the next scripted pass on a background task; when the
/// script runs out, passes are silent. Clones share all state, so a test can
/// keep a handle while the session owns the backend.
#[derive(Clone)]
pub struct ScriptedRecognition {
    supported: bool,
    deny_permission: bool,
    event_gap: Duration,
    passes: Arc<Mutex<VecDeque<ScriptedPass>>>,
    live: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
    permission_requests: Arc<AtomicUsize>,
    current_tx: Arc<Mutex<Option<mpsc::UnboundedSender<RecognitionEvent>>>>,
    pass_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ScriptedRecognition {
    pub fn new(passes: Vec<ScriptedPass>) -> Self {
        Self {
            supported: true,
            deny_permission: false,
            event_gap: Duration::from_millis(5),
            passes: Arc::new(Mutex::new(passes.into())),
            live: Arc::new(AtomicBool::new(false)),
            starts: Arc::new(AtomicUsize::new(0)),
            permission_requests: Arc::new(AtomicUsize::new(0)),
            current_tx: Arc::new(Mutex::new(None)),
            pass_task: Arc::new(Mutex::new(None)),
        }
    }

    /// A backend whose platform lacks the recognition capability.
    pub fn unsupported() -> Self {
        let mut backend = Self::new(Vec::new());
        backend.supported = false;
        backend
    }

    /// A backend that refuses microphone access.
    pub fn denying_permission(passes: Vec<ScriptedPass>) -> Self {
        let mut backend = Self::new(passes);
        backend.deny_permission = true;
        backend
    }

    /// Override the delay between scripted events.
    pub fn with_event_gap(mut self, gap: Duration) -> Self {
        self.event_gap = gap;
        self
    }

    /// Number of times `start` was invoked.
    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    /// Number of times permission was requested.
    pub fn permission_request_count(&self) -> usize {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Append a pass to the script.
    pub fn push_pass(&self, pass: ScriptedPass) {
        self.passes
            .lock()
            .expect("script mutex poisoned")
            .push_back(pass);
    }

    /// Inject an out-of-band event into the current session's event stream.
    ///
    /// Models the platform recognizer picking up speech at an unexpected
    /// moment (the barge-in case). No-op if no pass has run yet.
    pub fn inject(&self, event: RecognitionEvent) {
        if let Some(tx) = self
            .current_tx
            .lock()
            .expect("sender mutex poisoned")
            .as_ref()
        {
            let _ = tx.send(event);
        }
    }
}

impl RecognitionBackend for ScriptedRecognition {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn request_permission(&self) -> Result<(), SpeechError> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        if !self.supported {
            return Err(SpeechError::Unsupported("speech recognition".to_string()));
        }
        if self.deny_permission {
            return Err(SpeechError::PermissionDenied);
        }
        Ok(())
    }

    async fn start(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), SpeechError> {
        if !self.supported {
            return Err(SpeechError::Unsupported("speech recognition".to_string()));
        }
        self.starts.fetch_add(1, Ordering::SeqCst);
        if self.live.swap(true, Ordering::SeqCst) {
            return Err(SpeechError::AlreadyStarted);
        }

        let pass = self
            .passes
            .lock()
            .expect("script mutex poisoned")
            .pop_front()
            .unwrap_or_else(ScriptedPass::silence);

        *self.current_tx.lock().expect("sender mutex poisoned") = Some(events.clone());

        let gap = self.event_gap;
        let live = Arc::clone(&self.live);
        let handle = tokio::spawn(async move {
            let _ = events.send(RecognitionEvent::Started);
            for transcript in pass.transcripts {
                tokio::time::sleep(gap).await;
                let _ = events.send(RecognitionEvent::Result(transcript));
            }
            tokio::time::sleep(gap).await;
            match pass.error {
                Some(reason) => {
                    let _ = events.send(RecognitionEvent::Error(reason));
                }
                None => {
                    let _ = events.send(RecognitionEvent::Ended);
                }
            }
            live.store(false, Ordering::SeqCst);
        });
        *self.pass_task.lock().expect("task mutex poisoned") = Some(handle);

        Ok(())
    }

    fn stop(&self) {
        if self.live.swap(false, Ordering::SeqCst) {
            if let Some(handle) = self.pass_task.lock().expect("task mutex poisoned").take() {
                handle.abort();
            }
            // An explicit stop still produces the platform "ended" transition.
            if let Some(tx) = self
                .current_tx
                .lock()
                .expect("sender mutex poisoned")
                .as_ref()
            {
                let _ = tx.send(RecognitionEvent::Ended);
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
