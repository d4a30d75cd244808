//! The voice chat session coordinator.
//!
//! `VoiceSession` owns the recognition adapter, the synthesis adapter, and
//! the chat agent, and runs the turn cycle between them: listen, hand the
//! final transcript to the agent, speak the reply, listen again. The state
//! machine arbitrates every phase change, so concurrent triggers (a transcript
//! arriving while a reply is playing, a stop command mid-turn) collapse into
//! a single winner instead of corrupting the cycle.
//!
//! Recognition passes end on their own (silence timeouts, platform errors),
//! so the coordinator re-arms listening with a delayed restart rather than
//! assuming a pass lives as long as the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use talkback_agent::{ChatAgent, FALLBACK_REPLY};
use talkback_core::config::SessionConfig;
use talkback_core::error::{Result, TalkbackError};
use talkback_core::events::SessionEvent;
use talkback_core::status::{SessionStatus, StatusCategory};
use talkback_core::types::{Timestamp, Transcript};
use talkback_speech::recognition::{RecognitionAdapter, RecognitionBackend, RecognitionEvent};
use talkback_speech::synthesis::{SynthesisAdapter, SynthesisBackend};

use crate::state::{SessionState, StateMachine};

const EVENT_CHANNEL_CAPACITY: usize = 32;

/// A point-in-time view of the session for the presentation layer.
///
/// The `listening`/`processing`/`speaking` booleans are projections of the
/// single state value, so at most one of them is ever true.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    /// Whether a session is running.
    pub active: bool,
    /// Current phase of the turn cycle.
    pub state: SessionState,
    pub listening: bool,
    pub processing: bool,
    pub speaking: bool,
    /// Human-readable status line.
    pub status: String,
    pub status_category: StatusCategory,
    /// Latest interim-or-final transcript text.
    pub transcript: String,
    /// The most recent agent reply, empty before the first turn.
    pub last_reply: String,
}

impl SessionSnapshot {
    fn initial() -> Self {
        let status = SessionStatus::ready();
        Self {
            active: false,
            state: SessionState::Idle,
            listening: false,
            processing: false,
            speaking: false,
            status: status.message,
            status_category: status.category,
            transcript: String::new(),
            last_reply: String::new(),
        }
    }
}

/// Turn-taking coordinator for one voice chat session.
///
/// Cheap to clone; clones share the same session.
pub struct VoiceSession<R, S>
where
    R: RecognitionBackend + 'static,
    S: SynthesisBackend + 'static,
{
    inner: Arc<SessionInner<R, S>>,
}

impl<R, S> Clone for VoiceSession<R, S>
where
    R: RecognitionBackend + 'static,
    S: SynthesisBackend + 'static,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct SessionInner<R, S>
where
    R: RecognitionBackend + 'static,
    S: SynthesisBackend + 'static,
{
    id: Uuid,
    config: SessionConfig,
    recognition: RecognitionAdapter<R>,
    synthesis: SynthesisAdapter<S>,
    agent: Arc<dyn ChatAgent>,
    machine: StateMachine,
    active: AtomicBool,
    status: Mutex<SessionStatus>,
    last_reply: Mutex<String>,
    // Trimmed text of the most recently processed transcript, for dedup when
    // the platform re-delivers the same final result across passes.
    last_processed: Mutex<String>,
    // Final transcript awaiting dispatch. Results arrive mid-pass but are
    // only acted on when the pass ends.
    pending_final: Mutex<Option<Transcript>>,
    recognition_tx: Mutex<Option<mpsc::UnboundedSender<RecognitionEvent>>>,
    restart_timer: Mutex<Option<JoinHandle<()>>>,
    loop_task: Mutex<Option<JoinHandle<()>>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events_tx: broadcast::Sender<SessionEvent>,
}

impl<R, S> VoiceSession<R, S>
where
    R: RecognitionBackend + 'static,
    S: SynthesisBackend + 'static,
{
    pub fn new(
        recognition: R,
        synthesis: S,
        agent: Arc<dyn ChatAgent>,
        config: SessionConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(SessionSnapshot::initial());
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                config,
                recognition: RecognitionAdapter::new(recognition),
                synthesis: SynthesisAdapter::new(synthesis),
                agent,
                machine: StateMachine::new(),
                active: AtomicBool::new(false),
                status: Mutex::new(SessionStatus::ready()),
                last_reply: Mutex::new(String::new()),
                last_processed: Mutex::new(String::new()),
                pending_final: Mutex::new(None),
                recognition_tx: Mutex::new(None),
                restart_timer: Mutex::new(None),
                loop_task: Mutex::new(None),
                snapshot_tx,
                events_tx,
            }),
        }
    }

    /// Unique id of this session instance.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Whether both speech capabilities are present on this platform.
    pub fn is_supported(&self) -> bool {
        self.inner.recognition.is_supported() && self.inner.synthesis.is_supported()
    }

    /// The recognition adapter, for capability and transcript inspection.
    pub fn recognition(&self) -> &RecognitionAdapter<R> {
        &self.inner.recognition
    }

    /// The synthesis adapter, for capability and playback inspection.
    pub fn synthesis(&self) -> &SynthesisAdapter<S> {
        &self.inner.synthesis
    }

    /// Start the session: verify capabilities, obtain microphone permission,
    /// and arm the first listening pass.
    ///
    /// A no-op when the session is already active. On failure the session
    /// stays inactive with an error status describing what went wrong.
    pub async fn start(&self) -> Result<()> {
        Arc::clone(&self.inner).start().await
    }

    /// Stop the session and reset all per-session state. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// A fresh snapshot of the current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.make_snapshot()
    }

    /// Watch channel carrying the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Broadcast stream of lifecycle events.
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events_tx.subscribe()
    }
}

impl<R, S> SessionInner<R, S>
where
    R: RecognitionBackend + 'static,
    S: SynthesisBackend + 'static,
{
    async fn start(self: Arc<Self>) -> Result<()> {
        if self.active.swap(true, Ordering::SeqCst) {
            debug!(session_id = %self.id, "Session already active, ignoring start");
            return Ok(());
        }

        if !self.recognition.is_supported() || !self.synthesis.is_supported() {
            self.active.store(false, Ordering::SeqCst);
            self.set_status(SessionStatus::new("Voice not supported", StatusCategory::Error));
            let missing = if self.recognition.is_supported() {
                "speech synthesis"
            } else {
                "speech recognition"
            };
            return Err(TalkbackError::Unsupported(missing.to_string()));
        }

        if let Err(e) = self.recognition.request_permission().await {
            self.active.store(false, Ordering::SeqCst);
            self.set_status(SessionStatus::new(
                "Microphone access denied",
                StatusCategory::Error,
            ));
            return Err(e.into());
        }

        if let Err(e) = self.machine.transition(SessionState::Starting) {
            self.active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        // Fresh session, no residue from a previous one.
        self.recognition.reset_transcript();
        self.last_reply.lock().expect("reply mutex poisoned").clear();
        self.last_processed
            .lock()
            .expect("processed mutex poisoned")
            .clear();
        *self.pending_final.lock().expect("pending mutex poisoned") = None;

        let (tx, mut rx) = mpsc::unbounded_channel();
        *self
            .recognition_tx
            .lock()
            .expect("sender mutex poisoned") = Some(tx);

        let loop_inner = Arc::clone(&self);
        let task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                Arc::clone(&loop_inner).handle_event(event);
            }
        });
        *self.loop_task.lock().expect("task mutex poisoned") = Some(task);

        self.set_status(SessionStatus::new("Starting...", StatusCategory::Loading));
        info!(session_id = %self.id, "Voice chat session started");
        self.emit(SessionEvent::SessionStarted {
            session_id: self.id,
            timestamp: Timestamp::now(),
        });

        let delay = self.config.start_delay();
        Arc::clone(&self).schedule_listen(delay);
        Ok(())
    }

    fn stop(&self) {
        let was_active = self.active.swap(false, Ordering::SeqCst);

        if let Some(timer) = self.restart_timer.lock().expect("timer mutex poisoned").take() {
            timer.abort();
        }
        self.synthesis.stop();
        self.recognition.stop_listening();
        if let Some(task) = self.loop_task.lock().expect("task mutex poisoned").take() {
            task.abort();
        }
        *self
            .recognition_tx
            .lock()
            .expect("sender mutex poisoned") = None;
        *self.pending_final.lock().expect("pending mutex poisoned") = None;
        self.recognition.reset_transcript();
        self.last_reply.lock().expect("reply mutex poisoned").clear();
        self.last_processed
            .lock()
            .expect("processed mutex poisoned")
            .clear();
        self.machine.reset();

        if was_active {
            info!(session_id = %self.id, "Voice chat session stopped");
            self.set_status(SessionStatus::new("Chat ended", StatusCategory::Warning));
            self.emit(SessionEvent::SessionStopped {
                session_id: self.id,
                timestamp: Timestamp::now(),
            });
        }
        self.publish();
    }

    /// React to one recognition event. Runs on the event loop task.
    fn handle_event(self: Arc<Self>, event: RecognitionEvent) {
        if !self.active.load(Ordering::SeqCst) {
            return;
        }
        self.recognition.apply(&event);

        match event {
            RecognitionEvent::Started => {
                if self.machine.current() == SessionState::Starting {
                    if let Err(e) = self.machine.transition(SessionState::Listening) {
                        debug!(error = %e, "Recognizer start lost the transition race");
                    }
                }
                if self.machine.current() == SessionState::Listening {
                    self.set_status(SessionStatus::new("Listening...", StatusCategory::Success));
                    self.emit(SessionEvent::ListeningStarted {
                        session_id: self.id,
                        timestamp: Timestamp::now(),
                    });
                }
            }
            RecognitionEvent::Result(transcript) => {
                // Barge-in: user speech trumps our own playback.
                if self.machine.current() == SessionState::Speaking {
                    debug!("Speech detected during playback, cancelling synthesis");
                    self.synthesis.stop();
                }
                if transcript.is_final {
                    *self.pending_final.lock().expect("pending mutex poisoned") =
                        Some(transcript);
                }
            }
            RecognitionEvent::Ended => {
                let pending = self.pending_final.lock().expect("pending mutex poisoned").take();
                match pending {
                    Some(t) if t.is_dispatchable() && !self.is_duplicate(&t.text) => {
                        Arc::clone(&self).dispatch(t);
                    }
                    _ => {
                        // Silence, a duplicate, or an empty final: re-arm
                        // listening unless another phase took over.
                        if self.machine.current() == SessionState::Listening {
                            self.recognition.reset_transcript();
                            let delay = self.config.restart_delay();
                            Arc::clone(&self).schedule_listen(delay);
                        }
                    }
                }
            }
            RecognitionEvent::Error(reason) => {
                warn!(session_id = %self.id, reason = %reason, "Recognition error");
                self.emit(SessionEvent::RecognitionErrored {
                    session_id: self.id,
                    reason,
                    timestamp: Timestamp::now(),
                });
                if matches!(
                    self.machine.current(),
                    SessionState::Starting | SessionState::Listening
                ) {
                    self.set_status(SessionStatus::new(
                        "Microphone hiccup, retrying...",
                        StatusCategory::Warning,
                    ));
                    let delay = self.config.restart_delay();
                    Arc::clone(&self).schedule_listen(delay);
                }
            }
        }
        self.publish();
    }

    /// Hand a final transcript to the agent, if the turn cycle allows it.
    fn dispatch(self: Arc<Self>, transcript: Transcript) {
        if self.machine.transition(SessionState::Processing).is_err() {
            // Another phase holds the cycle (reply still playing after a
            // barge-in). Keep the transcript; the turn end re-checks it.
            debug!("Deferring transcript until the current turn completes");
            *self.pending_final.lock().expect("pending mutex poisoned") = Some(transcript);
            return;
        }
        if let Some(timer) = self.restart_timer.lock().expect("timer mutex poisoned").take() {
            timer.abort();
        }
        self.emit(SessionEvent::TranscriptCaptured {
            session_id: self.id,
            text: transcript.text.clone(),
            confidence: transcript.confidence,
            timestamp: Timestamp::now(),
        });
        let inner = Arc::clone(&self);
        tokio::spawn(async move {
            inner.run_turn(transcript.text).await;
        });
    }

    /// One full agent turn: generate a reply, speak it, return to listening.
    async fn run_turn(self: Arc<Self>, input: String) {
        info!(session_id = %self.id, input = %input, "Processing transcript");
        self.recognition.stop_listening();
        self.synthesis.stop();
        self.set_status(SessionStatus::new("Processing...", StatusCategory::Loading));
        *self
            .last_processed
            .lock()
            .expect("processed mutex poisoned") = input.trim().to_string();
        self.publish();

        let reply = self.agent.generate_response(&input).await;
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        // The agent contract forbids empty replies, but a broken agent must
        // not leave the user in silence.
        let message = if reply.message.trim().is_empty() {
            warn!(session_id = %self.id, "Agent returned an empty reply, using fallback");
            FALLBACK_REPLY.to_string()
        } else {
            reply.message
        };

        *self.last_reply.lock().expect("reply mutex poisoned") = message.clone();
        self.emit(SessionEvent::ReplyGenerated {
            session_id: self.id,
            text: message.clone(),
            timestamp: Timestamp::now(),
        });

        if self.machine.transition(SessionState::Speaking).is_err() {
            // Session stopped while the agent was thinking.
            return;
        }
        self.set_status(SessionStatus::new("Speaking...", StatusCategory::Warning));
        self.emit(SessionEvent::SpeechStarted {
            session_id: self.id,
            timestamp: Timestamp::now(),
        });
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        self.synthesis.speak(&message).await;

        self.emit(SessionEvent::SpeechEnded {
            session_id: self.id,
            timestamp: Timestamp::now(),
        });
        if !self.active.load(Ordering::SeqCst) {
            return;
        }

        if self.machine.transition(SessionState::Listening).is_ok() {
            // A barge-in during playback may have parked a transcript.
            let pending = self.pending_final.lock().expect("pending mutex poisoned").take();
            match pending {
                Some(t) if t.is_dispatchable() && !self.is_duplicate(&t.text) => {
                    Arc::clone(&self).dispatch(t);
                }
                _ => {
                    self.recognition.reset_transcript();
                    self.set_status(SessionStatus::new(
                        "Listening...",
                        StatusCategory::Success,
                    ));
                    let delay = self.config.restart_delay();
                    Arc::clone(&self).schedule_listen(delay);
                }
            }
        }
        self.publish();
    }

    /// Arm a delayed listening (re)start, replacing any armed one.
    ///
    /// The task retries with the restart delay until a pass starts, the
    /// session leaves a listening-capable phase, or the session stops.
    fn schedule_listen(self: Arc<Self>, delay: Duration) {
        let inner = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            let mut wait = delay;
            loop {
                tokio::time::sleep(wait).await;
                if !inner.active.load(Ordering::SeqCst) {
                    return;
                }
                if !matches!(
                    inner.machine.current(),
                    SessionState::Starting | SessionState::Listening
                ) {
                    return;
                }
                let tx = match inner
                    .recognition_tx
                    .lock()
                    .expect("sender mutex poisoned")
                    .clone()
                {
                    Some(tx) => tx,
                    None => return,
                };
                match inner.recognition.start_listening(&tx).await {
                    Ok(()) => return,
                    Err(e) => {
                        warn!(session_id = %inner.id, error = %e, "Listen restart failed, retrying");
                        inner.set_status(SessionStatus::new(
                            "Microphone hiccup, retrying...",
                            StatusCategory::Warning,
                        ));
                        wait = inner.config.restart_delay();
                    }
                }
            }
        });
        let mut timer = self.restart_timer.lock().expect("timer mutex poisoned");
        if let Some(old) = timer.replace(handle) {
            old.abort();
        }
    }

    fn is_duplicate(&self, text: &str) -> bool {
        let last = self.last_processed.lock().expect("processed mutex poisoned");
        !last.is_empty() && last.as_str() == text.trim()
    }

    fn set_status(&self, status: SessionStatus) {
        debug!(status = %status.message, category = %status.category, "Session status");
        *self.status.lock().expect("status mutex poisoned") = status;
        self.publish();
    }

    fn emit(&self, event: SessionEvent) {
        debug!(event = event.event_name(), "Session event");
        // No receivers is fine; events are informational.
        let _ = self.events_tx.send(event);
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.make_snapshot());
    }

    fn make_snapshot(&self) -> SessionSnapshot {
        let state = self.machine.current();
        let status = self.status.lock().expect("status mutex poisoned").clone();
        SessionSnapshot {
            active: self.active.load(Ordering::SeqCst),
            state,
            listening: state == SessionState::Listening,
            processing: state == SessionState::Processing,
            speaking: state == SessionState::Speaking,
            status: status.message,
            status_category: status.category,
            transcript: self.recognition.transcript(),
            last_reply: self.last_reply.lock().expect("reply mutex poisoned").clone(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    use talkback_agent::ScriptedAgent;
    use talkback_speech::recognition::{ScriptedPass, ScriptedRecognition};
    use talkback_speech::synthesis::TimedSynthesis;

    fn fast_synthesis() -> TimedSynthesis {
        TimedSynthesis::new(Duration::from_millis(1))
    }

    fn agent(reply: &str) -> Arc<dyn ChatAgent> {
        Arc::new(ScriptedAgent::always(reply))
    }

    async fn wait_until<R, S>(
        session: &VoiceSession<R, S>,
        mut pred: impl FnMut(&SessionSnapshot) -> bool,
        what: &str,
    ) where
        R: RecognitionBackend + 'static,
        S: SynthesisBackend + 'static,
    {
        let deadline = Instant::now() + Duration::from_secs(3);
        loop {
            let snap = session.snapshot();
            if pred(&snap) {
                return;
            }
            if Instant::now() > deadline {
                panic!("timed out waiting for {what}; last snapshot: {snap:?}");
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_unsupported_recognition_fails_start() {
        let recognition = ScriptedRecognition::unsupported();
        let handle = recognition.clone();
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("x"),
            SessionConfig::fast(),
        );
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, TalkbackError::Unsupported(_)));

        let snap = session.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(snap.status, "Voice not supported");
        assert_eq!(snap.status_category, StatusCategory::Error);

        // The recognizer was never touched.
        assert_eq!(handle.permission_request_count(), 0);
        assert_eq!(handle.start_count(), 0);
    }

    #[tokio::test]
    async fn test_permission_denied_fails_start() {
        let session = VoiceSession::new(
            ScriptedRecognition::denying_permission(Vec::new()),
            fast_synthesis(),
            agent("x"),
            SessionConfig::fast(),
        );
        let err = session.start().await.unwrap_err();
        assert!(matches!(err, TalkbackError::PermissionDenied));

        let snap = session.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.status, "Microphone access denied");
        assert_eq!(snap.status_category, StatusCategory::Error);
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let recognition = ScriptedRecognition::new(vec![ScriptedPass::silence()]);
        let handle = recognition.clone();
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("x"),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        session.start().await.unwrap();
        assert_eq!(handle.permission_request_count(), 1);

        session.stop();
    }

    #[tokio::test]
    async fn test_full_turn_produces_reply() {
        let recognition =
            ScriptedRecognition::new(vec![ScriptedPass::utterance("what time is it")]);
        let synthesis = fast_synthesis();
        let synth_handle = synthesis.clone();
        let session = VoiceSession::new(
            recognition,
            synthesis,
            agent("It is noon."),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        wait_until(
            &session,
            |s| s.last_reply == "It is noon." && s.state == SessionState::Listening,
            "the turn to complete",
        )
        .await;

        assert_eq!(synth_handle.utterances(), vec!["It is noon.".to_string()]);
        session.stop();
    }

    #[tokio::test]
    async fn test_empty_agent_reply_uses_fallback() {
        let recognition = ScriptedRecognition::new(vec![ScriptedPass::utterance("hello")]);
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            Arc::new(ScriptedAgent::broken()),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        wait_until(
            &session,
            |s| s.last_reply == FALLBACK_REPLY,
            "the fallback reply",
        )
        .await;
        session.stop();
    }

    #[tokio::test]
    async fn test_silence_restarts_listening() {
        let recognition = ScriptedRecognition::new(vec![
            ScriptedPass::silence(),
            ScriptedPass::utterance("still here"),
        ]);
        let handle = recognition.clone();
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("Hello!"),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        wait_until(&session, |s| s.last_reply == "Hello!", "a reply after silence").await;

        assert!(handle.start_count() >= 2);
        session.stop();
    }

    #[tokio::test]
    async fn test_duplicate_final_is_skipped() {
        let recognition = ScriptedRecognition::new(vec![
            ScriptedPass::final_only("hello", 0.9),
            ScriptedPass::final_only("hello", 0.9),
            ScriptedPass::final_only("bye", 0.9),
        ]);
        let synthesis = fast_synthesis();
        let synth_handle = synthesis.clone();
        let agent = ScriptedAgent::new()
            .with_reply("hello", "Reply A")
            .with_reply("bye", "Reply B");
        let session = VoiceSession::new(
            recognition,
            synthesis,
            Arc::new(agent),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        wait_until(&session, |s| s.last_reply == "Reply B", "the third pass").await;

        let utterances = synth_handle.utterances();
        assert_eq!(
            utterances.iter().filter(|u| u.as_str() == "Reply A").count(),
            1,
            "duplicate transcript reached the agent: {utterances:?}"
        );
        session.stop();
    }

    #[tokio::test]
    async fn test_recognition_error_retries() {
        let recognition = ScriptedRecognition::new(vec![
            ScriptedPass::failure("no-speech"),
            ScriptedPass::utterance("hi"),
        ]);
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("Hello!"),
            SessionConfig::fast(),
        );
        let mut events = session.events();

        session.start().await.unwrap();
        wait_until(&session, |s| s.last_reply == "Hello!", "recovery after an error").await;

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if event.event_name() == "recognition_errored" {
                saw_error = true;
            }
        }
        assert!(saw_error);
        session.stop();
    }

    #[tokio::test]
    async fn test_stop_resets_everything() {
        let recognition = ScriptedRecognition::new(vec![ScriptedPass::utterance("hello")]);
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("Hi!"),
            SessionConfig::fast(),
        );

        session.start().await.unwrap();
        wait_until(&session, |s| s.last_reply == "Hi!", "the first turn").await;
        session.stop();

        let snap = session.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(snap.status, "Chat ended");
        assert_eq!(snap.status_category, StatusCategory::Warning);
        assert!(snap.transcript.is_empty());
        assert!(snap.last_reply.is_empty());

        // A second stop changes nothing.
        session.stop();
        assert_eq!(session.snapshot().status, "Chat ended");
    }

    #[tokio::test]
    async fn test_snapshot_before_start_is_ready() {
        let session = VoiceSession::new(
            ScriptedRecognition::new(Vec::new()),
            fast_synthesis(),
            agent("x"),
            SessionConfig::fast(),
        );
        let snap = session.snapshot();
        assert!(!snap.active);
        assert_eq!(snap.status, "Ready to chat");
        assert_eq!(snap.status_category, StatusCategory::Idle);
        assert!(session.is_supported());

        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"idle\""));
    }

    #[tokio::test]
    async fn test_session_events_cover_the_turn() {
        let recognition = ScriptedRecognition::new(vec![ScriptedPass::utterance("hello")]);
        let session = VoiceSession::new(
            recognition,
            fast_synthesis(),
            agent("Hi!"),
            SessionConfig::fast(),
        );
        let mut events = session.events();

        session.start().await.unwrap();
        wait_until(
            &session,
            |s| s.last_reply == "Hi!" && s.state == SessionState::Listening,
            "the turn to complete",
        )
        .await;
        session.stop();

        let mut names = Vec::new();
        while let Ok(event) = events.try_recv() {
            names.push(event.event_name());
        }
        for expected in [
            "session_started",
            "listening_started",
            "transcript_captured",
            "reply_generated",
            "speech_started",
            "speech_ended",
            "session_stopped",
        ] {
            assert!(names.contains(&expected), "missing {expected}: {names:?}");
        }
    }
}
