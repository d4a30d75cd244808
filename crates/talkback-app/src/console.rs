//! Terminal speech backends.
//!
//! The console stands in for a microphone and a speaker: a recognition pass
//! reads one line from its input and reports it as a final transcript, and
//! synthesis prints the reply while "playing" it for a duration proportional
//! to its length so barge-in and cancellation stay observable.
//!
//! End of input is terminal, not an error: the backend flags it, refuses
//! further passes, and `closed()` resolves so the composition root can stop
//! the session instead of retrying against a dead stream.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, Notify};
use tokio::task::JoinHandle;

use talkback_core::types::Transcript;
use talkback_speech::error::SpeechError;
use talkback_speech::recognition::{RecognitionBackend, RecognitionEvent};
use talkback_speech::synthesis::SynthesisBackend;

/// Recognition backend that captures one input line per pass.
#[derive(Clone)]
pub struct ConsoleRecognition {
    input: Arc<tokio::sync::Mutex<Box<dyn AsyncBufRead + Send + Unpin>>>,
    live: Arc<AtomicBool>,
    eof: Arc<AtomicBool>,
    eof_notify: Arc<Notify>,
    current_tx: Arc<Mutex<Option<mpsc::UnboundedSender<RecognitionEvent>>>>,
    pass_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl ConsoleRecognition {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }

    /// Build over any buffered async reader. Tests feed byte slices here.
    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Arc::new(tokio::sync::Mutex::new(Box::new(reader))),
            live: Arc::new(AtomicBool::new(false)),
            eof: Arc::new(AtomicBool::new(false)),
            eof_notify: Arc::new(Notify::new()),
            current_tx: Arc::new(Mutex::new(None)),
            pass_task: Arc::new(Mutex::new(None)),
        }
    }

    /// Whether the input stream has reached end of file.
    pub fn is_closed(&self) -> bool {
        self.eof.load(Ordering::SeqCst)
    }

    /// Resolves once the input stream reaches end of file.
    pub async fn closed(&self) {
        loop {
            let notified = self.eof_notify.notified();
            if self.eof.load(Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}

impl Default for ConsoleRecognition {
    fn default() -> Self {
        Self::new()
    }
}

impl RecognitionBackend for ConsoleRecognition {
    fn is_supported(&self) -> bool {
        true
    }

    async fn request_permission(&self) -> Result<(), SpeechError> {
        // The terminal is always ours to read.
        Ok(())
    }

    async fn start(
        &self,
        events: mpsc::UnboundedSender<RecognitionEvent>,
    ) -> Result<(), SpeechError> {
        if self.eof.load(Ordering::SeqCst) {
            return Err(SpeechError::Device("input closed".to_string()));
        }
        if self.live.swap(true, Ordering::SeqCst) {
            return Err(SpeechError::AlreadyStarted);
        }
        *self.current_tx.lock().expect("sender mutex poisoned") = Some(events.clone());

        let live = Arc::clone(&self.live);
        let eof = Arc::clone(&self.eof);
        let eof_notify = Arc::clone(&self.eof_notify);
        let input = Arc::clone(&self.input);
        let handle = tokio::spawn(async move {
            let _ = events.send(RecognitionEvent::Started);
            print!("you> ");
            let _ = std::io::stdout().flush();

            let mut line = String::new();
            let result = input.lock().await.read_line(&mut line).await;
            match result {
                Ok(0) => {
                    // End of input: flag it and end the pass quietly. The
                    // composition root decides what happens next.
                    eof.store(true, Ordering::SeqCst);
                    eof_notify.notify_waiters();
                    let _ = events.send(RecognitionEvent::Ended);
                }
                Ok(_) => {
                    let text = line.trim();
                    if !text.is_empty() {
                        let _ = events
                            .send(RecognitionEvent::Result(Transcript::final_result(text, 1.0)));
                    }
                    let _ = events.send(RecognitionEvent::Ended);
                }
                Err(e) => {
                    let _ = events.send(RecognitionEvent::Error(e.to_string()));
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

/// Synthesis backend that prints the reply and "plays" it in real time.
#[derive(Clone)]
pub struct ConsoleSynthesis {
    per_char: Duration,
    cancelled: Arc<Notify>,
}

impl ConsoleSynthesis {
    pub fn new(per_char: Duration) -> Self {
        Self {
            per_char,
            cancelled: Arc::new(Notify::new()),
        }
    }
}

impl Default for ConsoleSynthesis {
    fn default() -> Self {
        // Roughly conversational reading speed.
        Self::new(Duration::from_millis(40))
    }
}

impl SynthesisBackend for ConsoleSynthesis {
    fn is_supported(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str) -> Result<(), SpeechError> {
        println!("assistant> {text}");
        let duration = self.per_char * text.chars().count().max(1) as u32;
        tokio::select! {
            _ = tokio::time::sleep(duration) => {}
            _ = self.cancelled.notified() => {}
        }
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.notify_waiters();
    }
}

// =============================================================================
// Tests
// =============================================================================
