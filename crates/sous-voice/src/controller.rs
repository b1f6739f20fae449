//! Voice input controller: runs the session state machine on one task

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use crate::capability::{SpeechRecognizer, probe};
use crate::error::CapabilityError;
use crate::session::{Effect, VoiceConfig, VoiceInput, VoiceSession, VoiceSnapshot};

/// Notifications for the UI
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceUpdate {
    /// The state changed
    State(VoiceSnapshot),
    /// Recognized text for the input field
    Transcript(String),
    /// A message to show the user
    Message(String),
}

/// What the platform recognizer reports during a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognizerEvent {
    Transcript(String),
    Error(CapabilityError),
    /// End of utterance or explicit stop, without error
    End,
}

enum Command {
    Input(VoiceInput),
    RetryDue(u64),
}

/// A cloneable handle to a running [`VoiceInputController`].
///
/// Only the controller changes the session state; the handle forwards
/// user intent and recognizer reports.
#[derive(Clone)]
pub struct VoiceHandle {
    tx: mpsc::UnboundedSender<Command>,
    updates: broadcast::Sender<VoiceUpdate>,
    snapshot: Arc<Mutex<VoiceSnapshot>>,
    shutdown: CancellationToken,
}

impl VoiceHandle {
    /// Make voice input available (probe and ask for permission if needed)
    pub fn activate(&self) {
        self.send(VoiceInput::Activate);
    }

    /// Microphone control pressed: start when armed, stop when recording
    pub fn toggle(&self) {
        self.send(VoiceInput::Toggle);
    }

    /// Forward an event from the platform recognizer
    pub fn report(&self, event: RecognizerEvent) {
        self.send(match event {
            RecognizerEvent::Transcript(text) => VoiceInput::Transcript(text),
            RecognizerEvent::Error(error) => VoiceInput::Failed(error),
            RecognizerEvent::End => VoiceInput::Ended,
        });
    }

    /// Current state and message
    pub fn snapshot(&self) -> VoiceSnapshot {
        self.snapshot.lock().clone()
    }

    /// Subscribe to state changes, transcripts, and messages
    pub fn subscribe(&self) -> broadcast::Receiver<VoiceUpdate> {
        self.updates.subscribe()
    }

    /// Tear the controller down, cancelling any pending retry
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn send(&self, input: VoiceInput) {
        if self.tx.send(Command::Input(input)).is_err() {
            tracing::debug!("Voice controller already stopped");
        }
    }
}

/// Owns the session, the recognizer, and the retry timer
pub struct VoiceInputController {
    session: VoiceSession,
    recognizer: Arc<dyn SpeechRecognizer>,
    inbox: mpsc::WeakUnboundedSender<Command>,
    updates: broadcast::Sender<VoiceUpdate>,
    snapshot: Arc<Mutex<VoiceSnapshot>>,
    shutdown: CancellationToken,
    retry: Option<(u64, CancellationToken)>,
    next_ticket: u64,
}

impl VoiceInputController {
    /// Start the controller on the current tokio runtime
    pub fn spawn(recognizer: Arc<dyn SpeechRecognizer>, config: VoiceConfig) -> VoiceHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(64);
        let snapshot = Arc::new(Mutex::new(VoiceSnapshot::default()));
        let shutdown = CancellationToken::new();

        let controller = Self {
            session: VoiceSession::new(config),
            recognizer,
            inbox: tx.downgrade(),
            updates: updates.clone(),
            snapshot: Arc::clone(&snapshot),
            shutdown: shutdown.clone(),
            retry: None,
            next_ticket: 0,
        };
        tokio::spawn(controller.run(rx));

        VoiceHandle {
            tx,
            updates,
            snapshot,
            shutdown,
        }
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        let shutdown = self.shutdown.clone();
        while let Some(Some(command)) = shutdown.run_until_cancelled(rx.recv()).await {
            match command {
                Command::Input(input) => self.dispatch(input).await,
                Command::RetryDue(ticket) => {
                    if self.retry.as_ref().is_some_and(|(t, _)| *t == ticket) {
                        self.retry = None;
                        self.dispatch(VoiceInput::RetryElapsed).await;
                    } else {
                        tracing::debug!("Dropping stale retry {}", ticket);
                    }
                }
            }
        }

        self.dispatch(VoiceInput::Teardown).await;
        tracing::debug!("Voice controller stopped");
    }

    async fn dispatch(&mut self, input: VoiceInput) {
        let mut pending = VecDeque::from([input]);
        while let Some(input) = pending.pop_front() {
            for effect in self.session.apply(input) {
                if let Some(next) = self.perform(effect).await {
                    pending.push_back(next);
                }
            }
        }
    }

    /// Carry out one effect; some effects produce a follow-up input
    async fn perform(&mut self, effect: Effect) -> Option<VoiceInput> {
        match effect {
            Effect::StateChanged(snapshot) => {
                *self.snapshot.lock() = snapshot.clone();
                let _ = self.updates.send(VoiceUpdate::State(snapshot));
                None
            }
            Effect::RunProbe => {
                let probed = self
                    .shutdown
                    .run_until_cancelled(probe(self.recognizer.as_ref()))
                    .await;
                if probed.is_none() {
                    tracing::debug!("Shutdown while probing");
                }
                probed.map(VoiceInput::Probed)
            }
            Effect::RequestPermission => {
                let granted = self
                    .shutdown
                    .run_until_cancelled(self.recognizer.request_permission())
                    .await;
                if granted.is_none() {
                    tracing::debug!("Shutdown while waiting for microphone permission");
                }
                granted.map(VoiceInput::Permission)
            }
            Effect::StartCapture => match self.recognizer.start() {
                Ok(()) => None,
                Err(e) => Some(VoiceInput::Failed(e)),
            },
            Effect::StopCapture => {
                self.recognizer.stop();
                None
            }
            Effect::ScheduleRetry(delay) => {
                self.schedule_retry(delay);
                None
            }
            Effect::CancelRetry => {
                if let Some((_, token)) = self.retry.take() {
                    token.cancel();
                }
                None
            }
            Effect::Transcript(text) => {
                let _ = self.updates.send(VoiceUpdate::Transcript(text));
                None
            }
            Effect::Notify(message) => {
                let _ = self.updates.send(VoiceUpdate::Message(message));
                None
            }
        }
    }

    fn schedule_retry(&mut self, delay: Duration) {
        if let Some((_, token)) = self.retry.take() {
            token.cancel();
        }
        self.next_ticket += 1;
        let ticket = self.next_ticket;
        let token = self.shutdown.child_token();
        let cancel = token.clone();
        let inbox = self.inbox.clone();

        tokio::spawn(async move {
            if cancel.run_until_cancelled(tokio::time::sleep(delay)).await.is_none() {
                return;
            }
            if let Some(tx) = inbox.upgrade() {
                let _ = tx.send(Command::RetryDue(ticket));
            }
        });

        tracing::debug!("Retry {} scheduled in {:?}", ticket, delay);
        self.retry = Some((ticket, token));
    }
}
