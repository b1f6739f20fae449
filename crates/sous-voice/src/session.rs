//! Voice session state machine
//!
//! Pure transitions: [`VoiceSession::apply`] takes one input and returns the
//! effects the controller must carry out. No I/O or timers live here.

use serde::Serialize;
use std::time::Duration;

use crate::capability::Availability;
use crate::error::{CapabilityError, DisabledReason, FailureClass};

/// Shown when an unrecognized failure ends a capture session
pub const GENERIC_FAILURE_MESSAGE: &str = "Speech recognition error. Please try again.";

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceConfig {
    /// Consecutive transient failures that disable voice input
    pub max_attempts: u8,
    /// Delay before an automatic restart
    pub retry_delay: Duration,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay: Duration::from_millis(2000),
        }
    }
}

/// State of the voice input affordance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VoiceState {
    Idle,
    Probing,
    Armed,
    Recording,
    Retrying { attempt: u8 },
    /// Terminal for the rest of the session
    Disabled { reason: DisabledReason },
}

impl VoiceState {
    /// Whether the UI should offer the microphone control
    pub fn is_enabled(&self) -> bool {
        !matches!(self, VoiceState::Probing | VoiceState::Disabled { .. })
    }
}

/// Pollable view of the controller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VoiceSnapshot {
    #[serde(flatten)]
    pub state: VoiceState,
    /// Human-readable reason for the state, if any
    pub message: Option<String>,
}

impl Default for VoiceSnapshot {
    fn default() -> Self {
        Self {
            state: VoiceState::Idle,
            message: None,
        }
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceInput {
    /// The UI wants voice input available
    Activate,
    /// The user pressed the microphone control
    Toggle,
    Probed(Availability),
    Permission(bool),
    Transcript(String),
    Failed(CapabilityError),
    /// The capture session ended without error
    Ended,
    RetryElapsed,
    Teardown,
}

/// Work the controller performs after a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StateChanged(VoiceSnapshot),
    RunProbe,
    RequestPermission,
    StartCapture,
    StopCapture,
    ScheduleRetry(Duration),
    CancelRetry,
    Transcript(String),
    Notify(String),
}

/// One page session's worth of voice input state
#[derive(Debug)]
pub struct VoiceSession {
    config: VoiceConfig,
    state: VoiceState,
    /// Consecutive transient failures in the current armed session
    attempt: u8,
    /// Probe and permission already succeeded once
    verified: bool,
    /// A start was requested before arming finished
    start_when_armed: bool,
}

impl VoiceSession {
    pub fn new(config: VoiceConfig) -> Self {
        Self {
            config,
            state: VoiceState::Idle,
            attempt: 0,
            verified: false,
            start_when_armed: false,
        }
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn attempt(&self) -> u8 {
        self.attempt
    }

    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Snapshot of a state with its user-facing message
    pub fn snapshot_of(&self, state: VoiceState) -> VoiceSnapshot {
        let message = match state {
            VoiceState::Probing => Some("Testing speech recognition...".to_string()),
            VoiceState::Retrying { attempt } => Some(format!(
                "Speech recognition error. Retrying ({}/{})...",
                attempt, self.config.max_attempts
            )),
            VoiceState::Disabled { reason } => Some(reason.message().to_string()),
            _ => None,
        };
        VoiceSnapshot { state, message }
    }

    /// Apply one input and return the resulting effects in order
    pub fn apply(&mut self, input: VoiceInput) -> Vec<Effect> {
        let mut fx = Vec::new();

        match (self.state, input) {
            (VoiceState::Disabled { .. }, VoiceInput::Teardown) => {
                fx.push(Effect::CancelRetry);
            }
            (VoiceState::Disabled { .. }, input) => {
                tracing::debug!("Voice input disabled, ignoring {:?}", input);
            }
            (state, VoiceInput::Teardown) => {
                fx.push(Effect::CancelRetry);
                if state == VoiceState::Recording {
                    fx.push(Effect::StopCapture);
                }
                self.set(VoiceState::Idle, &mut fx);
            }

            (VoiceState::Idle, VoiceInput::Activate) => self.arm(false, &mut fx),
            (VoiceState::Idle, VoiceInput::Toggle) => self.arm(true, &mut fx),

            (VoiceState::Probing, VoiceInput::Probed(Availability::Available)) => {
                fx.push(Effect::RequestPermission);
            }
            (VoiceState::Probing, VoiceInput::Probed(_)) => {
                self.disable(DisabledReason::Unsupported, &mut fx);
            }
            (VoiceState::Probing, VoiceInput::Permission(true)) => {
                self.verified = true;
                self.set(VoiceState::Armed, &mut fx);
                if std::mem::take(&mut self.start_when_armed) {
                    self.manual_start(&mut fx);
                }
            }
            (VoiceState::Probing, VoiceInput::Permission(false)) => {
                self.disable(DisabledReason::PermissionDenied, &mut fx);
            }

            (VoiceState::Armed, VoiceInput::Toggle) => self.manual_start(&mut fx),
            (VoiceState::Retrying { .. }, VoiceInput::Toggle) => {
                fx.push(Effect::CancelRetry);
                self.manual_start(&mut fx);
            }
            (VoiceState::Recording, VoiceInput::Toggle) => {
                fx.push(Effect::StopCapture);
                self.set(VoiceState::Idle, &mut fx);
            }

            (VoiceState::Recording, VoiceInput::Transcript(text)) => {
                self.attempt = 0;
                fx.push(Effect::Transcript(text));
                self.set(VoiceState::Armed, &mut fx);
            }
            (_, VoiceInput::Transcript(text)) => {
                // Late result after an explicit stop
                self.attempt = 0;
                fx.push(Effect::Transcript(text));
            }

            (VoiceState::Recording, VoiceInput::Failed(error)) => self.fail(error, &mut fx),

            (VoiceState::Recording | VoiceState::Armed, VoiceInput::Ended) => {
                self.set(VoiceState::Idle, &mut fx);
            }

            (VoiceState::Retrying { .. }, VoiceInput::RetryElapsed) => {
                self.set(VoiceState::Recording, &mut fx);
                fx.push(Effect::StartCapture);
            }

            (state, input) => {
                tracing::debug!("No transition from {:?} on {:?}", state, input);
            }
        }

        fx
    }

    fn set(&mut self, state: VoiceState, fx: &mut Vec<Effect>) {
        if self.state != state {
            tracing::debug!("Voice state {:?} -> {:?}", self.state, state);
            self.state = state;
            fx.push(Effect::StateChanged(self.snapshot_of(state)));
        }
    }

    fn arm(&mut self, start: bool, fx: &mut Vec<Effect>) {
        if self.verified {
            self.set(VoiceState::Armed, fx);
            if start {
                self.manual_start(fx);
            }
        } else {
            self.start_when_armed = start;
            self.set(VoiceState::Probing, fx);
            fx.push(Effect::RunProbe);
        }
    }

    /// User intent overrides retry bookkeeping
    fn manual_start(&mut self, fx: &mut Vec<Effect>) {
        self.attempt = 0;
        self.set(VoiceState::Recording, fx);
        fx.push(Effect::StartCapture);
    }

    fn disable(&mut self, reason: DisabledReason, fx: &mut Vec<Effect>) {
        self.attempt = 0;
        fx.push(Effect::CancelRetry);
        self.set(VoiceState::Disabled { reason }, fx);
        fx.push(Effect::Notify(reason.message().to_string()));
    }

    fn fail(&mut self, error: CapabilityError, fx: &mut Vec<Effect>) {
        tracing::warn!("Speech recognition error: {}", error);

        match error.classify() {
            FailureClass::Transient => {
                self.attempt = self.attempt.saturating_add(1);
                let attempt = self.attempt;
                self.set(VoiceState::Retrying { attempt }, fx);

                if attempt >= self.config.max_attempts {
                    self.disable(DisabledReason::ServiceUnavailable, fx);
                } else {
                    if let Some(message) = self.snapshot_of(self.state).message {
                        fx.push(Effect::Notify(message));
                    }
                    fx.push(Effect::ScheduleRetry(self.config.retry_delay));
                }
            }
            FailureClass::Fatal(reason) => self.disable(reason, fx),
            FailureClass::Recoverable => {
                fx.push(Effect::Notify(GENERIC_FAILURE_MESSAGE.to_string()));
                self.set(VoiceState::Armed, fx);
            }
        }
    }
}
