//! sous-voice: voice input controller
//!
//! Probes whether speech capture works in the host environment, exposes
//! an enabled/disabled affordance, and manages one capture session at a
//! time with automatic retry on transient failures.

pub mod capability;
pub mod controller;
pub mod error;
pub mod session;

pub use capability::{Availability, Environment, SpeechRecognizer};
pub use controller::{RecognizerEvent, VoiceHandle, VoiceInputController, VoiceUpdate};
pub use error::{CapabilityError, DisabledReason, FailureClass};
pub use session::{VoiceConfig, VoiceSession, VoiceSnapshot, VoiceState};
