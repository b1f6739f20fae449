//! Capability errors reported by a speech recognizer

use serde::Serialize;
use thiserror::Error;

/// Failures a recognizer reports while probing or capturing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The connection to the recognition service dropped
    #[error("network interruption to the recognition service")]
    Network,

    /// Microphone permission was refused or revoked
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No capture device is present
    #[error("no microphone found")]
    NoMicrophone,

    /// The recognition service refused this kind of request
    #[error("recognition service rejected the request")]
    ServiceNotAllowed,

    /// Anything else, keeping the recognizer's own code
    #[error("recognition error: {0}")]
    Other(String),
}

impl CapabilityError {
    /// Parse a recognizer error code (e.g. "network", "audio-capture")
    pub fn from_code(code: &str) -> Self {
        match code {
            "network" => Self::Network,
            "not-allowed" | "permission-denied" => Self::PermissionDenied,
            "audio-capture" => Self::NoMicrophone,
            "service-not-allowed" => Self::ServiceNotAllowed,
            other => Self::Other(other.to_string()),
        }
    }

    /// Network- or service-type failure; a probe hitting one of these
    /// marks voice input unavailable
    pub fn is_service_failure(&self) -> bool {
        matches!(self, Self::Network | Self::ServiceNotAllowed)
    }

    /// How a failure during capture affects the session
    pub fn classify(&self) -> FailureClass {
        match self {
            Self::Network => FailureClass::Transient,
            Self::PermissionDenied => FailureClass::Fatal(DisabledReason::PermissionDenied),
            Self::NoMicrophone => FailureClass::Fatal(DisabledReason::NoMicrophone),
            Self::ServiceNotAllowed => FailureClass::Fatal(DisabledReason::ServiceRejected),
            Self::Other(_) => FailureClass::Recoverable,
        }
    }
}

/// Effect class of a capture failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Retry automatically after a delay
    Transient,
    /// Disable voice input for the rest of the session
    Fatal(DisabledReason),
    /// Report the error and return to armed
    Recoverable,
}

/// Why voice input was disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DisabledReason {
    /// Capture API missing, unreliable environment, or the live test failed
    Unsupported,
    PermissionDenied,
    NoMicrophone,
    /// The service refused the request outright
    ServiceRejected,
    /// Transient failures exhausted every retry
    ServiceUnavailable,
}

impl DisabledReason {
    /// User-facing explanation
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unsupported => "Speech recognition is not available in this browser",
            Self::PermissionDenied => {
                "Microphone access was denied. Please enable it in your browser settings."
            }
            Self::NoMicrophone => {
                "No microphone was found. Please ensure a microphone is connected."
            }
            Self::ServiceRejected => {
                "Speech recognition service is not available. Please try again later."
            }
            Self::ServiceUnavailable => {
                "Speech recognition service is currently unavailable. Please try again later or use text input."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_code() {
        assert_eq!(CapabilityError::from_code("network"), CapabilityError::Network);
        assert_eq!(
            CapabilityError::from_code("not-allowed"),
            CapabilityError::PermissionDenied
        );
        assert_eq!(
            CapabilityError::from_code("permission-denied"),
            CapabilityError::PermissionDenied
        );
        assert_eq!(
            CapabilityError::from_code("audio-capture"),
            CapabilityError::NoMicrophone
        );
        assert_eq!(
            CapabilityError::from_code("service-not-allowed"),
            CapabilityError::ServiceNotAllowed
        );
        assert_eq!(
            CapabilityError::from_code("no-speech"),
            CapabilityError::Other("no-speech".into())
        );
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(CapabilityError::Network.classify(), FailureClass::Transient);
        assert_eq!(
            CapabilityError::PermissionDenied.classify(),
            FailureClass::Fatal(DisabledReason::PermissionDenied)
        );
        assert_eq!(
            CapabilityError::NoMicrophone.classify(),
            FailureClass::Fatal(DisabledReason::NoMicrophone)
        );
        assert_eq!(
            CapabilityError::ServiceNotAllowed.classify(),
            FailureClass::Fatal(DisabledReason::ServiceRejected)
        );
        assert_eq!(
            CapabilityError::Other("aborted".into()).classify(),
            FailureClass::Recoverable
        );
    }

    #[test]
    fn test_service_failures() {
        assert!(CapabilityError::Network.is_service_failure());
        assert!(CapabilityError::ServiceNotAllowed.is_service_failure());
        assert!(!CapabilityError::NoMicrophone.is_service_failure());
        assert!(!CapabilityError::Other("aborted".into()).is_service_failure());
    }

    #[test]
    fn test_reason_messages_name_the_fix() {
        assert!(DisabledReason::PermissionDenied.message().contains("settings"));
        assert!(DisabledReason::NoMicrophone.message().contains("No microphone"));
        assert!(DisabledReason::ServiceUnavailable.message().contains("unavailable"));
    }
}
