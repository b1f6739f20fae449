//! Error types for sous-chat

use thiserror::Error;

/// Result type alias using sous-chat Error
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown when the server asks the caller to sign in again
pub const AUTH_REQUIRED_MESSAGE: &str = "Session expired. Please login again.";

/// Errors that can occur while sending a turn
#[derive(Error, Debug)]
pub enum Error {
    /// The turn was rejected before any network activity
    #[error("Invalid turn: {0}")]
    Validation(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The byte stream broke or could not be opened
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server requires the caller to authenticate again
    #[error("Authentication required")]
    AuthRequired,

    /// Server answered with a non-success status
    #[error("Server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// A single stream record could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a status error, mapping 401 to `AuthRequired`
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        if status == 401 {
            return Self::AuthRequired;
        }
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check if this error means the caller must sign in again
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Error::AuthRequired)
    }

    /// Check if a failure at stream open may be served by the single-shot
    /// endpoint. A status response means the server saw the turn, so only
    /// failures that never reached it qualify.
    pub fn allows_fallback(&self) -> bool {
        match self {
            Error::Http(e) => !e.is_status(),
            Error::Transport(_) => true,
            Error::Validation(_)
            | Error::AuthRequired
            | Error::Status { .. }
            | Error::Decode(_)
            | Error::Json(_)
            | Error::InvalidConfig(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_401_is_auth_required() {
        let e = Error::status(401, "unauthorized");
        assert!(e.is_auth_required());
        assert!(!e.allows_fallback());
    }

    #[test]
    fn test_status_500_does_not_fall_back() {
        let e = Error::status(500, "boom");
        assert!(!e.is_auth_required());
        assert!(!e.allows_fallback());
        assert_eq!(e.to_string(), "Server returned status 500: boom");
    }

    #[test]
    fn test_transport_allows_fallback() {
        assert!(Error::Transport("connection reset".into()).allows_fallback());
    }

    #[test]
    fn test_validation_and_decode_never_fall_back() {
        assert!(!Error::Validation("empty".into()).allows_fallback());
        assert!(!Error::Decode("bad json".into()).allows_fallback());
    }

    #[test]
    fn test_client_error_statuses_do_not_fall_back() {
        for status in [400, 413, 422, 503] {
            assert!(!Error::status(status, "").allows_fallback(), "status {status}");
        }
    }
}
