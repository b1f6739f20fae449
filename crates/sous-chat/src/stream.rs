//! Stream event types

use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

use crate::error::AUTH_REQUIRED_MESSAGE;

/// How long a UI should keep a `ToolComplete` notice on screen
pub const TOOL_COMPLETE_DISPLAY: Duration = Duration::from_millis(2000);

/// Events decoded from a response stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Informational progress
    Status { message: String },
    /// The backend is searching the user's recipes
    RecipeSearch { message: String },
    /// A backend action started
    ToolUse { message: String },
    /// A backend action finished
    ToolComplete { message: String },
    /// Full assistant message plus the authoritative conversation id
    Response {
        content: String,
        #[serde(rename = "thread_id")]
        conversation_id: String,
    },
    /// Stream completion marker
    End,
    /// Server- or client-reported failure
    Error {
        message: String,
        /// Set when the caller has to sign in again before resending
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        reauthenticate: bool,
    },
    /// A record with a tag this client does not know
    Unknown { raw: String },
}

impl StreamEvent {
    /// Tags that decode into a typed variant
    pub(crate) const KNOWN_KINDS: [&'static str; 7] = [
        "status",
        "recipe_search",
        "tool_use",
        "tool_complete",
        "response",
        "end",
        "error",
    ];

    /// Create an error event
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            reauthenticate: false,
        }
    }

    /// Create the error event for an expired session
    pub fn auth_required() -> Self {
        Self::Error {
            message: AUTH_REQUIRED_MESSAGE.to_string(),
            reauthenticate: true,
        }
    }

    /// Check if this is a terminal event (End or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::End | StreamEvent::Error { .. })
    }

    /// Check if this is an ephemeral progress notice
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            StreamEvent::Status { .. }
                | StreamEvent::RecipeSearch { .. }
                | StreamEvent::ToolUse { .. }
                | StreamEvent::ToolComplete { .. }
        )
    }

    /// How long the UI should show this event before dismissing it
    pub fn auto_dismiss_after(&self) -> Option<Duration> {
        match self {
            StreamEvent::ToolComplete { .. } => Some(TOOL_COMPLETE_DISPLAY),
            _ => None,
        }
    }

    /// Conversation id carried by a `Response`
    pub fn conversation_id(&self) -> Option<&str> {
        match self {
            StreamEvent::Response {
                conversation_id, ..
            } => Some(conversation_id),
            _ => None,
        }
    }

    /// Short tag name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            StreamEvent::Status { .. } => "status",
            StreamEvent::RecipeSearch { .. } => "recipe_search",
            StreamEvent::ToolUse { .. } => "tool_use",
            StreamEvent::ToolComplete { .. } => "tool_complete",
            StreamEvent::Response { .. } => "response",
            StreamEvent::End => "end",
            StreamEvent::Error { .. } => "error",
            StreamEvent::Unknown { .. } => "unknown",
        }
    }
}

/// A stream of decoded response events
pub type ResponseEventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;
