//! Outbound turn types and the single-shot reply shape

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Binary payload sent alongside a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    /// Raw bytes
    pub bytes: Vec<u8>,
    /// Declared media type (e.g. "image/png")
    pub media_type: String,
    /// File name reported to the server
    pub file_name: Option<String>,
}

impl Attachment {
    /// Create an attachment from bytes and a media type
    pub fn new(bytes: Vec<u8>, media_type: impl Into<String>) -> Self {
        Self {
            bytes,
            media_type: media_type.into(),
            file_name: None,
        }
    }

    /// Set the file name
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// Check if the attachment carries no bytes
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// One outbound user submission.
///
/// `conversation_id` is `None` to start a new conversation. A turn is
/// consumed by [`crate::StreamingResponseClient::send_turn`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Turn {
    pub text: String,
    pub attachment: Option<Attachment>,
    pub conversation_id: Option<String>,
}

impl Turn {
    /// Create a text-only turn
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attach a binary payload
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    /// Continue an existing conversation
    pub fn in_conversation(mut self, id: Option<String>) -> Self {
        self.conversation_id = id;
        self
    }

    /// Check that the turn has something to send
    pub fn validate(&self) -> Result<()> {
        let has_text = !self.text.trim().is_empty();
        let has_attachment = self.attachment.as_ref().is_some_and(|a| !a.is_empty());
        if has_text || has_attachment {
            Ok(())
        } else {
            Err(Error::Validation(
                "turn has neither text nor an attachment".to_string(),
            ))
        }
    }

    /// JSON descriptor carried in the `message` form part
    pub fn descriptor(&self) -> TurnDescriptor<'_> {
        TurnDescriptor {
            message: self.text.trim(),
            thread_id: self.conversation_id.as_deref(),
        }
    }
}

/// Wire form of a turn's text fields
#[derive(Debug, Serialize)]
pub struct TurnDescriptor<'a> {
    pub message: &'a str,
    pub thread_id: Option<&'a str>,
}

/// Body returned by the single-shot endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackReply {
    pub response: String,
    pub thread_id: String,
}
