//! sous-chat: streaming chat client
//!
//! Sends a user turn to a server that answers with newline-delimited
//! `data: ` records, decodes those records into [`StreamEvent`]s as bytes
//! arrive, and falls back to a single-shot endpoint when the stream
//! cannot be used.

pub mod client;
pub mod decoder;
pub mod error;
pub mod stream;
pub mod transport;
pub mod types;

pub use client::StreamingResponseClient;
pub use decoder::RecordDecoder;
pub use error::{Error, Result};
pub use stream::{ResponseEventStream, StreamEvent};
pub use transport::{ByteStream, ChatEndpoints, ChatTransport, HttpTransport};
pub use types::{Attachment, FallbackReply, Turn};
