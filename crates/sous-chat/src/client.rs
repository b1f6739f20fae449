//! Streaming response client with single-shot fallback

use std::sync::Arc;

use async_stream::stream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::decoder::RecordDecoder;
use crate::error::Result;
use crate::stream::{ResponseEventStream, StreamEvent};
use crate::transport::{ChatEndpoints, ChatTransport, HttpTransport};
use crate::types::Turn;

/// Message of the `Error` event emitted when the single-shot call fails
pub const FALLBACK_FAILED_MESSAGE: &str = "Failed to send message. Please try again.";

/// Message of the `Error` event emitted when a stream closes without events
pub const EMPTY_STREAM_MESSAGE: &str = "The server closed the connection without a response.";

/// Sends turns and yields the decoded response events.
///
/// The client holds no conversation state; the caller threads the
/// conversation id from each `Response` into its next [`Turn`].
///
/// Fallback rules:
/// - the stream cannot be opened, or breaks before any bytes arrive:
///   the turn is sent once to the single-shot endpoint and exactly one
///   `Response` or `Error` is emitted
/// - the stream breaks after bytes arrived: one `Error`, no fallback
/// - the server requires authentication: one `Error` with
///   `reauthenticate` set, no fallback
#[derive(Clone)]
pub struct StreamingResponseClient {
    transport: Arc<dyn ChatTransport>,
}

impl StreamingResponseClient {
    /// Create a client over any transport
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self { transport }
    }

    /// Create a client talking HTTP to the given endpoints
    pub fn http(endpoints: ChatEndpoints) -> Self {
        Self::new(Arc::new(HttpTransport::new(endpoints)))
    }

    /// Send a turn. Fails with `Error::Validation` before any I/O if the
    /// turn has neither text nor attachment.
    pub fn send_turn(&self, turn: Turn) -> Result<ResponseEventStream> {
        self.send_turn_cancellable(turn, CancellationToken::new())
    }

    /// Send a turn; cancelling the token ends the sequence without further
    /// events and releases the transport.
    pub fn send_turn_cancellable(
        &self,
        turn: Turn,
        cancel: CancellationToken,
    ) -> Result<ResponseEventStream> {
        turn.validate()?;
        let transport = Arc::clone(&self.transport);

        Ok(Box::pin(stream! {
            let Some(opened) = cancel.run_until_cancelled(transport.open_stream(&turn)).await else {
                tracing::debug!("Turn cancelled before the stream opened");
                return;
            };

            let mut chunks = match opened {
                Ok(chunks) => chunks,
                Err(e) if e.is_auth_required() => {
                    yield StreamEvent::auth_required();
                    return;
                }
                Err(e) if e.allows_fallback() => {
                    tracing::warn!("Streaming failed, falling back to single-shot endpoint: {}", e);
                    if let Some(event) = cancel.run_until_cancelled(fallback(transport.as_ref(), &turn)).await {
                        yield event;
                    }
                    return;
                }
                Err(e) => {
                    tracing::warn!("Stream request rejected: {}", e);
                    yield StreamEvent::error(format!("Failed to send message: {e}"));
                    return;
                }
            };

            let mut decoder = RecordDecoder::new();
            let mut received_bytes = false;
            let mut responses = 0u32;
            let mut delivered = false;

            loop {
                let Some(next) = cancel.run_until_cancelled(chunks.next()).await else {
                    tracing::debug!("Turn cancelled while streaming");
                    return;
                };

                match next {
                    Some(Ok(chunk)) => {
                        received_bytes |= !chunk.is_empty();
                        for event in decoder.feed(&chunk) {
                            track_response(&event, &mut responses);
                            delivered = true;
                            yield event;
                        }
                    }
                    Some(Err(e)) if !received_bytes => {
                        tracing::warn!("Stream failed before any data, falling back: {}", e);
                        if let Some(event) = cancel.run_until_cancelled(fallback(transport.as_ref(), &turn)).await {
                            yield event;
                        }
                        return;
                    }
                    Some(Err(e)) => {
                        tracing::warn!("Stream failed after partial data: {}", e);
                        yield StreamEvent::error(format!("Connection lost while receiving the response: {e}"));
                        return;
                    }
                    None => break,
                }
            }

            for event in decoder.finish() {
                track_response(&event, &mut responses);
                delivered = true;
                yield event;
            }

            if !delivered {
                tracing::warn!("Response stream closed without any events");
                yield StreamEvent::error(EMPTY_STREAM_MESSAGE);
                return;
            }
            tracing::debug!("Response stream closed");
        }))
    }
}

/// The server sends at most one `Response` per stream. If it sends more,
/// every one is passed through and the last conversation id wins.
fn track_response(event: &StreamEvent, seen: &mut u32) {
    if matches!(event, StreamEvent::Response { .. }) {
        *seen += 1;
        if *seen > 1 {
            tracing::warn!("Stream delivered {} response events; last one wins", seen);
        }
    }
}

async fn fallback(transport: &dyn ChatTransport, turn: &Turn) -> StreamEvent {
    match transport.send_single(turn).await {
        Ok(reply) => StreamEvent::Response {
            content: reply.response,
            conversation_id: reply.thread_id,
        },
        Err(e) if e.is_auth_required() => StreamEvent::auth_required(),
        Err(e) => {
            tracing::warn!("Single-shot request failed: {}", e);
            StreamEvent::error(FALLBACK_FAILED_MESSAGE)
        }
    }
}
