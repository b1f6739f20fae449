//! Transport abstraction for the streaming and single-shot endpoints

use std::pin::Pin;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use tokio_stream::Stream;

use crate::error::{Error, Result};
use crate::types::{FallbackReply, Turn};

/// Raw body chunks of an open response stream
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Transport used by [`crate::StreamingResponseClient`]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Open the streaming endpoint for a turn
    async fn open_stream(&self, turn: &Turn) -> Result<ByteStream>;

    /// Send a turn to the single-shot endpoint
    async fn send_single(&self, turn: &Turn) -> Result<FallbackReply>;
}

/// Server location and endpoint paths
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatEndpoints {
    /// Base URL (e.g. "http://localhost:8000")
    pub base_url: String,
    /// Path of the streaming endpoint
    pub stream_path: String,
    /// Path of the single-shot endpoint
    pub fallback_path: String,
}

impl ChatEndpoints {
    /// Create endpoints with the default paths
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Full URL of the streaming endpoint
    pub fn stream_url(&self) -> String {
        join_url(&self.base_url, &self.stream_path)
    }

    /// Full URL of the single-shot endpoint
    pub fn fallback_url(&self) -> String {
        join_url(&self.base_url, &self.fallback_path)
    }
}

impl Default for ChatEndpoints {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            stream_path: "/chat/stream".to_string(),
            fallback_path: "/chat".to_string(),
        }
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// HTTP transport sending multipart turns with reqwest
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: ChatEndpoints,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Create a transport for the given endpoints
    pub fn new(endpoints: ChatEndpoints) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoints,
            headers: HeaderMap::new(),
        }
    }

    /// Send an extra header with every request (e.g. a session cookie)
    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self> {
        let name = name
            .parse::<HeaderName>()
            .map_err(|e| Error::InvalidConfig(format!("header name {name:?}: {e}")))?;
        let value = value
            .parse::<HeaderValue>()
            .map_err(|e| Error::InvalidConfig(format!("header value for {name}: {e}")))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Endpoints this transport talks to
    pub fn endpoints(&self) -> &ChatEndpoints {
        &self.endpoints
    }

    async fn post(&self, url: &str, turn: &Turn) -> Result<reqwest::Response> {
        let response = self
            .client
            .post(url)
            .headers(self.headers.clone())
            .multipart(build_form(turn)?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), body));
        }
        Ok(response)
    }
}

fn build_form(turn: &Turn) -> Result<Form> {
    let descriptor = serde_json::to_string(&turn.descriptor())?;
    let mut form = Form::new().text("message", descriptor);

    if let Some(attachment) = &turn.attachment {
        let file_name = attachment
            .file_name
            .clone()
            .unwrap_or_else(|| "attachment".to_string());
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(file_name)
            .mime_str(&attachment.media_type)
            .map_err(|e| {
                Error::Validation(format!("media type {:?}: {e}", attachment.media_type))
            })?;
        form = form.part("attachment", part);
    }

    Ok(form)
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn open_stream(&self, turn: &Turn) -> Result<ByteStream> {
        let url = self.endpoints.stream_url();
        tracing::debug!("Opening response stream: {}", url);

        let response = self.post(&url, turn).await?;
        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(Error::from));
        Ok(Box::pin(chunks))
    }

    async fn send_single(&self, turn: &Turn) -> Result<FallbackReply> {
        let url = self.endpoints.fallback_url();
        tracing::debug!("Sending single-shot request: {}", url);

        let response = self.post(&url, turn).await?;
        Ok(response.json::<FallbackReply>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_endpoints() {
        let endpoints = ChatEndpoints::new("http://localhost:8000/");
        assert_eq!(endpoints.stream_url(), "http://localhost:8000/chat/stream");
        assert_eq!(endpoints.fallback_url(), "http://localhost:8000/chat");
    }

    #[test]
    fn test_custom_paths_join_cleanly() {
        let endpoints = ChatEndpoints {
            base_url: "https://cook.example.com/api".into(),
            stream_path: "v2/stream".into(),
            fallback_path: "/v2/chat".into(),
        };
        assert_eq!(endpoints.stream_url(), "https://cook.example.com/api/v2/stream");
        assert_eq!(endpoints.fallback_url(), "https://cook.example.com/api/v2/chat");
    }

    #[test]
    fn test_with_header_rejects_invalid_name() {
        let result = HttpTransport::new(ChatEndpoints::default()).with_header("bad header", "x");
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_with_header_accepts_cookie() {
        let transport = HttpTransport::new(ChatEndpoints::default())
            .with_header("cookie", "session=abc123")
            .unwrap();
        assert_eq!(transport.headers.get("cookie").unwrap(), "session=abc123");
    }

    #[test]
    fn test_build_form_rejects_bad_media_type() {
        let turn = Turn::new("").with_attachment(crate::Attachment::new(vec![1], "not a mime"));
        assert!(matches!(build_form(&turn), Err(Error::Validation(_))));
    }
}
