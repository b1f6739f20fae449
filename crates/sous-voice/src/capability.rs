//! Recognizer seam and the capability probe

use async_trait::async_trait;

use crate::error::CapabilityError;

/// What the host environment says about speech capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    /// The capture API exists at all
    pub api_present: bool,
    /// Browser user agent, if running in one
    pub user_agent: Option<String>,
}

impl Environment {
    /// Static feature detection. Necessary, not sufficient: some
    /// environments expose the API while the service never answers.
    pub fn is_supported(&self) -> bool {
        self.api_present
            && self
                .user_agent
                .as_deref()
                .is_none_or(is_reliable_user_agent)
    }
}

/// Chrome (not Edge) and Arc on desktop have working recognition services
pub fn is_reliable_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    let is_chrome = ua.contains("chrome") && !ua.contains("edg");
    let is_arc = ua.contains("arc");
    let is_mobile = ["mobile", "android", "iphone", "ipad", "ipod"]
        .iter()
        .any(|m| ua.contains(m));
    (is_chrome || is_arc) && !is_mobile
}

/// Outcome of [`probe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Static detection failed; nothing was started
    Unsupported,
    /// The live test hit a network or service failure
    Unavailable,
    Available,
}

/// Platform speech recognizer.
///
/// `start` only begins capture; transcripts, errors, and end-of-utterance
/// are reported back through [`crate::VoiceHandle::report`].
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Describe the host environment
    fn environment(&self) -> Environment;

    /// Start a throwaway instance and stop it as soon as it is running
    async fn live_test(&self) -> Result<(), CapabilityError>;

    /// Ask the user for microphone access; `true` when granted
    async fn request_permission(&self) -> bool;

    /// Begin a capture session
    fn start(&self) -> Result<(), CapabilityError>;

    /// End the current capture session
    fn stop(&self);
}

/// Best-effort live capability test.
///
/// Only a network or service failure counts as unavailable; any other
/// live-test outcome is treated as available.
pub async fn probe(recognizer: &dyn SpeechRecognizer) -> Availability {
    if !recognizer.environment().is_supported() {
        return Availability::Unsupported;
    }

    match recognizer.live_test().await {
        Ok(()) => Availability::Available,
        Err(e) if e.is_service_failure() => {
            tracing::warn!("Speech recognition live test failed: {}", e);
            Availability::Unavailable
        }
        Err(e) => {
            tracing::debug!("Live test error {} does not rule out recognition", e);
            Availability::Available
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
    const EDGE_WIN: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36 Edg/126.0.0.0";
    const CHROME_ANDROID: &str = "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Mobile Safari/537.36";
    const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:127.0) Gecko/20100101 Firefox/127.0";

    #[test]
    fn test_user_agent_classes() {
        assert!(is_reliable_user_agent(CHROME_MAC));
        assert!(!is_reliable_user_agent(EDGE_WIN));
        assert!(!is_reliable_user_agent(CHROME_ANDROID));
        assert!(!is_reliable_user_agent(FIREFOX));
    }

    #[test]
    fn test_missing_api_is_unsupported() {
        let env = Environment {
            api_present: false,
            user_agent: Some(CHROME_MAC.into()),
        };
        assert!(!env.is_supported());
    }

    #[test]
    fn test_native_environment_without_user_agent() {
        let env = Environment {
            api_present: true,
            user_agent: None,
        };
        assert!(env.is_supported());
    }
}
