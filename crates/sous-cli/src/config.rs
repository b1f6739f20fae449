//! Configuration file support

use serde::{Deserialize, Serialize};
use sous_chat::ChatEndpoints;
use std::fs;
use std::path::{Path, PathBuf};

/// Configuration for sous
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Server base URL
    pub server_url: Option<String>,
    /// Streaming endpoint path
    pub stream_path: Option<String>,
    /// Single-shot endpoint path
    pub fallback_path: Option<String>,
    /// Session cookie copied from a signed-in browser
    pub session_cookie: Option<String>,
}

impl Config {
    /// Get the config directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sous")
    }

    /// Get the config file path
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("SOUS_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        Self::config_dir().join("config.toml")
    }

    /// Load config from the default location
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load config from a file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    tracing::warn!("Failed to parse config file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Create a default config file if it doesn't exist
    pub fn init() -> std::io::Result<PathBuf> {
        let path = Self::config_path();
        if path.exists() {
            return Ok(path);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(&path, example_config())?;
        Ok(path)
    }

    /// Endpoints after applying a command-line server override
    pub fn endpoints(&self, server_override: Option<&str>) -> ChatEndpoints {
        let mut endpoints = ChatEndpoints::default();
        if let Some(url) = server_override.or(self.server_url.as_deref()) {
            endpoints.base_url = url.to_string();
        }
        if let Some(path) = &self.stream_path {
            endpoints.stream_path = path.clone();
        }
        if let Some(path) = &self.fallback_path {
            endpoints.fallback_path = path.clone();
        }
        endpoints
    }
}

/// Generate example config content
pub fn example_config() -> &'static str {
    r#"# sous configuration file
# Place at ~/.config/sous/config.toml (Linux) or set SOUS_CONFIG_PATH

# Server base URL
server_url = "http://127.0.0.1:8000"

# Endpoint paths (defaults shown)
# stream_path = "/chat/stream"
# fallback_path = "/chat"

# Session cookie from a signed-in browser (optional)
# session_cookie = "session=..."
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(example_config()).unwrap();
        assert_eq!(config.server_url.as_deref(), Some("http://127.0.0.1:8000"));
        assert_eq!(config.session_cookie, None);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = Config::load_from(Path::new("/nonexistent/sous/config.toml"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_unparsable_file_gives_defaults() {
        let path = std::env::temp_dir().join(format!("sous-bad-{}.toml", std::process::id()));
        fs::write(&path, "server_url = [not toml").unwrap();
        let config = Config::load_from(&path);
        let _ = fs::remove_file(&path);
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_endpoints_override_precedence() {
        let config = Config {
            server_url: Some("http://from-file:8000".into()),
            stream_path: Some("/v2/stream".into()),
            ..Default::default()
        };

        let endpoints = config.endpoints(None);
        assert_eq!(endpoints.base_url, "http://from-file:8000");
        assert_eq!(endpoints.stream_path, "/v2/stream");
        assert_eq!(endpoints.fallback_path, "/chat");

        let endpoints = config.endpoints(Some("http://flag:9000"));
        assert_eq!(endpoints.base_url, "http://flag:9000");
    }
}
