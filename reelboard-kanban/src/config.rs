/// Client configuration.
/// Reads client.json from ~/.config/reelboard/client.json (or platform equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the column API, without a trailing slash.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Bearer token for the signed-in identity. Unset means signed out.
    #[serde(default)]
    pub token: Option<String>,
    /// Where the signed-out board is kept.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:5000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token: None,
            data_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("reelboard")
                .join("local")
        })
    }
}

/// Default config path: ~/.config/reelboard/client.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelboard")
        .join("client.json")
}

/// Load config from path. Returns default if file doesn't exist or fails to parse.
pub fn load_config(path: &Path) -> ClientConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            ClientConfig::default()
        }),
        Err(_) => ClientConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let dir = TempDir::new().unwrap();
        let config = load_config(&dir.path().join("client.json"));
        assert_eq!(config.api_url, "http://localhost:5000/api");
        assert!(config.token.is_none());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("client.json");
        fs::write(&path, r#"{"token": "abc", "data_dir": "/tmp/rb"}"#).unwrap();
        let config = load_config(&path);
        assert_eq!(config.token.as_deref(), Some("abc"));
        assert_eq!(config.resolved_data_dir(), PathBuf::from("/tmp/rb"));
        assert_eq!(config.api_url, "http://localhost:5000/api");
    }
}
