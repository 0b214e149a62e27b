/// Configuration for the Reelboard backend.
/// Reads server.json from ~/.config/reelboard/server.json (or platform equivalent),
/// then applies the PORT and REELBOARD_DATA_DIR environment overrides.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Where user documents and logs live. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// Verify Google ID tokens through the tokeninfo endpoint.
    #[default]
    Google,
    /// Accept only the tokens listed in `tokens`.
    Static,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,
    /// Expected `aud` of Google ID tokens. Unset accepts any audience.
    #[serde(default)]
    pub google_client_id: Option<String>,
    #[serde(default = "default_tokeninfo_url")]
    pub tokeninfo_url: String,
    #[serde(default)]
    pub tokens: Vec<StaticToken>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticToken {
    pub token: String,
    pub subject_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

fn default_port() -> u16 {
    5000
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:5174".to_string(),
    ]
}

fn default_max_requests() -> usize {
    100
}

fn default_window_secs() -> u64 {
    15 * 60
}

fn default_tokeninfo_url() -> String {
    "https://oauth2.googleapis.com/tokeninfo".to_string()
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: AuthMode::default(),
            google_client_id: None,
            tokeninfo_url: default_tokeninfo_url(),
            tokens: Vec::new(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            data_dir: None,
            allowed_origins: default_allowed_origins(),
            rate_limit: RateLimitConfig::default(),
            auth: AuthConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Apply `PORT` and `REELBOARD_DATA_DIR` from the environment.
    pub fn apply_env(&mut self) {
        if let Ok(port) = std::env::var("PORT") {
            match port.parse() {
                Ok(p) => self.port = p,
                Err(_) => log::warn!("Ignoring invalid PORT value {:?}", port),
            }
        }
        if let Some(dir) = std::env::var_os("REELBOARD_DATA_DIR") {
            self.data_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("reelboard")
        })
    }

    /// Startup sanity checks. Returns warnings; nothing here is fatal.
    pub fn check(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.auth.mode {
            AuthMode::Google if self.auth.google_client_id.is_none() => warnings
                .push("auth.google_client_id is not set; tokens for any audience are accepted".to_string()),
            AuthMode::Static if self.auth.tokens.is_empty() => warnings
                .push("auth.mode is static but no tokens are configured; every request will be rejected".to_string()),
            _ => {}
        }
        if self.rate_limit.max_requests == 0 {
            warnings.push("rate_limit.max_requests is 0; every API request will be rejected".to_string());
        }
        warnings
    }
}

/// Default config path: ~/.config/reelboard/server.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reelboard")
        .join("server.json")
}

/// Load config from path. Returns default if file doesn't exist or fails to parse.
pub fn load_config(path: &Path) -> ServerConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!("Failed to parse config {}: {}", path.display(), e);
            ServerConfig::default()
        }),
        Err(_) => {
            log::info!("No config at {}, using defaults", path.display());
            ServerConfig::default()
        }
    }
}
