/// Reelboard Backend: per-identity column storage behind an authenticated,
/// rate-limited REST API.
pub mod api;
pub mod auth;
pub mod config;
pub mod log_bridge;
pub mod server;
pub mod state;
pub mod store;

use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::auth::IdentityVerifier;
use crate::config::ServerConfig;
use crate::state::AppState;
use crate::store::file::FileColumnStore;
use crate::store::StoreError;

/// Open the document store under the configured data directory and wire up
/// the verifier and rate limiter.
pub fn build_state(config: ServerConfig) -> Result<AppState, StoreError> {
    for warning in config.check() {
        log::warn!("[reelboard.config] {}", warning);
    }

    let store = FileColumnStore::open(config.resolved_data_dir().join("users"))?;
    let verifier = IdentityVerifier::from_config(&config.auth);
    let rate_limiter = RateLimiter::from_config(&config.rate_limit);

    Ok(AppState {
        store: Arc::new(store),
        verifier: Arc::new(verifier),
        rate_limiter,
        config: Arc::new(config),
    })
}
