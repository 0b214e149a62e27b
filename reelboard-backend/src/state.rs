/// Shared application state passed to axum handlers.
use std::sync::Arc;

use crate::api::rate_limit::RateLimiter;
use crate::auth::IdentityVerifier;
use crate::config::ServerConfig;
use crate::store::ColumnStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ColumnStore>,
    pub verifier: Arc<IdentityVerifier>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}
