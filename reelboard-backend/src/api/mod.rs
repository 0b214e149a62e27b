use axum::{
    http::{HeaderMap, StatusCode},
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

mod columns;
mod health;
pub mod rate_limit;

use crate::auth::require_auth;
use crate::state::AppState;
use rate_limit::rate_limit_middleware;

/// Axum REST API routes, mounted under `/api`.
///
///   GET  /health           -> liveness probe (no auth)
///   GET  /columns          -> caller's board, default board on first sight
///   PUT  /columns          -> replace the caller's board
///   POST /columns/migrate  -> one-time import into an empty remote board
///
/// Every route is rate limited per client IP; the column routes also
/// require a bearer token.
pub fn api_router(state: &AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/columns", get(columns::get_columns).put(columns::put_columns))
        .route("/columns/migrate", post(columns::migrate_columns))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health))
        .merge(protected)
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ))
}

// ── Shared types and helpers used across sub-modules ────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: None,
        }
    }

    pub fn with_details(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: Some(details.into()),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn insert_header_safe(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match value.parse() {
        Ok(parsed) => {
            headers.insert(name, parsed);
        }
        Err(e) => {
            log::warn!("Failed to set header {}={} ({})", name, value, e);
        }
    }
}

fn log_api_issue(status: StatusCode, target: &'static str, message: impl AsRef<str>) {
    let message = message.as_ref();
    if status.is_server_error() {
        log::error!(target: target, "{}", message);
    } else {
        log::warn!(target: target, "{}", message);
    }
}
