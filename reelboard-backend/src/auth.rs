/// Bearer-token authentication for the column routes.
///
/// The verifier resolves a token to a `Principal`; the middleware attaches it
/// to the request so handlers can take `Extension<Principal>`.
use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use reelboard_core::identity::Principal;
use serde::Deserialize;
use thiserror::Error;

use crate::api::ErrorResponse;
use crate::config::{AuthConfig, AuthMode};
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken(String),

    #[error("Token verification unavailable: {0}")]
    Verifier(String),
}

/// Google ID token verification through the tokeninfo endpoint.
pub struct GoogleVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: Option<String>,
}

#[derive(Deserialize)]
struct TokenInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    aud: Option<String>,
    /// Seconds since the epoch, sent as a string.
    #[serde(default)]
    exp: Option<String>,
}

impl GoogleVerifier {
    pub fn new(tokeninfo_url: String, client_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("[auth] Falling back to default HTTP client: {}", e);
                reqwest::Client::new()
            });
        Self {
            client,
            tokeninfo_url,
            client_id,
        }
    }

    async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        let resp = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await
            .map_err(|e| AuthError::Verifier(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(AuthError::InvalidToken(format!(
                "tokeninfo returned {}",
                resp.status()
            )));
        }

        let info: TokenInfo = resp
            .json()
            .await
            .map_err(|e| AuthError::InvalidToken(format!("unreadable tokeninfo: {}", e)))?;

        if let Some(expected) = &self.client_id {
            if info.aud.as_deref() != Some(expected.as_str()) {
                return Err(AuthError::InvalidToken(format!(
                    "audience mismatch: {:?}",
                    info.aud
                )));
            }
        }

        if let Some(exp) = &info.exp {
            let exp: i64 = exp
                .parse()
                .map_err(|_| AuthError::InvalidToken(format!("bad exp {:?}", exp)))?;
            if exp <= chrono::Utc::now().timestamp() {
                return Err(AuthError::InvalidToken("token expired".to_string()));
            }
        }

        let email = info.email.unwrap_or_default();
        let display_name = info
            .name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.clone());
        Ok(Principal {
            subject_id: info.sub,
            email,
            display_name,
        })
    }
}

pub enum IdentityVerifier {
    /// Fixed token table (development and tests).
    Static(HashMap<String, Principal>),
    Google(GoogleVerifier),
}

impl IdentityVerifier {
    pub fn from_config(config: &AuthConfig) -> Self {
        match config.mode {
            AuthMode::Google => IdentityVerifier::Google(GoogleVerifier::new(
                config.tokeninfo_url.clone(),
                config.google_client_id.clone(),
            )),
            AuthMode::Static => IdentityVerifier::Static(
                config
                    .tokens
                    .iter()
                    .map(|t| {
                        let principal = Principal {
                            subject_id: t.subject_id.clone(),
                            email: t.email.clone(),
                            display_name: t.name.clone().unwrap_or_else(|| t.email.clone()),
                        };
                        (t.token.clone(), principal)
                    })
                    .collect(),
            ),
        }
    }

    pub async fn verify(&self, token: &str) -> Result<Principal, AuthError> {
        match self {
            IdentityVerifier::Static(tokens) => tokens
                .get(token)
                .cloned()
                .ok_or_else(|| AuthError::InvalidToken("unknown token".to_string())),
            IdentityVerifier::Google(google) => google.verify(token).await,
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Axum middleware that rejects unauthenticated requests with 401.
pub async fn require_auth(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let result = match bearer_token(req.headers()) {
        Some(token) => state.verifier.verify(token).await,
        None => Err(AuthError::MissingToken),
    };

    match result {
        Ok(principal) => {
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(e) => {
            match &e {
                AuthError::MissingToken => {}
                AuthError::InvalidToken(reason) => {
                    log::warn!(target: "reelboard.auth", "Token rejected: {}", reason)
                }
                AuthError::Verifier(reason) => {
                    log::error!(target: "reelboard.auth", "Token verification error: {}", reason)
                }
            }
            let error = match e {
                AuthError::MissingToken => "No token provided",
                _ => "Invalid or expired token",
            };
            (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse::new(error)),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StaticToken;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer tok-1"));
        assert_eq!(bearer_token(&headers), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_static_verifier() {
        let config = AuthConfig {
            mode: AuthMode::Static,
            tokens: vec![StaticToken {
                token: "tok-1".to_string(),
                subject_id: "u1".to_string(),
                email: "u1@example.com".to_string(),
                name: None,
            }],
            ..AuthConfig::default()
        };
        let verifier = IdentityVerifier::from_config(&config);

        let principal = verifier.verify("tok-1").await.unwrap();
        assert_eq!(principal.subject_id, "u1");
        assert_eq!(principal.display_name, "u1@example.com");

        assert!(matches!(
            verifier.verify("nope").await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
