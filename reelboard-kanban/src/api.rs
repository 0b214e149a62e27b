/// HTTP transport to the column API for one bearer token.
use std::future::Future;
use std::time::Duration;

use reelboard_core::sync::{RemoteColumns, RemoteError};
use reelboard_core::types::{Board, ColumnsPayload, MigrateResponse};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub struct HttpColumnsApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Serialize)]
struct ColumnsBody<'a> {
    columns: &'a Board,
}

impl HttpColumnsApi {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, path: &str, board: Option<&Board>) -> Result<Response, RemoteError> {
        let mut req = self
            .client
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token);
        if let Some(columns) = board {
            req = req.json(&ColumnsBody { columns });
        }
        let resp = req
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = error_message(resp).await;
        Err(match status {
            StatusCode::UNAUTHORIZED => RemoteError::Unauthorized(message),
            StatusCode::BAD_REQUEST => RemoteError::Validation(message),
            StatusCode::CONFLICT => RemoteError::Conflict(message),
            _ => RemoteError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, RemoteError> {
        resp.json::<T>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))
    }

    async fn get_columns(&self) -> Result<Board, RemoteError> {
        let resp = self.send(Method::GET, "/columns", None).await?;
        Ok(Self::decode::<ColumnsPayload>(resp).await?.columns)
    }

    async fn replace_columns(&self, board: &Board) -> Result<Board, RemoteError> {
        let resp = self.send(Method::PUT, "/columns", Some(board)).await?;
        Ok(Self::decode::<ColumnsPayload>(resp).await?.columns)
    }

    async fn import_columns(&self, board: &Board) -> Result<Board, RemoteError> {
        let resp = self.send(Method::POST, "/columns/migrate", Some(board)).await?;
        let body = Self::decode::<MigrateResponse>(resp).await?;
        if let Some(message) = &body.message {
            log::info!("[reelboard.api] {}", message);
        }
        Ok(body.columns)
    }
}

/// Best-effort `error` (plus `details`) from a JSON error body.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(body) => {
            let error = body["error"].as_str().unwrap_or("request failed");
            match body["details"].as_str() {
                Some(details) => format!("{} ({})", error, details),
                None => error.to_string(),
            }
        }
        Err(_) if !text.trim().is_empty() => text.trim().to_string(),
        Err(_) => status.to_string(),
    }
}

impl RemoteColumns for HttpColumnsApi {
    fn fetch_columns(&self) -> impl Future<Output = Result<Board, RemoteError>> + Send {
        self.get_columns()
    }

    fn put_columns(&self, board: &Board) -> impl Future<Output = Result<Board, RemoteError>> + Send {
        self.replace_columns(board)
    }

    fn migrate_columns(
        &self,
        board: &Board,
    ) -> impl Future<Output = Result<Board, RemoteError>> + Send {
        self.import_columns(board)
    }
}
