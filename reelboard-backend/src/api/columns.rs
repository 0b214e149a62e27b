use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use reelboard_core::identity::Principal;
use reelboard_core::types::{Board, ColumnsPayload, MigrateResponse};
use reelboard_core::validate::validate_columns;
use serde_json::Value;

use super::{log_api_issue, ApiError, ErrorResponse};
use crate::state::AppState;
use crate::store::StoreError;

const INVALID_COLUMNS: &str =
    "Invalid column structure. Each column must have id, title, color, and items array.";
const INVALID_MIGRATION: &str = "Invalid column structure for migration";

/// Pull `columns` out of the request body and run it through the validation
/// gate. Shape problems become 400 with the reason in `details`.
fn columns_from_body(
    body: Result<Json<Value>, JsonRejection>,
    target: &'static str,
    error: &'static str,
) -> Result<Board, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        let status = StatusCode::BAD_REQUEST;
        log_api_issue(status, target, format!("Rejected body: {}", rejection.body_text()));
        (
            status,
            Json(ErrorResponse::with_details("Malformed JSON body", rejection.body_text())),
        )
    })?;

    let columns = body.get("columns").unwrap_or(&Value::Null);
    validate_columns(columns).map_err(|e| {
        let status = StatusCode::BAD_REQUEST;
        log_api_issue(status, target, format!("{}: {}", error, e));
        (status, Json(ErrorResponse::with_details(error, e.to_string())))
    })
}

fn store_failure(e: StoreError, target: &'static str, error: &'static str) -> ApiError {
    let status = StatusCode::INTERNAL_SERVER_ERROR;
    log_api_issue(status, target, format!("{}: {}", error, e));
    (status, Json(ErrorResponse::new(error)))
}

pub async fn get_columns(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<Json<ColumnsPayload>, ApiError> {
    let doc = state
        .store
        .get_or_create(&principal)
        .map_err(|e| store_failure(e, "reelboard.api.get_columns", "Failed to fetch columns"))?;
    Ok(Json(ColumnsPayload {
        columns: doc.columns,
    }))
}

pub async fn put_columns(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ColumnsPayload>, ApiError> {
    let target = "reelboard.api.put_columns";
    let columns = columns_from_body(body, target, INVALID_COLUMNS)?;

    let doc = state
        .store
        .replace_columns(&principal, columns)
        .map_err(|e| store_failure(e, target, "Failed to update columns"))?;
    log::debug!(
        target: target,
        "Stored {} columns for {}",
        doc.columns.len(),
        principal.subject_id
    );
    Ok(Json(ColumnsPayload {
        columns: doc.columns,
    }))
}

pub async fn migrate_columns(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<MigrateResponse>, ApiError> {
    let target = "reelboard.api.migrate_columns";
    let columns = columns_from_body(body, target, INVALID_MIGRATION)?;

    match state.store.migrate_columns(&principal, columns) {
        Ok(doc) => Ok(Json(MigrateResponse {
            success: true,
            message: Some("Migration completed successfully".to_string()),
            columns: doc.columns,
        })),
        Err(StoreError::Conflict) => {
            let status = StatusCode::CONFLICT;
            let error = StoreError::Conflict.to_string();
            log_api_issue(
                status,
                target,
                format!("{} ({})", error, principal.subject_id),
            );
            Err((status, Json(ErrorResponse::new(error))))
        }
        Err(e) => Err(store_failure(e, target, "Migration failed")),
    }
}
