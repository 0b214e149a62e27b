pub mod file;

use chrono::{DateTime, Utc};
use reelboard_core::identity::Principal;
use reelboard_core::types::Board;
use serde::{Deserialize, Serialize};

/// One stored document per signed-in identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub subject_id: String,
    pub email: String,
    pub name: String,
    pub columns: Board,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDocument {
    /// Fresh document seeded with the default columns.
    pub fn new(principal: &Principal, columns: Board) -> Self {
        let now = Utc::now();
        Self {
            subject_id: principal.subject_id.clone(),
            email: principal.email.clone(),
            name: principal.display_name.clone(),
            columns,
            last_updated: now,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Abstract per-identity column storage.
/// Implementations: FileColumnStore (JSON documents on disk).
pub trait ColumnStore: Send + Sync {
    /// Read the identity's document, creating the default one on first sight.
    fn get_or_create(&self, principal: &Principal) -> Result<UserDocument, StoreError>;

    /// Replace all columns (upsert). Callers validate first.
    fn replace_columns(
        &self,
        principal: &Principal,
        columns: Board,
    ) -> Result<UserDocument, StoreError>;

    /// Replace all columns only if the stored board holds no items.
    /// The check and the write happen under the same lock.
    fn migrate_columns(
        &self,
        principal: &Principal,
        columns: Board,
    ) -> Result<UserDocument, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("User already has data. Migration aborted to prevent data loss.")]
    Conflict,

    #[error("Corrupt document for {subject_id}: {reason}")]
    Corrupt { subject_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
