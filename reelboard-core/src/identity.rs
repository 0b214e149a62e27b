/// Identity shared by the backend (who is calling) and the client (which
/// store backs the live board).
use serde::{Deserialize, Serialize};

/// An authenticated user, keyed by the identity provider's stable subject id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Principal {
    pub subject_id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// Signed out: the board lives in the local store.
    Anonymous,
    /// Signed in: the board lives in the remote store, reached with this
    /// bearer token. The server resolves the token to a `Principal`.
    Authenticated { token: String },
}

impl Identity {
    pub fn from_token(token: Option<String>) -> Self {
        match token.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            Some(token) => Identity::Authenticated { token },
            None => Identity::Anonymous,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }
}
