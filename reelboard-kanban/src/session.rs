/// One client session: picks the backend for the current identity and runs
/// the migration rule once when signed in.
use std::io;
use std::path::PathBuf;

use reelboard_core::board::{BoardAction, ViewedItem};
use reelboard_core::identity::Identity;
use reelboard_core::local::{get_item, FileKeyValueStore, LocalBoardStore};
use reelboard_core::manager::{BoardError, BoardManager};
use reelboard_core::migration::{
    migrate, MigrationDecision, MigrationError, MigrationGate, MigrationSummary,
};
use reelboard_core::sync::{RemoteError, SyncEngine, SyncError, SyncStatus};
use reelboard_core::types::{Board, LOCAL_BOARD_KEY};
use serde::Serialize;
use thiserror::Error;

use crate::api::HttpColumnsApi;
use crate::config::ClientConfig;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Cannot open local store at {path}: {source}")]
    LocalStore { path: PathBuf, source: io::Error },

    #[error("Cannot reach the column API: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Board(#[from] BoardError),

    #[error("Changes were kept locally but not saved to the cloud: {0}")]
    Unsynced(String),

    #[error("{0}")]
    Usage(String),
}

type LocalBackend = LocalBoardStore<FileKeyValueStore>;
type CloudBackend = SyncEngine<HttpColumnsApi>;

enum LiveBoard {
    /// Signed out: the board lives in the local store.
    Local(BoardManager<LocalBackend>),
    /// Signed in: the board lives remotely; the local store is only read
    /// to decide on migration.
    Cloud {
        manager: BoardManager<CloudBackend>,
        engine: CloudBackend,
        local: FileKeyValueStore,
        gate: MigrationGate,
        decision: MigrationDecision,
    },
}

/// Summary printed by `status`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub mode: &'static str,
    pub columns: usize,
    pub items: usize,
    #[serde(flatten)]
    pub sync: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migration_offer: Option<MigrationSummary>,
}

pub struct Session {
    live: LiveBoard,
}

impl Session {
    /// Open the session for `identity`. Signed in, the remote board is
    /// loaded before anything else; a failed load aborts so a stale default
    /// board is never written over cloud data.
    pub async fn open(identity: Identity, config: &ClientConfig) -> Result<Self, ClientError> {
        let data_dir = config.resolved_data_dir();
        let local = FileKeyValueStore::new(&data_dir).map_err(|source| ClientError::LocalStore {
            path: data_dir.clone(),
            source,
        })?;

        let live = match identity {
            Identity::Anonymous => {
                log::debug!("[reelboard.session] Signed out, using {}", data_dir.display());
                LiveBoard::Local(BoardManager::new(LocalBoardStore::open(local)))
            }
            Identity::Authenticated { token } => {
                let api = HttpColumnsApi::new(&config.api_url, &token, config.timeout())?;
                log::debug!("[reelboard.session] Signed in, using {}", api.base_url());
                let engine = SyncEngine::new(api);
                let remote = engine.load().await?;

                let gate = MigrationGate::new();
                let local_board: Board = get_item(&local, LOCAL_BOARD_KEY, Board::default_columns());
                let decision = gate.check(&local_board, &remote);
                if let MigrationDecision::Offer(summary) = &decision {
                    log::info!(
                        "[reelboard.session] Local board has {} items in {} columns that can be migrated",
                        summary.items,
                        summary.columns
                    );
                }

                LiveBoard::Cloud {
                    manager: BoardManager::new(engine.clone()),
                    engine,
                    local,
                    gate,
                    decision,
                }
            }
        };
        Ok(Self { live })
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self.live, LiveBoard::Cloud { .. })
    }

    pub fn board(&self) -> Board {
        match &self.live {
            LiveBoard::Local(manager) => manager.board(),
            LiveBoard::Cloud { manager, .. } => manager.board(),
        }
    }

    pub fn dispatch(&self, action: BoardAction) -> Result<(), ClientError> {
        match &self.live {
            LiveBoard::Local(manager) => manager.dispatch(action)?,
            LiveBoard::Cloud { manager, .. } => manager.dispatch(action)?,
        }
        Ok(())
    }

    /// Open the detail view on `item_id`, wherever it lives.
    pub fn open_item(&self, item_id: &str) -> Result<ViewedItem, ClientError> {
        let board = self.board();
        let (column, _) = board
            .find_item(item_id)
            .ok_or_else(|| ClientError::Usage(format!("No item with id {}", item_id)))?;
        match &self.live {
            LiveBoard::Local(manager) => manager.open_item(&column.id, item_id),
            LiveBoard::Cloud { manager, .. } => manager.open_item(&column.id, item_id),
        }
        Ok(ViewedItem {
            item_id: item_id.to_string(),
            column_id: column.id.clone(),
        })
    }

    /// The open item, following it across moves; `None` once it is deleted.
    pub fn viewing(&self) -> Option<ViewedItem> {
        match &self.live {
            LiveBoard::Local(manager) => manager.viewing(),
            LiveBoard::Cloud { manager, .. } => manager.viewing(),
        }
    }

    /// Local data that could be moved to the cloud, if the rule offered it.
    pub fn migration_offer(&self) -> Option<MigrationSummary> {
        match &self.live {
            LiveBoard::Cloud {
                decision: MigrationDecision::Offer(summary),
                ..
            } => Some(*summary),
            _ => None,
        }
    }

    /// Upload the signed-out board. The local copy is left in place.
    pub async fn migrate(&self) -> Result<Board, ClientError> {
        match &self.live {
            LiveBoard::Local(_) => Err(ClientError::Usage(
                "Sign in (set a token) before migrating the local board".to_string(),
            )),
            LiveBoard::Cloud {
                engine, local, gate, ..
            } => {
                let local_board: Board =
                    get_item(local, LOCAL_BOARD_KEY, Board::default_columns());
                if !local_board.has_items() {
                    return Err(ClientError::Usage(
                        "The local board has no items to migrate".to_string(),
                    ));
                }
                gate.mark_checked();
                Ok(migrate(engine, &local_board).await?)
            }
        }
    }

    pub fn status(&self) -> SessionStatus {
        let board = self.board();
        let (mode, sync) = match &self.live {
            LiveBoard::Local(_) => (
                "local",
                SyncStatus {
                    loading: false,
                    syncing: false,
                    last_error: None,
                },
            ),
            LiveBoard::Cloud { engine, .. } => ("cloud", engine.status()),
        };
        SessionStatus {
            mode,
            columns: board.len(),
            items: board.item_count(),
            sync,
            migration_offer: self.migration_offer(),
        }
    }

    /// Wait for background saves; report the last one if it never landed.
    pub async fn finish(&self) -> Result<(), ClientError> {
        if let LiveBoard::Cloud { engine, .. } = &self.live {
            engine.settled().await;
            if let Some(error) = engine.last_error() {
                return Err(ClientError::Unsynced(error));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelboard_core::local::set_item;
    use reelboard_core::types::{Column, Item};
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> ClientConfig {
        ClientConfig {
            data_dir: Some(dir.path().to_path_buf()),
            ..ClientConfig::default()
        }
    }

    #[tokio::test]
    async fn test_anonymous_session_writes_local_store() {
        let dir = TempDir::new().unwrap();
        let session = Session::open(Identity::Anonymous, &config(&dir)).await.unwrap();
        assert!(!session.is_cloud());

        session
            .dispatch(BoardAction::add_item("col-ideas", "First video"))
            .unwrap();
        session.finish().await.unwrap();

        let store = FileKeyValueStore::new(dir.path()).unwrap();
        let stored: Board = get_item(&store, LOCAL_BOARD_KEY, Board::default());
        assert_eq!(stored.item_count(), 1);
        assert_eq!(stored, session.board());
    }

    #[tokio::test]
    async fn test_open_item_follows_moves() {
        let dir = TempDir::new().unwrap();
        let session = Session::open(Identity::Anonymous, &config(&dir)).await.unwrap();
        session
            .dispatch(BoardAction::add_item("col-ideas", "Night shoot"))
            .unwrap();
        let item_id = session.board().columns[0].items[0].id.clone();

        let view = session.open_item(&item_id).unwrap();
        assert_eq!(view.column_id, "col-ideas");
        assert_eq!(session.viewing(), Some(view));

        session
            .dispatch(BoardAction::move_item(
                "col-ideas",
                &item_id,
                reelboard_core::board::Direction::Right,
            ))
            .unwrap();
        assert_eq!(session.viewing().unwrap().column_id, "col-scripting");

        session
            .dispatch(BoardAction::delete_item("col-scripting", &item_id))
            .unwrap();
        assert_eq!(session.viewing(), None);
        assert!(matches!(
            session.open_item(&item_id),
            Err(ClientError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_anonymous_session_cannot_migrate() {
        let dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(dir.path()).unwrap();
        let mut col = Column::new("c1", "Ideas", "yellow");
        col.items.push(Item {
            id: "i1".to_string(),
            title: "X".to_string(),
            description: String::new(),
        });
        set_item(&store, LOCAL_BOARD_KEY, &Board::new(vec![col]));

        let session = Session::open(Identity::Anonymous, &config(&dir)).await.unwrap();
        assert!(session.migration_offer().is_none());
        assert!(matches!(
            session.migrate().await,
            Err(ClientError::Usage(_))
        ));
        assert_eq!(session.status().mode, "local");
    }

    #[tokio::test]
    async fn test_unreachable_api_aborts_open() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig {
            api_url: "http://127.0.0.1:9/api".to_string(),
            timeout_secs: 2,
            ..config(&dir)
        };
        let result = Session::open(Identity::from_token(Some("tok".to_string())), &config).await;
        assert!(matches!(result, Err(ClientError::Sync(_))));
    }
}
