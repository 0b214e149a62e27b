/// One-shot migration of the signed-out local board into the cloud.
///
/// The client only offers migration when the local board has content and the
/// remote board has none. The server repeats the emptiness check under its
/// own write lock, so a racing or repeated call cannot overwrite cloud data.
/// The local copy is never touched; it stays behind as a backup.
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use thiserror::Error;

use crate::sync::{RemoteColumns, RemoteError, SyncEngine};
use crate::types::Board;
use crate::validate::ValidationError;

pub fn should_offer_migration(local: &Board, remote: &Board) -> bool {
    local.has_items() && !remote.has_items()
}

/// What the migration prompt shows about the local data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub columns: usize,
    pub items: usize,
}

impl MigrationSummary {
    pub fn of(board: &Board) -> Self {
        Self {
            columns: board.len(),
            items: board.item_count(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationDecision {
    Offer(MigrationSummary),
    Skip,
    /// The decision was already made for this signed-in session.
    AlreadyChecked,
}

/// Evaluates the migration rule at most once per sign-in.
#[derive(Debug, Default)]
pub struct MigrationGate {
    checked: AtomicBool,
}

impl MigrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&self, local: &Board, remote: &Board) -> MigrationDecision {
        if self.checked.swap(true, Ordering::SeqCst) {
            return MigrationDecision::AlreadyChecked;
        }
        if should_offer_migration(local, remote) {
            MigrationDecision::Offer(MigrationSummary::of(local))
        } else {
            MigrationDecision::Skip
        }
    }

    /// Record that this session has decided without evaluating the rule,
    /// e.g. because the user asked for the migration explicitly.
    pub fn mark_checked(&self) {
        self.checked.store(true, Ordering::SeqCst);
    }

    pub fn is_checked(&self) -> bool {
        self.checked.load(Ordering::SeqCst)
    }

    /// Re-arm on sign-out so the next sign-in is checked again.
    pub fn reset(&self) {
        self.checked.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationError {
    #[error("Invalid local data: {0}")]
    Invalid(#[from] ValidationError),

    #[error("{0}")]
    Conflict(String),

    #[error("Migration failed: {0}")]
    Remote(RemoteError),
}

impl From<RemoteError> for MigrationError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Conflict(message) => MigrationError::Conflict(message),
            other => MigrationError::Remote(other),
        }
    }
}

/// Upload `local` as the identity's board, then re-fetch and make it live.
pub async fn migrate<R: RemoteColumns>(
    engine: &SyncEngine<R>,
    local: &Board,
) -> Result<Board, MigrationError> {
    local.validate()?;
    engine.remote().migrate_columns(local).await?;
    let fresh = engine.remote().fetch_columns().await?;
    log::info!(
        "[reelboard.migration] Migrated {} columns / {} items to the cloud",
        fresh.len(),
        fresh.item_count()
    );
    engine.install(fresh.clone());
    Ok(fresh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::tests::FakeRemote;
    use crate::types::{Column, Item};

    fn column(id: &str, items: &[(&str, &str)]) -> Column {
        let mut col = Column::new(id, "Ideas", "yellow");
        col.items = items
            .iter()
            .map(|(id, title)| Item {
                id: id.to_string(),
                title: title.to_string(),
                description: String::new(),
            })
            .collect();
        col
    }

    #[test]
    fn test_offer_when_remote_is_empty_of_items() {
        let local = Board::new(vec![column("c1", &[("i1", "X")])]);
        let remote = Board::new(vec![column("c1", &[])]);
        assert!(should_offer_migration(&local, &remote));
    }

    #[test]
    fn test_no_offer_when_remote_has_items() {
        let local = Board::new(vec![column("c1", &[("i1", "X")])]);
        let remote = Board::new(vec![column("c1", &[("i2", "Y")])]);
        assert!(!should_offer_migration(&local, &remote));
    }

    #[test]
    fn test_no_offer_when_local_has_no_items() {
        assert!(!should_offer_migration(
            &Board::default_columns(),
            &Board::default()
        ));
    }

    #[test]
    fn test_gate_checks_once() {
        let gate = MigrationGate::new();
        let local = Board::new(vec![column("c1", &[("i1", "X"), ("i2", "Y")])]);
        assert_eq!(
            gate.check(&local, &Board::default_columns()),
            MigrationDecision::Offer(MigrationSummary {
                columns: 1,
                items: 2
            })
        );
        assert_eq!(
            gate.check(&local, &Board::default_columns()),
            MigrationDecision::AlreadyChecked
        );
        gate.reset();
        assert_eq!(
            gate.check(&Board::default_columns(), &Board::default_columns()),
            MigrationDecision::Skip
        );
    }

    #[test]
    fn test_mark_checked_suppresses_offer() {
        let gate = MigrationGate::new();
        assert!(!gate.is_checked());
        gate.mark_checked();
        assert!(gate.is_checked());

        let local = Board::new(vec![column("c1", &[("i1", "X")])]);
        assert_eq!(
            gate.check(&local, &Board::default_columns()),
            MigrationDecision::AlreadyChecked
        );
    }

    #[tokio::test]
    async fn test_migrate_replaces_remote_and_goes_live() {
        let engine = SyncEngine::new(FakeRemote::new(Board::default_columns()));
        engine.load().await.unwrap();
        let local = Board::new(vec![column("c1", &[("i1", "X")])]);

        let live = migrate(&engine, &local).await.unwrap();
        assert_eq!(live, local);
        assert_eq!(engine.board(), local);
        assert_eq!(engine.remote().stored(), local);
    }

    #[tokio::test]
    async fn test_migrate_conflict_leaves_remote_untouched() {
        let remote_board = Board::new(vec![column("c1", &[("i2", "Y")])]);
        let engine = SyncEngine::new(FakeRemote::new(remote_board.clone()));
        engine.load().await.unwrap();
        let local = Board::new(vec![column("c1", &[("i1", "X")])]);

        let err = migrate(&engine, &local).await.unwrap_err();
        assert!(matches!(err, MigrationError::Conflict(_)));
        assert_eq!(engine.remote().stored(), remote_board);
        assert_eq!(engine.board(), remote_board);
    }

    #[tokio::test]
    async fn test_migrate_rejects_invalid_local_board() {
        let engine = SyncEngine::new(FakeRemote::new(Board::default_columns()));
        engine.load().await.unwrap();
        let local = Board::new(vec![Column::new("", "Ideas", "yellow")]);
        assert!(matches!(
            migrate(&engine, &local).await,
            Err(MigrationError::Invalid(_))
        ));
        assert_eq!(engine.remote().stored(), Board::default_columns());
    }
}
