/// Optimistic cloud sync for the live board.
///
/// Protocol:
///   `load()` fetches the remote board once per signed-in session.
///   `write()` installs the next board in memory immediately, then persists it
///   from a spawned task with bounded exponential-backoff retry.
///   A write that never lands is not rolled back; the failure is kept in
///   `last_error` until a later write succeeds.
///
/// Superseded writes are not cancelled and requests are not queued, so the
/// last request to reach the server wins.
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;

use crate::board::BoardAction;
use crate::manager::{BoardBackend, BoardError};
use crate::types::Board;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rejected by server: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Transport to the remote column store for one signed-in identity.
pub trait RemoteColumns: Send + Sync + 'static {
    fn fetch_columns(&self) -> impl Future<Output = Result<Board, RemoteError>> + Send;

    fn put_columns(&self, board: &Board) -> impl Future<Output = Result<Board, RemoteError>> + Send;

    fn migrate_columns(
        &self,
        board: &Board,
    ) -> impl Future<Output = Result<Board, RemoteError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Wait after the failed attempt number `attempt` (0-based): 1s, 2s, 4s, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Either a full replacement board or an updater resolved against the
/// engine's latest in-memory board.
pub enum BoardWrite {
    Value(Board),
    Update(Box<dyn FnOnce(&Board) -> Board + Send>),
}

impl BoardWrite {
    pub fn update(f: impl FnOnce(&Board) -> Board + Send + 'static) -> Self {
        BoardWrite::Update(Box::new(f))
    }

    fn resolve(self, current: &Board) -> Board {
        match self {
            BoardWrite::Value(board) => board,
            BoardWrite::Update(f) => f(current),
        }
    }
}

impl From<Board> for BoardWrite {
    fn from(board: Board) -> Self {
        BoardWrite::Value(board)
    }
}

impl From<BoardAction> for BoardWrite {
    fn from(action: BoardAction) -> Self {
        BoardWrite::update(move |board| action.apply(board))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("Board has not been loaded yet")]
    NotLoaded,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub loading: bool,
    pub syncing: bool,
    pub last_error: Option<String>,
}

struct SyncState {
    board: Board,
    loaded: bool,
    last_error: Option<String>,
    /// Sequence number of the newest write; only its outcome sets `last_error`.
    write_seq: u64,
}

struct Shared<R> {
    remote: R,
    policy: RetryPolicy,
    state: Mutex<SyncState>,
    /// Number of persistence tasks still running.
    in_flight: watch::Sender<usize>,
}

impl<R: RemoteColumns> Shared<R> {
    fn state(&self) -> MutexGuard<'_, SyncState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record the outcome of write `seq`, unless a newer write has started.
    fn record_outcome(&self, seq: u64, error: Option<String>) {
        let mut state = self.state();
        if state.write_seq == seq {
            state.last_error = error;
        } else {
            log::debug!(
                "[reelboard.sync] Ignoring outcome of superseded write {} (latest {})",
                seq,
                state.write_seq
            );
        }
    }

    async fn persist(&self, board: Board, seq: u64) {
        if let Err(e) = board.validate() {
            log::error!("[reelboard.sync] Refusing to sync invalid board: {}", e);
            self.record_outcome(seq, Some(format!("Invalid board: {}", e)));
            return;
        }

        let attempts = self.policy.attempts.max(1);
        for attempt in 0..attempts {
            match self.remote.put_columns(&board).await {
                Ok(_) => {
                    if attempt > 0 {
                        log::info!("[reelboard.sync] Synced after {} attempts", attempt + 1);
                    }
                    self.record_outcome(seq, None);
                    return;
                }
                Err(e) if attempt + 1 == attempts => {
                    log::error!(
                        "[reelboard.sync] Giving up after {} attempts: {}",
                        attempts,
                        e
                    );
                    self.record_outcome(seq, Some(e.to_string()));
                    return;
                }
                Err(e) => {
                    let delay = self.policy.delay_after(attempt);
                    log::warn!(
                        "[reelboard.sync] Attempt {} failed ({}), retrying in {:?}",
                        attempt + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

pub struct SyncEngine<R: RemoteColumns> {
    shared: Arc<Shared<R>>,
}

impl<R: RemoteColumns> Clone for SyncEngine<R> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<R: RemoteColumns> SyncEngine<R> {
    pub fn new(remote: R) -> Self {
        Self::with_policy(remote, RetryPolicy::default())
    }

    pub fn with_policy(remote: R, policy: RetryPolicy) -> Self {
        let (in_flight, _) = watch::channel(0usize);
        Self {
            shared: Arc::new(Shared {
                remote,
                policy,
                state: Mutex::new(SyncState {
                    board: Board::default_columns(),
                    loaded: false,
                    last_error: None,
                    write_seq: 0,
                }),
                in_flight,
            }),
        }
    }

    pub fn remote(&self) -> &R {
        &self.shared.remote
    }

    /// Fetch the remote board and make it live.
    ///
    /// On failure the default columns become live (so the session stays
    /// usable) and the error is both recorded and returned.
    pub async fn load(&self) -> Result<Board, SyncError> {
        match self.shared.remote.fetch_columns().await {
            Ok(board) => {
                self.install(board.clone());
                Ok(board)
            }
            Err(e) => {
                log::warn!("[reelboard.sync] Failed to fetch columns: {}", e);
                let mut state = self.shared.state();
                state.board = Board::default_columns();
                state.loaded = true;
                state.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }

    /// Replace the live board with a server-confirmed one, without syncing it back.
    pub(crate) fn install(&self, board: Board) {
        let mut state = self.shared.state();
        state.board = board;
        state.loaded = true;
        state.last_error = None;
    }

    pub fn is_loaded(&self) -> bool {
        self.shared.state().loaded
    }

    pub fn board(&self) -> Board {
        self.shared.state().board.clone()
    }

    pub fn last_error(&self) -> Option<String> {
        self.shared.state().last_error.clone()
    }

    pub fn status(&self) -> SyncStatus {
        let state = self.shared.state();
        SyncStatus {
            loading: !state.loaded,
            syncing: *self.shared.in_flight.borrow() > 0,
            last_error: state.last_error.clone(),
        }
    }

    /// Optimistically install `next` and persist it in the background.
    pub fn write(&self, next: impl Into<BoardWrite>) -> Result<(), SyncError> {
        let next = next.into();
        self.update(move |board| (next.resolve(board), ()))
    }

    /// Read-modify-write against the in-memory board. `f` runs under the
    /// state lock; its side output is returned once the board is installed.
    pub fn update<T>(&self, f: impl FnOnce(&Board) -> (Board, T)) -> Result<T, SyncError> {
        let (next, seq, out) = {
            let mut state = self.shared.state();
            if !state.loaded {
                return Err(SyncError::NotLoaded);
            }
            let (next, out) = f(&state.board);
            state.board = next.clone();
            state.write_seq += 1;
            (next, state.write_seq, out)
        };
        self.spawn_persist(next, seq);
        Ok(out)
    }

    fn spawn_persist(&self, board: Board, seq: u64) {
        self.shared.in_flight.send_modify(|n| *n += 1);
        let shared = self.shared.clone();
        tokio::spawn(async move {
            shared.persist(board, seq).await;
            shared.in_flight.send_modify(|n| *n = n.saturating_sub(1));
        });
    }

    /// Wait until every persistence task started so far has finished.
    pub async fn settled(&self) {
        let mut rx = self.shared.in_flight.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }
}

impl<R: RemoteColumns> BoardBackend for SyncEngine<R> {
    fn snapshot(&self) -> Board {
        self.board()
    }

    fn commit<T>(&self, f: impl FnOnce(&Board) -> (Board, T)) -> Result<T, BoardError> {
        self.update(f).map_err(|_| BoardError::Loading)
    }
}
