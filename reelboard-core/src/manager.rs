/// Board state manager: runs [`BoardAction`]s against whichever backend is
/// live for the current identity and tracks the item open in the detail view.
use std::sync::Mutex;

use thiserror::Error;

use crate::board::{BoardAction, Direction, ViewedItem};
use crate::types::{Board, Item};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    /// The initial remote read has not finished; mutations are deferred.
    #[error("Board is still loading")]
    Loading,
}

/// Storage that holds the live board.
///
/// `commit` must resolve `f` against the latest board and install the result
/// atomically with respect to other commits on the same backend.
pub trait BoardBackend {
    fn snapshot(&self) -> Board;

    fn commit<R>(&self, f: impl FnOnce(&Board) -> (Board, R)) -> Result<R, BoardError>;
}

pub struct BoardManager<B: BoardBackend> {
    backend: B,
    viewing: Mutex<Option<ViewedItem>>,
}

impl<B: BoardBackend> BoardManager<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            viewing: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn board(&self) -> Board {
        self.backend.snapshot()
    }

    pub fn viewing(&self) -> Option<ViewedItem> {
        self.viewing.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn open_item(&self, column_id: &str, item_id: &str) {
        *self.viewing.lock().unwrap_or_else(|e| e.into_inner()) = Some(ViewedItem {
            item_id: item_id.to_string(),
            column_id: column_id.to_string(),
        });
    }

    pub fn close_item(&self) {
        *self.viewing.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Run one action; the board and the view pointer change together.
    pub fn dispatch(&self, action: BoardAction) -> Result<(), BoardError> {
        let mut viewing = self.viewing.lock().unwrap_or_else(|e| e.into_inner());
        let current_view = viewing.clone();
        let next_view = self
            .backend
            .commit(|board| action.transition(board, current_view.as_ref()))?;
        *viewing = next_view;
        Ok(())
    }

    pub fn add_column(&self, title: &str, color: &str) -> Result<(), BoardError> {
        self.dispatch(BoardAction::add_column(title, color))
    }

    pub fn rename_column(&self, column_id: &str, title: &str) -> Result<(), BoardError> {
        self.dispatch(BoardAction::rename_column(column_id, title))
    }

    pub fn delete_column(&self, column_id: &str) -> Result<(), BoardError> {
        self.dispatch(BoardAction::delete_column(column_id))
    }

    pub fn add_item(&self, column_id: &str, title: &str) -> Result<(), BoardError> {
        self.dispatch(BoardAction::add_item(column_id, title))
    }

    pub fn update_item(&self, item: Item) -> Result<(), BoardError> {
        self.dispatch(BoardAction::update_item(item))
    }

    pub fn delete_item(&self, column_id: &str, item_id: &str) -> Result<(), BoardError> {
        self.dispatch(BoardAction::delete_item(column_id, item_id))
    }

    pub fn move_item(
        &self,
        from_column_id: &str,
        item_id: &str,
        direction: Direction,
    ) -> Result<(), BoardError> {
        self.dispatch(BoardAction::move_item(from_column_id, item_id, direction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::{LocalBoardStore, MemoryKeyValueStore};

    fn manager() -> BoardManager<LocalBoardStore<MemoryKeyValueStore>> {
        BoardManager::new(LocalBoardStore::open(MemoryKeyValueStore::new()))
    }

    #[test]
    fn test_dispatch_through_local_backend() {
        let m = manager();
        m.add_item("col-ideas", "Idea").unwrap();
        m.add_column("Editing", "purple").unwrap();
        let board = m.board();
        assert_eq!(board.len(), 5);
        assert_eq!(board.columns[3].title, "Editing");
        assert_eq!(board.columns[0].items[0].title, "Idea");
    }

    #[test]
    fn test_move_updates_view_atomically() {
        let m = manager();
        m.add_item("col-ideas", "Idea").unwrap();
        let item_id = m.board().columns[0].items[0].id.clone();
        m.open_item("col-ideas", &item_id);

        m.move_item("col-ideas", &item_id, Direction::Right).unwrap();
        assert_eq!(m.viewing().unwrap().column_id, "col-scripting");
        assert_eq!(m.board().columns[1].items[0].id, item_id);

        m.delete_item("col-scripting", &item_id).unwrap();
        assert!(m.viewing().is_none());
    }
}
