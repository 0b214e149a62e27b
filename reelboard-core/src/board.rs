/// Board state transitions.
///
/// Every mutation is a pure `&Board -> Board` function so it composes the same
/// way whether the local store or the sync engine holds the live board.
/// Fresh ids are generated when the action is built, not when it is applied,
/// so applying an action twice to the same board gives the same result.
use serde::{Deserialize, Serialize};

use crate::types::{Board, Column, Item};

/// Unique id with a type prefix: `<prefix>-<unix millis>-<9 random chars>`.
pub fn generate_id(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}-{}", prefix, millis, &random[..9])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn offset(self) -> isize {
        match self {
            Direction::Left => -1,
            Direction::Right => 1,
        }
    }
}

/// The item currently open in the detail view, with the column it lives in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewedItem {
    pub item_id: String,
    pub column_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardAction {
    AddColumn { column: Column },
    RenameColumn { column_id: String, title: String },
    DeleteColumn { column_id: String },
    AddItem { column_id: String, item: Item },
    UpdateItem { item: Item },
    DeleteItem { column_id: String, item_id: String },
    MoveItem {
        from_column_id: String,
        item_id: String,
        direction: Direction,
    },
}

impl BoardAction {
    pub fn add_column(title: &str, color: &str) -> Self {
        BoardAction::AddColumn {
            column: Column::new(generate_id("col"), title.trim(), color.trim()),
        }
    }

    pub fn rename_column(column_id: &str, title: &str) -> Self {
        BoardAction::RenameColumn {
            column_id: column_id.to_string(),
            title: title.to_string(),
        }
    }

    pub fn delete_column(column_id: &str) -> Self {
        BoardAction::DeleteColumn {
            column_id: column_id.to_string(),
        }
    }

    pub fn add_item(column_id: &str, title: &str) -> Self {
        BoardAction::AddItem {
            column_id: column_id.to_string(),
            item: Item {
                id: generate_id("item"),
                title: title.trim().to_string(),
                description: String::new(),
            },
        }
    }

    pub fn update_item(item: Item) -> Self {
        BoardAction::UpdateItem { item }
    }

    pub fn delete_item(column_id: &str, item_id: &str) -> Self {
        BoardAction::DeleteItem {
            column_id: column_id.to_string(),
            item_id: item_id.to_string(),
        }
    }

    pub fn move_item(from_column_id: &str, item_id: &str, direction: Direction) -> Self {
        BoardAction::MoveItem {
            from_column_id: from_column_id.to_string(),
            item_id: item_id.to_string(),
            direction,
        }
    }

    /// Apply the action, returning the next board. Rejected actions return
    /// an unchanged copy.
    pub fn apply(&self, board: &Board) -> Board {
        match self {
            BoardAction::AddColumn { column } => {
                if column.title.is_empty() || column.color.is_empty() {
                    return board.clone();
                }
                let mut next = board.clone();
                let at = next.columns.len().saturating_sub(1);
                next.columns.insert(at, column.clone());
                next
            }
            BoardAction::RenameColumn { column_id, title } => {
                let title = title.trim();
                let mut next = board.clone();
                if let Some(col) = next.columns.iter_mut().find(|c| &c.id == column_id) {
                    if !title.is_empty() && col.title != title {
                        col.title = title.to_string();
                    }
                }
                next
            }
            BoardAction::DeleteColumn { column_id } => Board::new(
                board
                    .columns
                    .iter()
                    .filter(|c| &c.id != column_id)
                    .cloned()
                    .collect(),
            ),
            BoardAction::AddItem { column_id, item } => {
                let mut next = board.clone();
                if item.title.is_empty() {
                    return next;
                }
                if let Some(col) = next.columns.iter_mut().find(|c| &c.id == column_id) {
                    col.items.push(item.clone());
                }
                next
            }
            BoardAction::UpdateItem { item } => {
                let mut next = board.clone();
                for existing in next.columns.iter_mut().flat_map(|c| c.items.iter_mut()) {
                    if existing.id == item.id {
                        *existing = item.clone();
                    }
                }
                next
            }
            BoardAction::DeleteItem { column_id, item_id } => {
                let mut next = board.clone();
                if let Some(col) = next.columns.iter_mut().find(|c| &c.id == column_id) {
                    col.items.retain(|i| &i.id != item_id);
                }
                next
            }
            BoardAction::MoveItem {
                from_column_id,
                item_id,
                direction,
            } => match move_target(board, from_column_id, item_id, *direction) {
                Some((from, to, pos)) => {
                    let mut next = board.clone();
                    let item = next.columns[from].items.remove(pos);
                    next.columns[to].items.push(item);
                    next
                }
                None => board.clone(),
            },
        }
    }

    /// Apply the action and update the viewed-item pointer in the same step.
    ///
    /// Moving the viewed item re-points the view at the destination column;
    /// deleting the viewed item, or the column holding it, closes the view.
    pub fn transition(
        &self,
        board: &Board,
        viewing: Option<&ViewedItem>,
    ) -> (Board, Option<ViewedItem>) {
        let next_view = match (self, viewing) {
            (_, None) => None,
            (
                BoardAction::MoveItem {
                    from_column_id,
                    item_id,
                    direction,
                },
                Some(view),
            ) if &view.item_id == item_id => {
                match move_target(board, from_column_id, item_id, *direction) {
                    Some((_, to, _)) => Some(ViewedItem {
                        item_id: item_id.clone(),
                        column_id: board.columns[to].id.clone(),
                    }),
                    None => Some(view.clone()),
                }
            }
            (BoardAction::DeleteItem { item_id, .. }, Some(view)) if &view.item_id == item_id => {
                None
            }
            (BoardAction::DeleteColumn { column_id }, Some(view))
                if &view.column_id == column_id =>
            {
                None
            }
            (_, Some(view)) => Some(view.clone()),
        };
        (self.apply(board), next_view)
    }
}

/// Resolve a move to `(from_index, to_index, item_position)`, or `None`
/// when the move must be rejected.
fn move_target(
    board: &Board,
    from_column_id: &str,
    item_id: &str,
    direction: Direction,
) -> Option<(usize, usize, usize)> {
    let from = board.column_index(from_column_id)?;
    let to = from.checked_add_signed(direction.offset())?;
    if to >= board.len() {
        return None;
    }
    let pos = board.columns[from].items.iter().position(|i| i.id == item_id)?;
    Some((from, to, pos))
}
