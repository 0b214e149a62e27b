use serde::{Deserialize, Serialize};

/// Fixed local-storage key holding the anonymous board.
pub const LOCAL_BOARD_KEY: &str = "reelboard_columns";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    /// Markdown body. Older payloads may omit it entirely.
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub title: String,
    pub color: String,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Column {
    pub fn new(id: impl Into<String>, title: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            color: color.into(),
            items: Vec::new(),
        }
    }

    pub fn find_item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }
}

/// The ordered set of columns for one identity (or the anonymous session).
///
/// Serializes as a bare `Column[]`, which is both the local-storage format
/// and the value of the `columns` field on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    pub columns: Vec<Column>,
}

impl Board {
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// The four stages every new identity and every fresh local store starts with.
    pub fn default_columns() -> Self {
        Self::new(vec![
            Column::new("col-ideas", "Ideas", "yellow"),
            Column::new("col-scripting", "Scripting", "blue"),
            Column::new("col-filming", "Filming", "red"),
            Column::new("col-posted", "Posted", "green"),
        ])
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id)
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    /// Find an item anywhere on the board, returning it with its column id.
    pub fn find_item(&self, item_id: &str) -> Option<(&Column, &Item)> {
        self.columns
            .iter()
            .find_map(|col| col.find_item(item_id).map(|item| (col, item)))
    }

    /// True when at least one column holds at least one item.
    pub fn has_items(&self) -> bool {
        self.columns.iter().any(|c| !c.items.is_empty())
    }

    pub fn item_count(&self) -> usize {
        self.columns.iter().map(|c| c.items.len()).sum()
    }

    /// Case-insensitive search over item titles and descriptions.
    /// Columns are kept (possibly empty) so the board shape stays stable.
    /// A blank query returns the board unchanged.
    pub fn filter(&self, query: &str) -> Board {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return self.clone();
        }
        let columns = self
            .columns
            .iter()
            .map(|col| Column {
                items: col
                    .items
                    .iter()
                    .filter(|item| {
                        item.title.to_lowercase().contains(&query)
                            || item.description.to_lowercase().contains(&query)
                    })
                    .cloned()
                    .collect(),
                ..col.clone()
            })
            .collect();
        Board { columns }
    }
}

impl From<Vec<Column>> for Board {
    fn from(columns: Vec<Column>) -> Self {
        Self { columns }
    }
}

/// Wire envelope used by every column endpoint: `{ "columns": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnsPayload {
    pub columns: Board,
}

/// Response body of a successful migration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrateResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    pub columns: Board,
}
