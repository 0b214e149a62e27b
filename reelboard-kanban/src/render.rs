use std::fmt::Write;

use reelboard_core::board::ViewedItem;
use reelboard_core::types::Board;

use crate::session::SessionStatus;

/// Plain-text board listing, one section per column.
pub fn render_board(board: &Board) -> String {
    let mut out = String::new();
    for column in &board.columns {
        let _ = writeln!(
            out,
            "== {} [{}] ({}) - {} ==",
            column.title,
            column.color,
            column.id,
            column.items.len()
        );
        if column.items.is_empty() {
            out.push_str("   No items yet...\n");
        }
        for item in &column.items {
            let _ = writeln!(out, " - {}  ({})", item.title, item.id);
            if let Some(first) = item.description.lines().find(|l| !l.trim().is_empty()) {
                let _ = writeln!(out, "     {}", first.trim());
            }
        }
        out.push('\n');
    }
    out
}

/// Detail view of the open item: title, section and full description.
pub fn render_item(board: &Board, view: &ViewedItem) -> String {
    let mut out = String::new();
    let Some(column) = board.column(&view.column_id) else {
        return out;
    };
    let Some(item) = column.find_item(&view.item_id) else {
        return out;
    };
    let _ = writeln!(out, "{}  ({})", item.title, item.id);
    let _ = writeln!(out, "in {} [{}] ({})", column.title, column.color, column.id);
    if !item.description.trim().is_empty() {
        out.push('\n');
        out.push_str(item.description.trim_end());
        out.push('\n');
    }
    out
}

pub fn render_status(status: &SessionStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "mode:    {}", status.mode);
    let _ = writeln!(out, "board:   {} columns, {} items", status.columns, status.items);
    if status.sync.syncing {
        out.push_str("sync:    saving...\n");
    }
    if let Some(error) = &status.sync.last_error {
        let _ = writeln!(out, "error:   {}", error);
    }
    if let Some(offer) = &status.migration_offer {
        let _ = writeln!(
            out,
            "migrate: {} items in {} local columns can be moved to the cloud (run `reelboard migrate`)",
            offer.items, offer.columns
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelboard_core::types::{Column, Item};

    #[test]
    fn test_render_board_lists_items_and_empty_columns() {
        let mut ideas = Column::new("c1", "Ideas", "yellow");
        ideas.items.push(Item {
            id: "i1".to_string(),
            title: "Studio tour".to_string(),
            description: "\n## Hook\nstart wide".to_string(),
        });
        let board = Board::new(vec![ideas, Column::new("c2", "Posted", "green")]);

        let text = render_board(&board);
        assert!(text.contains("== Ideas [yellow] (c1) - 1 =="));
        assert!(text.contains(" - Studio tour  (i1)"));
        assert!(text.contains("     ## Hook"));
        assert!(text.contains("== Posted [green] (c2) - 0 ==\n   No items yet..."));
    }

    #[test]
    fn test_render_item_shows_full_description() {
        let mut ideas = Column::new("c1", "Ideas", "yellow");
        ideas.items.push(Item {
            id: "i1".to_string(),
            title: "Studio tour".to_string(),
            description: "## Hook\nstart wide\n".to_string(),
        });
        let board = Board::new(vec![ideas]);
        let view = ViewedItem {
            item_id: "i1".to_string(),
            column_id: "c1".to_string(),
        };
        assert_eq!(
            render_item(&board, &view),
            "Studio tour  (i1)\nin Ideas [yellow] (c1)\n\n## Hook\nstart wide\n"
        );
        let gone = ViewedItem {
            item_id: "i9".to_string(),
            column_id: "c1".to_string(),
        };
        assert_eq!(render_item(&board, &gone), "");
    }
}
