/// Structural validation gate for board payloads.
///
/// Every remote write (sync PUT and migration) passes through here first.
/// A payload is accepted whole or rejected whole; nothing is partially applied.
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{Board, Column};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("columns must be an array")]
    NotAnArray,

    #[error("column {index}: {reason}")]
    Column { index: usize, reason: String },

    #[error("column {column} item {index}: {reason}")]
    Item {
        column: usize,
        index: usize,
        reason: String,
    },
}

/// Validate an untyped payload and convert it into a typed board.
pub fn validate_columns(value: &Value) -> Result<Board, ValidationError> {
    let columns = value.as_array().ok_or(ValidationError::NotAnArray)?;

    let mut board = Vec::with_capacity(columns.len());
    for (index, raw) in columns.iter().enumerate() {
        board.push(validate_column(index, raw)?);
    }
    Ok(Board::new(board))
}

pub fn is_valid(value: &Value) -> bool {
    validate_columns(value).is_ok()
}

fn validate_column(index: usize, raw: &Value) -> Result<Column, ValidationError> {
    let column_err = |reason: &str| ValidationError::Column {
        index,
        reason: reason.to_string(),
    };

    let obj = raw.as_object().ok_or_else(|| column_err("must be an object"))?;
    let id = non_empty_str(obj, "id").ok_or_else(|| column_err("missing or empty id"))?;
    let title = non_empty_str(obj, "title").ok_or_else(|| column_err("missing or empty title"))?;
    let color = non_empty_str(obj, "color").ok_or_else(|| column_err("missing or empty color"))?;
    let items = obj
        .get("items")
        .and_then(Value::as_array)
        .ok_or_else(|| column_err("items must be an array"))?;

    let mut column = Column::new(id, title, color);
    for (item_index, item) in items.iter().enumerate() {
        let item_err = |reason: &str| ValidationError::Item {
            column: index,
            index: item_index,
            reason: reason.to_string(),
        };
        let item_obj = item.as_object().ok_or_else(|| item_err("must be an object"))?;
        let item_id =
            non_empty_str(item_obj, "id").ok_or_else(|| item_err("missing or empty id"))?;
        let item_title = item_obj
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| item_err("title must be a string"))?;
        let description = match item_obj.get("description") {
            None => "",
            Some(Value::String(s)) => s.as_str(),
            Some(_) => return Err(item_err("description must be a string")),
        };
        column.items.push(crate::types::Item {
            id: item_id.to_string(),
            title: item_title.to_string(),
            description: description.to_string(),
        });
    }
    Ok(column)
}

fn non_empty_str<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

impl Board {
    /// Apply the same rules as [`validate_columns`] to an already typed board.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (index, col) in self.columns.iter().enumerate() {
            let reason = if col.id.is_empty() {
                Some("missing or empty id")
            } else if col.title.is_empty() {
                Some("missing or empty title")
            } else if col.color.is_empty() {
                Some("missing or empty color")
            } else {
                None
            };
            if let Some(reason) = reason {
                return Err(ValidationError::Column {
                    index,
                    reason: reason.to_string(),
                });
            }
            if let Some(item_index) = col.items.iter().position(|i| i.id.is_empty()) {
                return Err(ValidationError::Item {
                    column: index,
                    index: item_index,
                    reason: "missing or empty id".to_string(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_board_is_accepted() {
        let value = json!([
            {"id": "c1", "title": "Ideas", "color": "yellow", "items": [
                {"id": "i1", "title": "X"},
                {"id": "i2", "title": "", "description": "body"}
            ]},
            {"id": "c2", "title": "Posted", "color": "green", "items": [], "extra": true}
        ]);
        let board = validate_columns(&value).unwrap();
        assert_eq!(board.len(), 2);
        assert_eq!(board.columns[0].items[1].description, "body");
        assert!(board.validate().is_ok());
    }

    #[test]
    fn test_empty_board_is_valid() {
        assert!(is_valid(&json!([])));
    }

    #[test]
    fn test_non_array_rejected() {
        assert_eq!(
            validate_columns(&json!({"columns": []})),
            Err(ValidationError::NotAnArray)
        );
        assert!(!is_valid(&Value::Null));
    }

    #[test]
    fn test_column_missing_required_fields() {
        for field in ["id", "title", "color"] {
            let mut col = json!({"id": "c1", "title": "Ideas", "color": "yellow", "items": []});
            col.as_object_mut().unwrap().remove(field);
            let err = validate_columns(&json!([col])).unwrap_err();
            assert!(matches!(err, ValidationError::Column { index: 0, .. }), "{field}");
        }
    }

    #[test]
    fn test_column_items_must_be_array() {
        let value = json!([{"id": "c1", "title": "Ideas", "color": "yellow"}]);
        assert!(!is_valid(&value));
        let value = json!([{"id": "c1", "title": "Ideas", "color": "yellow", "items": {}}]);
        assert!(!is_valid(&value));
    }

    #[test]
    fn test_item_rules() {
        let base = |item: Value| {
            json!([{"id": "c1", "title": "Ideas", "color": "yellow", "items": [item]}])
        };
        assert!(!is_valid(&base(json!({"title": "X"}))));
        assert!(!is_valid(&base(json!({"id": "", "title": "X"}))));
        assert!(!is_valid(&base(json!({"id": "i1"}))));
        assert!(!is_valid(&base(json!({"id": "i1", "title": 3}))));
        assert!(!is_valid(&base(json!({"id": "i1", "title": "X", "description": null}))));
        assert!(is_valid(&base(json!({"id": "i1", "title": "X", "description": ""}))));
    }

    #[test]
    fn test_one_bad_column_rejects_whole_payload() {
        let value = json!([
            {"id": "c1", "title": "Ideas", "color": "yellow", "items": []},
            {"id": "c2", "title": "", "color": "blue", "items": []}
        ]);
        let err = validate_columns(&value).unwrap_err();
        assert_eq!(
            err,
            ValidationError::Column {
                index: 1,
                reason: "missing or empty title".to_string()
            }
        );
    }

    #[test]
    fn test_typed_board_validation() {
        let mut board = Board::default_columns();
        assert!(board.validate().is_ok());
        board.columns[2].color.clear();
        assert!(matches!(
            board.validate(),
            Err(ValidationError::Column { index: 2, .. })
        ));
    }
}
