//! Records shared by the API modules.

use std::fmt;

use anyhow::Context;
use bookquest_db::Row;
use serde::{de::DeserializeOwned, Deserialize, Serialize, Serializer};
use serde_json::Value;

pub const PLAYERS_TABLE: &str = "players";
pub const BOOKS_TABLE: &str = "books";

/// Store identifier; hosted tables use integer keys, imported ones use text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Empty or whitespace-only text does not identify anything.
    pub fn is_blank(&self) -> bool {
        match self {
            RecordId::Int(_) => false,
            RecordId::Text(text) => text.trim().is_empty(),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(id) => Value::from(*id),
            RecordId::Text(text) => Value::from(text.as_str()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Text(text) => f.write_str(text.trim()),
        }
    }
}

/// A challenge participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: RecordId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub total_points: Value,
    /// Columns this service does not interpret.
    #[serde(flatten)]
    pub extra: Row,
}

/// One book logged by a player. Scoring fields are stored as submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedBook {
    pub id: RecordId,
    #[serde(default)]
    pub player_id: Option<RecordId>,
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub pages: Value,
    #[serde(default)]
    pub year_published: Value,
    #[serde(default)]
    pub completed: Value,
    #[serde(default)]
    pub genre: Value,
    #[serde(default)]
    pub rating: Value,
    #[serde(default)]
    pub points: Value,
    #[serde(flatten)]
    pub extra: Row,
}

impl LoggedBook {
    /// Whether `caller` is the player the book was logged for.
    pub fn is_owned_by(&self, caller: &RecordId) -> bool {
        self.player_id
            .as_ref()
            .is_some_and(|owner| owner.to_string() == caller.to_string())
    }
}

/// Point total rendered as a JSON integer when it has no fractional part.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Points(pub f64);

impl Points {
    /// Largest magnitude an `f64` holds without losing integer precision.
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;

    pub fn value(self) -> f64 {
        self.0
    }

    /// Round to two decimal places, for averages.
    pub fn rounded(value: f64) -> Self {
        Self((value * 100.0).round() / 100.0)
    }
}

impl Serialize for Points {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let value = self.0;
        if value.is_finite() && value.fract() == 0.0 && value.abs() < Self::MAX_EXACT {
            serializer.serialize_i64(value as i64)
        } else {
            serializer.serialize_f64(value)
        }
    }
}

/// Decode raw store rows into typed records.
pub fn decode_rows<T: DeserializeOwned>(rows: Vec<Row>, table: &str) -> anyhow::Result<Vec<T>> {
    rows.into_iter()
        .map(|row| {
            serde_json::from_value(Value::Object(row))
                .with_context(|| format!("malformed row in '{}'", table))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_ids_compare_by_text() {
        let int: RecordId = serde_json::from_value(json!(12)).unwrap();
        let text: RecordId = serde_json::from_value(json!("12")).unwrap();
        assert_eq!(int.to_string(), text.to_string());
        assert!(RecordId::Text("  ".to_string()).is_blank());
        assert!(!RecordId::Int(0).is_blank());
    }

    #[test]
    fn book_keeps_unknown_columns_and_raw_values() {
        let row = json!({
            "id": 3,
            "player_id": "p-1",
            "title": "Middlemarch",
            "pages": "880",
            "created_at": "2025-01-02T00:00:00Z"
        });
        let book: LoggedBook = serde_json::from_value(row).unwrap();

        assert_eq!(book.pages, json!("880"));
        assert_eq!(book.extra.get("created_at"), Some(&json!("2025-01-02T00:00:00Z")));
        assert!(book.is_owned_by(&RecordId::Text("p-1".to_string())));
        assert!(!book.is_owned_by(&RecordId::Text("p-2".to_string())));

        let rendered = serde_json::to_value(&book).unwrap();
        assert_eq!(rendered["created_at"], "2025-01-02T00:00:00Z");
        assert_eq!(rendered["title"], "Middlemarch");
    }

    #[test]
    fn book_without_owner_is_owned_by_nobody() {
        let book: LoggedBook = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(!book.is_owned_by(&RecordId::Int(1)));
    }

    #[test]
    fn points_render_whole_numbers_as_integers() {
        assert_eq!(serde_json::to_value(Points(17.0)).unwrap(), json!(17));
        assert_eq!(serde_json::to_value(Points(2.5)).unwrap(), json!(2.5));
        assert_eq!(Points::rounded(10.0 / 3.0), Points(3.33));
    }
}
