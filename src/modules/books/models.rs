use bookquest_db::Row;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::models::{LoggedBook, RecordId};

/// Query string of `GET /api/my-books`.
#[derive(Debug, Deserialize)]
pub struct MyBooksQuery {
    pub player_id: Option<String>,
}

/// Query string of `GET /api/player-books`.
#[derive(Debug, Deserialize)]
pub struct PlayerBooksQuery {
    pub player_name: Option<String>,
}

/// Body of `POST /api/submit-book`. Book fields are stored as sent, explicit
/// nulls included.
#[derive(Debug, Default, Deserialize)]
pub struct SubmitBook {
    #[serde(default)]
    pub player_id: Option<RecordId>,
    #[serde(default, deserialize_with = "present")]
    pub player_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub pages: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub year_published: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub completed: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub genre: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub rating: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    pub points: Option<Value>,
}

/// `Some` for any field that appears in the body, `null` included.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl SubmitBook {
    /// Row to insert for `owner`; absent fields are left to store defaults.
    pub fn into_row(self, owner: &RecordId) -> Row {
        let mut row = Row::new();
        row.insert("player_id".to_string(), owner.to_value());

        let fields = [
            ("player_name", self.player_name.map(Value::from)),
            ("title", self.title),
            ("pages", self.pages),
            ("year_published", self.year_published),
            ("completed", self.completed),
            ("genre", self.genre),
            ("rating", self.rating),
            ("points", self.points),
        ];
        for (column, value) in fields {
            if let Some(value) = value {
                row.insert(column.to_string(), value);
            }
        }
        row
    }
}

/// Body of `PUT /api/update-book/{book_id}`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBook {
    #[serde(default)]
    pub current_user_id: Option<RecordId>,
    #[serde(default)]
    pub updated_book_data: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct BooksResponse {
    pub books: Vec<LoggedBook>,
}

#[derive(Debug, Serialize)]
pub struct SubmittedBook {
    pub message: &'static str,
    pub book: LoggedBook,
}

#[derive(Debug, Serialize)]
pub struct UpdatedBook {
    pub message: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn submit_row_skips_absent_fields() {
        let submit: SubmitBook = serde_json::from_value(json!({
            "player_id": 4,
            "title": "Beloved",
            "pages": "324"
        }))
        .unwrap();

        let row = submit.into_row(&RecordId::Int(4));
        assert_eq!(
            serde_json::Value::Object(row),
            json!({"player_id": 4, "title": "Beloved", "pages": "324"})
        );
    }

    #[test]
    fn submit_row_keeps_explicit_nulls() {
        let submit: SubmitBook = serde_json::from_value(json!({
            "player_id": 4,
            "title": "Beloved",
            "rating": null,
            "player_name": null
        }))
        .unwrap();

        assert_eq!(submit.rating, Some(Value::Null));
        assert_eq!(submit.genre, None);

        let row = submit.into_row(&RecordId::Int(4));
        assert_eq!(
            serde_json::Value::Object(row),
            json!({"player_id": 4, "player_name": null, "title": "Beloved", "rating": null})
        );
    }

    #[test]
    fn update_body_uses_camel_case() {
        let update: UpdateBook = serde_json::from_value(json!({
            "currentUserId": "p-9",
            "updatedBookData": {"rating": 5}
        }))
        .unwrap();

        assert_eq!(update.current_user_id, Some(RecordId::Text("p-9".to_string())));
        assert_eq!(update.updated_book_data, Some(json!({"rating": 5})));
    }
}
