pub mod models;

use async_trait::async_trait;
use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query as QueryParams, State,
    },
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use bookquest_db::{Filter, Query, SharedStore};
use bookquest_http::AppError;
use bookquest_kernel::{InitCtx, Module};
use serde_json::{json, Value};

use crate::models::{decode_rows, LoggedBook, BOOKS_TABLE};
use crate::utils::non_blank;
use models::{
    BooksResponse, MyBooksQuery, PlayerBooksQuery, SubmitBook, SubmittedBook, UpdateBook,
    UpdatedBook,
};

/// Books module: the reading log players submit to and edit
pub struct BooksModule {
    store: SharedStore,
}

impl BooksModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/books", get(list_books))
            .route("/my-books", get(my_books))
            .route("/player-books", get(player_books))
            .route("/submit-book", post(submit_book))
            .route("/update-book/{book_id}", put(update_book))
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        let error = |description: &str| {
            json!({
                "description": description,
                "content": {
                    "application/json": {
                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                    }
                }
            })
        };
        let books_list = json!({
            "description": "Logged books",
            "content": {
                "application/json": {
                    "schema": {
                        "type": "object",
                        "properties": {
                            "books": {
                                "type": "array",
                                "items": { "$ref": "#/components/schemas/LoggedBook" }
                            }
                        }
                    }
                }
            }
        });

        Some(json!({
            "paths": {
                "/books": {
                    "get": {
                        "summary": "List every logged book",
                        "tags": ["Books"],
                        "responses": {
                            "200": books_list,
                            "500": error("Store error")
                        }
                    }
                },
                "/my-books": {
                    "get": {
                        "summary": "List books logged by a player id",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "player_id",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": books_list,
                            "400": error("Missing player_id"),
                            "500": error("Store error")
                        }
                    }
                },
                "/player-books": {
                    "get": {
                        "summary": "List books logged under a player name",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "player_name",
                            "in": "query",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "responses": {
                            "200": books_list,
                            "400": error("Missing player_name"),
                            "404": error("No books for that player"),
                            "500": error("Store error")
                        }
                    }
                },
                "/submit-book": {
                    "post": {
                        "summary": "Log a book",
                        "tags": ["Books"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/SubmitBook" }
                                }
                            }
                        },
                        "responses": {
                            "201": { "description": "Book logged" },
                            "400": error("Missing player_id"),
                            "500": error("Store error")
                        }
                    }
                },
                "/update-book/{book_id}": {
                    "put": {
                        "summary": "Edit a book owned by the caller",
                        "tags": ["Books"],
                        "parameters": [{
                            "name": "book_id",
                            "in": "path",
                            "required": true,
                            "schema": { "type": "string" }
                        }],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/UpdateBook" }
                                }
                            }
                        },
                        "responses": {
                            "200": { "description": "Book updated" },
                            "400": error("Malformed update"),
                            "401": error("No caller id"),
                            "403": error("Caller does not own the book"),
                            "404": error("Book not found"),
                            "500": error("Store error")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "LoggedBook": {
                        "type": "object",
                        "properties": {
                            "id": {},
                            "player_id": {},
                            "player_name": { "type": "string" },
                            "title": {},
                            "pages": {},
                            "year_published": {},
                            "completed": {},
                            "genre": {},
                            "rating": {},
                            "points": {}
                        },
                        "required": ["id"]
                    },
                    "SubmitBook": {
                        "type": "object",
                        "properties": {
                            "player_id": { "description": "Owner; integer or string" },
                            "player_name": { "type": "string" },
                            "title": {},
                            "pages": {},
                            "year_published": {},
                            "completed": {},
                            "genre": {},
                            "rating": {},
                            "points": {}
                        },
                        "required": ["player_id"]
                    },
                    "UpdateBook": {
                        "type": "object",
                        "properties": {
                            "currentUserId": { "description": "Caller's player id" },
                            "updatedBookData": { "type": "object" }
                        },
                        "required": ["currentUserId", "updatedBookData"]
                    }
                }
            }
        }))
    }
}

/// `GET /api/books`
async fn list_books(State(store): State<SharedStore>) -> Result<Json<BooksResponse>, AppError> {
    let rows = store.select(BOOKS_TABLE, &Query::all()).await?;
    let books = decode_rows(rows, BOOKS_TABLE)?;
    Ok(Json(BooksResponse { books }))
}

/// `GET /api/my-books?player_id=`
async fn my_books(
    State(store): State<SharedStore>,
    params: Result<QueryParams<MyBooksQuery>, QueryRejection>,
) -> Result<Json<BooksResponse>, AppError> {
    let QueryParams(params) = params?;
    let player_id = non_blank(params.player_id.as_deref())
        .ok_or_else(|| AppError::bad_request("player_id is required"))?;

    let rows = store
        .select(BOOKS_TABLE, &Query::all().eq("player_id", player_id))
        .await?;
    let books = decode_rows(rows, BOOKS_TABLE)?;
    Ok(Json(BooksResponse { books }))
}

/// `GET /api/player-books?player_name=`
async fn player_books(
    State(store): State<SharedStore>,
    params: Result<QueryParams<PlayerBooksQuery>, QueryRejection>,
) -> Result<Json<BooksResponse>, AppError> {
    let QueryParams(params) = params?;
    let player_name = non_blank(params.player_name.as_deref())
        .ok_or_else(|| AppError::bad_request("player_name is required"))?;

    let rows = store
        .select(BOOKS_TABLE, &Query::all().eq("player_name", player_name))
        .await?;
    if rows.is_empty() {
        return Err(AppError::not_found(format!(
            "no books logged for player '{}'",
            player_name
        )));
    }

    let books = decode_rows(rows, BOOKS_TABLE)?;
    Ok(Json(BooksResponse { books }))
}

/// `POST /api/submit-book`
async fn submit_book(
    State(store): State<SharedStore>,
    payload: Result<Json<SubmitBook>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmittedBook>), AppError> {
    let Json(submission) = payload?;
    let owner = submission
        .player_id
        .clone()
        .filter(|id| !id.is_blank())
        .ok_or_else(|| AppError::bad_request("player_id is required"))?;

    let row = submission.into_row(&owner);
    let inserted = store.insert(BOOKS_TABLE, row).await?;
    let book: LoggedBook = serde_json::from_value(Value::Object(inserted))
        .map_err(|e| anyhow::anyhow!("malformed row returned by insert: {}", e))?;

    tracing::info!(book_id = %book.id, player_id = %owner, "book submitted");
    Ok((
        StatusCode::CREATED,
        Json(SubmittedBook {
            message: "Book submitted successfully",
            book,
        }),
    ))
}

/// `PUT /api/update-book/{book_id}`
///
/// Checks run in a fixed order: caller present, book exists, caller owns it,
/// patch is well formed.
async fn update_book(
    State(store): State<SharedStore>,
    Path(book_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UpdatedBook>, AppError> {
    let update = parse_update(&headers, &body)?;
    let caller = update
        .current_user_id
        .filter(|id| !id.is_blank())
        .ok_or_else(|| AppError::unauthorized("currentUserId is required"))?;

    let rows = store
        .select(BOOKS_TABLE, &Query::all().eq("id", book_id.as_str()))
        .await?;
    let book = decode_rows::<LoggedBook>(rows, BOOKS_TABLE)?
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(format!("book '{}' not found", book_id)))?;

    if !book.is_owned_by(&caller) {
        tracing::warn!(book_id = %book.id, caller = %caller, "update attempted by non-owner");
        return Err(AppError::forbidden("you can only update your own books"));
    }

    let mut patch = match update.updated_book_data {
        Some(Value::Object(patch)) => patch,
        _ => return Err(AppError::bad_request("updatedBookData must be a JSON object")),
    };
    patch.remove("id");
    if let Some(new_owner) = patch.get("player_id") {
        let unchanged = bookquest_db::query::value_text(new_owner)
            .is_some_and(|text| text.trim() == caller.to_string());
        if !unchanged {
            return Err(AppError::forbidden("a book cannot be moved to another player"));
        }
    }
    if patch.is_empty() {
        return Err(AppError::bad_request("updatedBookData has no fields to update"));
    }

    let updated = store
        .update(BOOKS_TABLE, &[Filter::eq("id", book_id.as_str())], patch)
        .await?;
    if updated.is_empty() {
        return Err(AppError::not_found(format!("book '{}' not found", book_id)));
    }

    tracing::info!(book_id = %book.id, player_id = %caller, "book updated");
    Ok(Json(UpdatedBook {
        message: "Book updated successfully",
    }))
}

/// An empty or non-JSON body reads as an update with no caller, so it is
/// answered with 401 like any other anonymous request.
fn parse_update(headers: &HeaderMap, body: &Bytes) -> Result<UpdateBook, AppError> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("application/json")
        });
    if !is_json || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(UpdateBook::default());
    }

    let Json(update) = Json::<UpdateBook>::from_bytes(body)?;
    Ok(update)
}

/// Create a new instance of the books module
pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(store))
}
