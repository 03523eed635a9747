//! Rankings and reading statistics, both recomputed from the books table on
//! every request.

use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use bookquest_db::{query::value_text, Query, SharedStore, StoreError};
use bookquest_http::AppError;
use bookquest_kernel::{InitCtx, Module};
use serde::Serialize;
use serde_json::{json, Value};

use crate::models::{decode_rows, LoggedBook, BOOKS_TABLE};
use crate::ranking::{aggregate, Contribution, RankingEntry};
use crate::stats::{summarize, PlayerStats};

pub struct RankingsModule {
    store: SharedStore,
}

impl RankingsModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for RankingsModule {
    fn name(&self) -> &'static str {
        "rankings"
    }

    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "rankings module initialized");
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/rankings", get(rankings))
            .route("/player-stats", get(player_stats))
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

        Some(json!({
            "paths": {
                "/rankings": {
                    "get": {
                        "summary": "Players ranked by total points",
                        "description": "Totals are summed from logged books. Equal totals are ordered by player id.",
                        "tags": ["Rankings"],
                        "responses": {
                            "200": {
                                "description": "Ranking, highest total first",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "rankings": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/RankingEntry" }
                                                }
                                            }
                                        }
                                    }
                                }
                            },
                            "404": error("No books logged yet"),
                            "500": error("Store error")
                        }
                    }
                },
                "/player-stats": {
                    "get": {
                        "summary": "Reading statistics per player",
                        "tags": ["Rankings"],
                        "responses": {
                            "200": { "description": "Statistics, ordered like the rankings" },
                            "404": error("No books logged yet"),
                            "500": error("Store error")
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "RankingEntry": {
                        "type": "object",
                        "properties": {
                            "player_id": { "type": "string" },
                            "player_name": { "type": "string", "nullable": true },
                            "total_points": { "type": "number" }
                        },
                        "required": ["player_id", "total_points"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    pub rankings: Vec<RankingEntry>,
}

#[derive(Debug, Serialize)]
pub struct PlayerStatsResponse {
    pub stats: Vec<PlayerStats>,
}

/// Current ranking computed from every logged book's points.
pub async fn load_rankings(store: &SharedStore) -> Result<Vec<RankingEntry>, StoreError> {
    let query = Query::all().columns(["player_id", "player_name", "points"]);
    let rows = store.select(BOOKS_TABLE, &query).await?;

    let contributions = rows.into_iter().filter_map(|mut row| {
        let player_id = row
            .get("player_id")
            .and_then(value_text)
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())?;
        let player_name = match row.remove("player_name") {
            Some(Value::String(name)) => Some(name),
            _ => None,
        };
        let points = row.remove("points").unwrap_or(Value::Null);
        Some(Contribution::new(player_id, points).named(player_name))
    });

    Ok(aggregate(contributions))
}

/// `GET /api/rankings`
async fn rankings(State(store): State<SharedStore>) -> Result<Json<RankingsResponse>, AppError> {
    let rankings = load_rankings(&store).await?;
    if rankings.is_empty() {
        return Err(AppError::not_found("no rankings available yet"));
    }
    Ok(Json(RankingsResponse { rankings }))
}

/// `GET /api/player-stats`
async fn player_stats(
    State(store): State<SharedStore>,
) -> Result<Json<PlayerStatsResponse>, AppError> {
    let rows = store
        .select(BOOKS_TABLE, &Query::all().order_by("id", false))
        .await?;
    let books: Vec<LoggedBook> = decode_rows(rows, BOOKS_TABLE)?;

    let stats = summarize(&books);
    if stats.is_empty() {
        return Err(AppError::not_found("no statistics available yet"));
    }
    Ok(Json(PlayerStatsResponse { stats }))
}

pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(RankingsModule::new(store))
}
