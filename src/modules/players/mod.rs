use async_trait::async_trait;
use axum::{extract::State, routing::get, Json, Router};
use bookquest_db::{Query, SharedStore};
use bookquest_http::AppError;
use bookquest_kernel::{InitCtx, Module};
use serde::Serialize;
use serde_json::json;

use crate::models::{decode_rows, Player, PLAYERS_TABLE};

/// Players module: read-only access to the challenge roster
pub struct PlayersModule {
    store: SharedStore,
}

impl PlayersModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for PlayersModule {
    fn name(&self) -> &'static str {
        "players"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = self.store.backend(),
            "players module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/players", get(list_players))
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/players": {
                    "get": {
                        "summary": "List players",
                        "tags": ["Players"],
                        "responses": {
                            "200": {
                                "description": "Every registered player",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": {
                                                "players": {
                                                    "type": "array",
                                                    "items": { "$ref": "#/components/schemas/Player" }
                                                }
                                            }
                                        }
                                    }
                                }
                            },
                            "500": {
                                "description": "Store error",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Player": {
                        "type": "object",
                        "properties": {
                            "id": { "description": "Player identifier (integer or string)" },
                            "name": { "type": "string" },
                            "email": { "type": "string", "format": "email" },
                            "total_points": { "type": "number" }
                        },
                        "required": ["id"]
                    }
                }
            }
        }))
    }
}

#[derive(Debug, Serialize)]
pub struct PlayersResponse {
    pub players: Vec<Player>,
}

/// `GET /api/players`
async fn list_players(State(store): State<SharedStore>) -> Result<Json<PlayersResponse>, AppError> {
    let rows = store.select(PLAYERS_TABLE, &Query::all()).await?;
    let players = decode_rows(rows, PLAYERS_TABLE)?;
    Ok(Json(PlayersResponse { players }))
}

/// Create a new instance of the players module
pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(PlayersModule::new(store))
}
