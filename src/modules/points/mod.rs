//! Point calculation, delegated to the store's `calculate_points` procedure.

use anyhow::anyhow;
use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use bookquest_db::SharedStore;
use bookquest_http::AppError;
use bookquest_kernel::Module;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};

const SCORING_PROCEDURE: &str = "calculate_points";

pub struct PointsModule {
    store: SharedStore,
}

impl PointsModule {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for PointsModule {
    fn name(&self) -> &'static str {
        "points"
    }

    fn routes(&self) -> Router {
        Router::new()
            .route("/calculate-points", post(calculate_points))
            .with_state(self.store.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(json!({
            "paths": {
                "/calculate-points": {
                    "post": {
                        "summary": "Score a book",
                        "tags": ["Points"],
                        "requestBody": {
                            "required": true,
                            "content": {
                                "application/json": {
                                    "schema": {
                                        "type": "object",
                                        "properties": {
                                            "pages": { "type": "number" },
                                            "year_published": { "type": "number" },
                                            "completed": { "type": "boolean" },
                                            "is_fiction": { "type": "boolean" },
                                            "female_author": { "type": "boolean" },
                                            "alphabet_bonus": { "type": "boolean" },
                                            "genre_bonus": { "type": "boolean" },
                                            "country_bonus": { "type": "boolean" },
                                            "series_bonus": { "type": "boolean" },
                                            "deduction": { "type": "number" }
                                        },
                                        "required": ["pages", "year_published"]
                                    }
                                }
                            }
                        },
                        "responses": {
                            "200": {
                                "description": "Final points for the book",
                                "content": {
                                    "application/json": {
                                        "schema": {
                                            "type": "object",
                                            "properties": { "points": { "type": "number" } }
                                        }
                                    }
                                }
                            },
                            "400": {
                                "description": "pages or year_published is not a number",
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }))
    }
}

/// Body of `POST /api/calculate-points`. Only the two required fields are
/// type-checked; the flags go to the scoring procedure untouched.
#[derive(Debug, Deserialize)]
pub struct CalculatePoints {
    #[serde(default)]
    pub pages: Value,
    #[serde(default)]
    pub year_published: Value,
    #[serde(default)]
    pub completed: Option<Value>,
    #[serde(default)]
    pub is_fiction: Option<Value>,
    #[serde(default)]
    pub female_author: Option<Value>,
    #[serde(default)]
    pub alphabet_bonus: Option<Value>,
    #[serde(default)]
    pub genre_bonus: Option<Value>,
    #[serde(default)]
    pub country_bonus: Option<Value>,
    #[serde(default)]
    pub series_bonus: Option<Value>,
    #[serde(default)]
    pub deduction: Option<Value>,
}

impl CalculatePoints {
    fn validate(&self) -> Result<(), AppError> {
        if !self.pages.is_number() || !self.year_published.is_number() {
            return Err(AppError::bad_request(
                "pages and year_published must be numbers",
            ));
        }
        Ok(())
    }

    fn into_args(self) -> Value {
        let mut args = Map::new();
        args.insert("pages".to_string(), self.pages);
        args.insert("year_published".to_string(), self.year_published);

        let flags = [
            ("completed", self.completed),
            ("is_fiction", self.is_fiction),
            ("female_author", self.female_author),
            ("alphabet_bonus", self.alphabet_bonus),
            ("genre_bonus", self.genre_bonus),
            ("country_bonus", self.country_bonus),
            ("series_bonus", self.series_bonus),
            ("deduction", self.deduction),
        ];
        for (name, value) in flags {
            if let Some(value) = value {
                args.insert(name.to_string(), value);
            }
        }
        Value::Object(args)
    }
}

#[derive(Debug, Serialize)]
pub struct PointsResponse {
    pub points: Number,
}

/// The procedure may answer with a bare number, a `final_points` object, or a
/// one-row result set wrapping either.
fn final_points(output: &Value) -> Option<Number> {
    match output {
        Value::Number(points) => Some(points.clone()),
        Value::Object(fields) => fields.get("final_points").and_then(final_points),
        Value::Array(rows) if rows.len() == 1 => final_points(&rows[0]),
        _ => None,
    }
}

/// `POST /api/calculate-points`
async fn calculate_points(
    State(store): State<SharedStore>,
    payload: Result<Json<CalculatePoints>, JsonRejection>,
) -> Result<Json<PointsResponse>, AppError> {
    let Json(request) = payload?;
    request.validate()?;

    let output = store.rpc(SCORING_PROCEDURE, request.into_args()).await?;
    let points = final_points(&output).ok_or_else(|| {
        anyhow!(
            "{} returned no final points: {}",
            SCORING_PROCEDURE,
            output
        )
    })?;

    Ok(Json(PointsResponse { points }))
}

pub fn create_module(store: SharedStore) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(PointsModule::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn final_points_accepts_known_shapes() {
        assert_eq!(final_points(&json!(42)), Some(Number::from(42)));
        assert_eq!(
            final_points(&json!({"final_points": 12.5, "base": 10})),
            Number::from_f64(12.5)
        );
        assert_eq!(
            final_points(&json!([{"final_points": 7}])),
            Some(Number::from(7))
        );
        assert_eq!(final_points(&json!([1, 2])), None);
        assert_eq!(final_points(&json!({"points": 3})), None);
        assert_eq!(final_points(&json!("9")), None);
    }

    #[test]
    fn string_pages_fail_validation() {
        let request: CalculatePoints =
            serde_json::from_value(json!({"pages": "200", "year_published": 2020})).unwrap();
        assert!(request.validate().is_err());

        let request: CalculatePoints =
            serde_json::from_value(json!({"pages": 200})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn args_forward_only_supplied_flags() {
        let request: CalculatePoints = serde_json::from_value(json!({
            "pages": 320,
            "year_published": 1998,
            "female_author": true,
            "deduction": 5
        }))
        .unwrap();

        assert_eq!(
            request.into_args(),
            json!({
                "pages": 320,
                "year_published": 1998,
                "female_author": true,
                "deduction": 5
            })
        );
    }
}
