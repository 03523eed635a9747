//! In-process store used for local development and tests.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering as AtomicOrdering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{Filter, Query, Row, Store, StoreError};

type Procedure = Box<dyn Fn(&Value) -> Result<Value, StoreError> + Send + Sync>;

/// Tables held in memory; rows get an integer `id` on insert when they lack one.
pub struct MemoryStore {
    tables: RwLock<HashMap<String, Vec<Row>>>,
    procedures: RwLock<HashMap<String, Procedure>>,
    next_id: AtomicI64,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
            procedures: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            available: AtomicBool::new(true),
        }
    }

    /// Register a remote procedure callable through [`Store::rpc`].
    pub async fn register_procedure<F>(&self, name: &str, procedure: F)
    where
        F: Fn(&Value) -> Result<Value, StoreError> + Send + Sync + 'static,
    {
        self.procedures
            .write()
            .await
            .insert(name.to_string(), Box::new(procedure));
    }

    /// Toggle simulated outages; while unavailable every call fails.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, AtomicOrdering::SeqCst);
    }

    /// Number of rows currently held in `table`.
    pub async fn row_count(&self, table: &str) -> usize {
        self.tables.read().await.get(table).map_or(0, Vec::len)
    }

    fn ensure_available(&self) -> Result<(), StoreError> {
        if self.available.load(AtomicOrdering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::Unavailable)
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_all(filters: &[Filter], row: &Row) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

/// Numbers before strings, nulls and missing values last.
fn compare_values(left: Option<&Value>, right: Option<&Value>) -> Ordering {
    match (left, right) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.total_cmp(&b)
        }
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Number(_)), Some(_)) => Ordering::Less,
        (Some(_), Some(Value::Number(_))) => Ordering::Greater,
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), Some(_)) => Ordering::Greater,
        (Some(_), None | Some(Value::Null)) => Ordering::Less,
        (Some(_), Some(_)) => Ordering::Equal,
    }
}

fn project(row: &Row, columns: Option<&Vec<String>>) -> Row {
    match columns {
        None => row.clone(),
        Some(columns) => columns
            .iter()
            .filter_map(|column| {
                row.get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        self.ensure_available()?;

        let tables = self.tables.read().await;
        let mut rows: Vec<&Row> = tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches_all(&query.filters, row))
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| project(row, query.columns.as_ref()))
            .collect())
    }

    async fn insert(&self, table: &str, mut row: Row) -> Result<Row, StoreError> {
        self.ensure_available()?;

        if !row.contains_key("id") {
            let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
            row.insert("id".to_string(), Value::from(id));
        }

        self.tables
            .write()
            .await
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        self.ensure_available()?;

        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(table) else {
            return Ok(Vec::new());
        };

        let mut updated = Vec::new();
        for row in rows.iter_mut().filter(|row| matches_all(filters, row)) {
            for (key, value) in &patch {
                row.insert(key.clone(), value.clone());
            }
            updated.push(row.clone());
        }
        Ok(updated)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        self.ensure_available()?;

        let procedures = self.procedures.read().await;
        let procedure = procedures
            .get(function)
            .ok_or_else(|| StoreError::UnknownFunction(function.to_string()))?;
        procedure(&args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn insert_assigns_ids_and_select_filters() {
        let store = MemoryStore::new();
        let first = store
            .insert("books", row(json!({"player_id": 1, "title": "Dune"})))
            .await
            .unwrap();
        store
            .insert("books", row(json!({"player_id": 2, "title": "Emma"})))
            .await
            .unwrap();

        assert_eq!(first.get("id"), Some(&json!(1)));

        let rows = store
            .select("books", &Query::all().eq("player_id", "2"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&json!("Emma")));
    }

    #[tokio::test]
    async fn select_orders_and_projects() {
        let store = MemoryStore::new();
        for (name, points) in [("Ana", json!(3)), ("Ben", json!(9)), ("Cy", Value::Null)] {
            store
                .insert("players", row(json!({"name": name, "total_points": points})))
                .await
                .unwrap();
        }

        let rows = store
            .select(
                "players",
                &Query::all()
                    .columns(["name"])
                    .order_by("total_points", true),
            )
            .await
            .unwrap();

        let names: Vec<_> = rows.iter().map(|row| row["name"].clone()).collect();
        assert_eq!(names, vec![json!("Cy"), json!("Ben"), json!("Ana")]);
        assert!(rows.iter().all(|row| row.len() == 1));
    }

    #[tokio::test]
    async fn update_merges_patch_into_matching_rows() {
        let store = MemoryStore::new();
        store
            .insert("books", row(json!({"id": 10, "rating": 3})))
            .await
            .unwrap();

        let updated = store
            .update(
                "books",
                &[Filter::eq("id", "10")],
                row(json!({"rating": 5, "genre": "sci-fi"})),
            )
            .await
            .unwrap();

        assert_eq!(updated.len(), 1);
        assert_eq!(updated[0].get("rating"), Some(&json!(5)));
        assert_eq!(updated[0].get("genre"), Some(&json!("sci-fi")));
    }

    #[tokio::test]
    async fn rpc_dispatches_registered_procedures() {
        let store = MemoryStore::new();
        store
            .register_procedure("double", |args| {
                Ok(json!(args["n"].as_i64().unwrap_or(0) * 2))
            })
            .await;

        assert_eq!(store.rpc("double", json!({"n": 4})).await.unwrap(), json!(8));
        assert!(matches!(
            store.rpc("missing", json!({})).await,
            Err(StoreError::UnknownFunction(name)) if name == "missing"
        ));
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_available(false);

        assert!(matches!(
            store.select("books", &Query::all()).await,
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(
            store.insert("books", Row::new()).await,
            Err(StoreError::Unavailable)
        ));
        assert_eq!(store.row_count("books").await, 0);
    }
}
