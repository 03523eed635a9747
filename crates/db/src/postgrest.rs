//! Client for a hosted PostgREST data API (the Supabase REST surface).

use std::time::Duration;

use async_trait::async_trait;
use bookquest_kernel::settings::StoreSettings;
use reqwest::{header, RequestBuilder, Response};
use serde_json::Value;

use crate::{Filter, Query, Row, Store, StoreError};

const REST_PATH: &str = "rest/v1";

pub struct PostgrestStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(
        url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: format!("{}/{}", url.trim_end_matches('/'), REST_PATH),
            api_key: api_key.into(),
        })
    }

    pub fn from_settings(settings: &StoreSettings) -> Result<Self, StoreError> {
        let url = settings.url.as_deref().ok_or_else(|| {
            StoreError::Config("store url is not set (BOOKQUEST_STORE__URL or SUPABASE_URL)".into())
        })?;
        let api_key = settings.api_key.clone().ok_or_else(|| {
            StoreError::Config(
                "store api key is not set (BOOKQUEST_STORE__API_KEY or SUPABASE_KEY)".into(),
            )
        })?;

        Self::new(url, api_key, Duration::from_millis(settings.timeout_ms))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn send(request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), %message, "store rejected request");
        Err(StoreError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

/// Query-string parameters for a select.
pub(crate) fn select_params(query: &Query) -> Vec<(String, String)> {
    let columns = query
        .columns
        .as_ref()
        .map(|columns| columns.join(","))
        .unwrap_or_else(|| "*".to_string());

    let mut params = vec![("select".to_string(), columns)];
    params.extend(filter_params(&query.filters));
    if let Some(order) = &query.order {
        let direction = if order.descending { "desc" } else { "asc" };
        params.push(("order".to_string(), format!("{}.{}", order.column, direction)));
    }
    params
}

pub(crate) fn filter_params(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|filter| (filter.column.clone(), format!("eq.{}", filter.value)))
        .collect()
}

#[async_trait]
impl Store for PostgrestStore {
    fn backend(&self) -> &'static str {
        "postgrest"
    }

    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError> {
        let request = self
            .authorized(self.client.get(self.table_url(table)))
            .query(&select_params(query));

        let rows = Self::send(request).await?.json::<Vec<Row>>().await?;
        tracing::debug!(table, rows = rows.len(), "store select");
        Ok(rows)
    }

    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError> {
        let request = self
            .authorized(self.client.post(self.table_url(table)))
            .header("Prefer", "return=representation")
            .json(&[row]);

        let mut rows = Self::send(request).await?.json::<Vec<Row>>().await?;
        if rows.is_empty() {
            return Err(StoreError::Status {
                status: 500,
                message: format!("insert into '{}' returned no rows", table),
            });
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError> {
        let request = self
            .authorized(self.client.patch(self.table_url(table)))
            .header("Prefer", "return=representation")
            .query(&filter_params(filters))
            .json(&patch);

        let rows = Self::send(request).await?.json::<Vec<Row>>().await?;
        tracing::debug!(table, rows = rows.len(), "store update");
        Ok(rows)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError> {
        let request = self
            .authorized(
                self.client
                    .post(format!("{}/rpc/{}", self.base_url, function)),
            )
            .header(header::ACCEPT, "application/json")
            .json(&args);

        let value = Self::send(request).await?.json::<Value>().await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_params_default_to_all_columns() {
        assert_eq!(
            select_params(&Query::all()),
            vec![("select".to_string(), "*".to_string())]
        );
    }

    #[test]
    fn select_params_encode_filters_and_order() {
        let query = Query::all()
            .columns(["player_id", "player_name", "points"])
            .eq("player_id", "42")
            .order_by("points", true);

        assert_eq!(
            select_params(&query),
            vec![
                ("select".to_string(), "player_id,player_name,points".to_string()),
                ("player_id".to_string(), "eq.42".to_string()),
                ("order".to_string(), "points.desc".to_string()),
            ]
        );
    }

    #[test]
    fn base_url_appends_rest_path_once() {
        let store =
            PostgrestStore::new("https://example.supabase.co/", "key", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            store.table_url("books"),
            "https://example.supabase.co/rest/v1/books"
        );
    }

    #[test]
    fn from_settings_requires_api_key() {
        let settings = StoreSettings {
            url: Some("https://example.supabase.co".to_string()),
            api_key: None,
            ..StoreSettings::default()
        };
        assert!(matches!(
            PostgrestStore::from_settings(&settings),
            Err(StoreError::Config(_))
        ));
    }
}
