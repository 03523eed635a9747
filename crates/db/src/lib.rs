//! Data access for bookquest.
//!
//! Handlers talk to the backing store only through the [`Store`] trait, so the
//! hosted PostgREST backend can be swapped for the in-memory one in local
//! development and tests.

use std::sync::Arc;

use async_trait::async_trait;
use bookquest_kernel::settings::{StoreBackend, StoreSettings};
use serde_json::Value;

pub mod error;
pub mod memory;
pub mod postgrest;
pub mod query;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgrest::PostgrestStore;
pub use query::{Filter, Order, Query, Row};

/// Shared handle to the configured store.
pub type SharedStore = Arc<dyn Store>;

/// Table-oriented operations the API issues against the backing store.
#[async_trait]
pub trait Store: Send + Sync {
    /// Short backend name for logs.
    fn backend(&self) -> &'static str;

    /// Fetch the rows of `table` matching `query`.
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert one row and return it as stored.
    async fn insert(&self, table: &str, row: Row) -> Result<Row, StoreError>;

    /// Merge `patch` into every row matching `filters`; returns the updated rows.
    async fn update(
        &self,
        table: &str,
        filters: &[Filter],
        patch: Row,
    ) -> Result<Vec<Row>, StoreError>;

    /// Invoke a remote procedure with named arguments.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError>;
}

/// Build the store selected by `settings`.
pub fn connect(settings: &StoreSettings) -> Result<SharedStore, StoreError> {
    let store: SharedStore = match settings.backend {
        StoreBackend::Postgrest => Arc::new(PostgrestStore::from_settings(settings)?),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    };

    tracing::info!(backend = store.backend(), "data store configured");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_memory_backend() {
        let settings = StoreSettings {
            backend: StoreBackend::Memory,
            ..StoreSettings::default()
        };
        let store = connect(&settings).unwrap();
        assert_eq!(store.backend(), "memory");
    }

    #[test]
    fn connect_postgrest_requires_url() {
        let settings = StoreSettings {
            url: None,
            api_key: Some("key".to_string()),
            ..StoreSettings::default()
        };
        assert!(matches!(connect(&settings), Err(StoreError::Config(_))));
    }
}
