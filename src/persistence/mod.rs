use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod memory;
pub mod postgres_store;

/// A submitted repository. `uri` is unique across the store; `id` is assigned at insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub id: String,
    pub uri: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("uri already stored as {existing_id}")]
    Conflict { existing_id: String },
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(e: impl std::fmt::Display) -> Self {
        StoreError::Backend(e.to_string())
    }
}

#[async_trait]
pub trait RepositoryStore: Send + Sync {
    /// Inserts a new record for `uri`. A duplicate uri yields
    /// [`StoreError::Conflict`] carrying the id of the record that won.
    async fn insert(&self, uri: &str) -> Result<RepositoryRecord, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<RepositoryRecord>, StoreError>;

    /// All records in insertion order.
    async fn list_all(&self) -> Result<Vec<RepositoryRecord>, StoreError>;
}

pub type DynStore = Arc<dyn RepositoryStore>;

pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
