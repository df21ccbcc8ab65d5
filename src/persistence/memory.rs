use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::persistence::{new_record_id, RepositoryRecord, RepositoryStore, StoreError};

/// Process-local store. Check-and-insert happens under one lock, so
/// concurrent submissions of the same uri resolve to exactly one winner.
#[derive(Debug, Default)]
pub struct InMemoryRepositoryStore {
    records: Mutex<Vec<RepositoryRecord>>,
}

impl InMemoryRepositoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RepositoryStore for InMemoryRepositoryStore {
    async fn insert(&self, uri: &str) -> Result<RepositoryRecord, StoreError> {
        let mut records = self.records.lock().await;
        if let Some(existing) = records.iter().find(|r| r.uri == uri) {
            return Err(StoreError::Conflict {
                existing_id: existing.id.clone(),
            });
        }
        let record = RepositoryRecord {
            id: new_record_id(),
            uri: uri.to_string(),
        };
        records.push(record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        let records = self.records.lock().await;
        Ok(records.iter().find(|r| r.id == id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        Ok(self.records.lock().await.clone())
    }
}
