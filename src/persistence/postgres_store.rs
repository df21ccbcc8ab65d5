use async_trait::async_trait;
use postgres::error::SqlState;
use postgres::{Client, NoTls};

use crate::persistence::{new_record_id, RepositoryRecord, RepositoryStore, StoreError};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS repositories (
        id TEXT PRIMARY KEY,
        uri TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
"#;

/// Postgres-backed store. The `UNIQUE` constraint on `uri` is the only
/// deduplication, so identical concurrent submissions race safely.
#[derive(Debug, Clone)]
pub struct PostgresRepositoryStore {
    database_url: String,
}

fn connect(database_url: &str) -> Result<Client, StoreError> {
    let mut client = Client::connect(database_url, NoTls).map_err(StoreError::backend)?;
    client
        .batch_execute("SET statement_timeout TO 60000")
        .map_err(StoreError::backend)?;
    Ok(client)
}

fn insert_sync(database_url: &str, uri: &str) -> Result<RepositoryRecord, StoreError> {
    let mut client = connect(database_url)?;
    let id = new_record_id();
    match client.execute("INSERT INTO repositories (id, uri) VALUES ($1, $2)", &[&id, &uri]) {
        Ok(_) => Ok(RepositoryRecord {
            id,
            uri: uri.to_string(),
        }),
        Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => {
            let row = client
                .query_one("SELECT id FROM repositories WHERE uri = $1", &[&uri])
                .map_err(StoreError::backend)?;
            Err(StoreError::Conflict {
                existing_id: row.get("id"),
            })
        }
        Err(e) => Err(StoreError::backend(e)),
    }
}

fn find_sync(database_url: &str, id: &str) -> Result<Option<RepositoryRecord>, StoreError> {
    let mut client = connect(database_url)?;
    let row = client
        .query_opt("SELECT id, uri FROM repositories WHERE id = $1", &[&id])
        .map_err(StoreError::backend)?;
    Ok(row.map(|r| RepositoryRecord {
        id: r.get("id"),
        uri: r.get("uri"),
    }))
}

fn list_sync(database_url: &str) -> Result<Vec<RepositoryRecord>, StoreError> {
    let mut client = connect(database_url)?;
    let rows = client
        .query("SELECT id, uri FROM repositories ORDER BY created_at, id", &[])
        .map_err(StoreError::backend)?;
    Ok(rows
        .iter()
        .map(|r| RepositoryRecord {
            id: r.get("id"),
            uri: r.get("uri"),
        })
        .collect())
}

impl PostgresRepositoryStore {
    /// Connects once to make sure the schema exists.
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let url = database_url.to_string();
        tokio::task::spawn_blocking(move || -> Result<Self, StoreError> {
            connect(&url)?.batch_execute(SCHEMA).map_err(StoreError::backend)?;
            Ok(Self { database_url: url })
        })
        .await
        .map_err(|e| StoreError::backend(format!("join error: {e}")))?
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&str) -> Result<T, StoreError> + Send + 'static,
    {
        let url = self.database_url.clone();
        tokio::task::spawn_blocking(move || f(&url))
            .await
            .map_err(|e| StoreError::backend(format!("join error: {e}")))?
    }
}

#[async_trait]
impl RepositoryStore for PostgresRepositoryStore {
    async fn insert(&self, uri: &str) -> Result<RepositoryRecord, StoreError> {
        let uri = uri.to_string();
        self.blocking(move |url| insert_sync(url, &uri)).await
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<RepositoryRecord>, StoreError> {
        let id = id.to_string();
        self.blocking(move |url| find_sync(url, &id)).await
    }

    async fn list_all(&self) -> Result<Vec<RepositoryRecord>, StoreError> {
        self.blocking(list_sync).await
    }
}
