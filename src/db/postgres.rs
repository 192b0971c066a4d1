//! Postgres document store backend.
//!
//! Documents live in one `documents` table keyed by (collection, id)
//! with the body in a jsonb column, so the schemaless collection model
//! maps onto Postgres without per-entity DDL. Equality filters compile
//! to `@>` containment checks against a GIN index, and shallow merges
//! use the jsonb `||` operator so a patch is a single round trip.

use std::time::{Duration, Instant};

use serde_json::Value;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

use async_trait::async_trait;

use crate::db::error::StoreError;
use crate::db::store::{Document, DocumentStore, Filter};

// ===== Configuration =====

/// Pool settings, read from the environment with development defaults.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl DbConfig {
    pub fn from_env(url: String) -> Self {
        Self {
            url,
            max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 10),
            min_connections: env_parse("DATABASE_MIN_CONNECTIONS", 2),
            acquire_timeout: Duration::from_secs(env_parse("DATABASE_ACQUIRE_TIMEOUT_SECS", 8)),
            idle_timeout: Duration::from_secs(env_parse("DATABASE_IDLE_TIMEOUT_SECS", 600)),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default)
}

// ===== Store =====

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects, verifies the connection and brings the schema up.
    pub async fn connect(config: DbConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .connect(&config.url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        tracing::info!(
            max_connections = config.max_connections,
            "database connection pool initialized"
        );

        run_migrations(&pool).await?;
        Ok(Self { pool })
    }
}

async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            doc JSONB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // jsonb_path_ops covers the @> containment lookups and stays small.
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_documents_containment
        ON documents USING GIN (doc jsonb_path_ops)
        "#,
    )
    .execute(pool)
    .await?;

    tracing::info!("database migrations completed");
    Ok(())
}

fn row_into_document(collection: &str, value: Value) -> Option<Document> {
    match value {
        Value::Object(map) => Some(map),
        other => {
            tracing::warn!(
                collection,
                kind = other_kind(&other),
                "dropping non-object row from the documents table"
            );
            None
        }
    }
}

fn other_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert(&self, collection: &'static str, mut doc: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        doc.insert("id".to_string(), Value::String(id.clone()));

        sqlx::query("INSERT INTO documents (collection, id, doc) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Value::Object(doc))
            .execute(&self.pool)
            .await
            .map_err(StoreError::classify)?;
        Ok(id)
    }

    async fn put(&self, collection: &'static str, id: &str, mut doc: Document) -> Result<(), StoreError> {
        doc.insert("id".to_string(), Value::String(id.to_string()));

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, doc)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(doc))
        .execute(&self.pool)
        .await
        .map_err(StoreError::classify)?;
        Ok(())
    }

    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Document>, StoreError> {
        let row: Option<(Value,)> =
            sqlx::query_as("SELECT doc FROM documents WHERE collection = $1 AND id = $2")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(StoreError::classify)?;

        Ok(row.and_then(|(doc,)| row_into_document(collection, doc)))
    }

    async fn find(&self, collection: &'static str, filter: Filter) -> Result<Vec<Document>, StoreError> {
        let rows = if filter.is_empty() {
            sqlx::query("SELECT doc FROM documents WHERE collection = $1")
                .bind(collection)
                .fetch_all(&self.pool)
                .await
        } else {
            sqlx::query("SELECT doc FROM documents WHERE collection = $1 AND doc @> $2")
                .bind(collection)
                .bind(filter.to_containment())
                .fetch_all(&self.pool)
                .await
        }
        .map_err(StoreError::classify)?;

        Ok(rows
            .into_iter()
            .filter_map(|row| row_into_document(collection, row.get::<Value, _>("doc")))
            .collect())
    }

    async fn merge(
        &self,
        collection: &'static str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        let row: Option<(Value,)> = sqlx::query_as(
            r#"
            UPDATE documents
            SET doc = doc || $3
            WHERE collection = $1 AND id = $2
            RETURNING doc
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Value::Object(patch))
        .fetch_optional(&self.pool)
        .await
        .map_err(StoreError::classify)?;

        Ok(row.and_then(|(doc,)| row_into_document(collection, doc)))
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StoreError::classify)?;
        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<Duration, StoreError> {
        let started = Instant::now();
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(StoreError::classify)?;
        Ok(started.elapsed())
    }
}
