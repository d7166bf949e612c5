//! Document store trait and its PostgreSQL implementation

use std::time::Duration;

use async_trait::async_trait;
use plebis_core::ExternalId;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;

use crate::error::StoreError;
use crate::schema::{TABLE, ensure_schema};

/// Primary store for harvested documents, keyed by external ID.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether a document (full record or stub) exists for `id`
    async fn exists(&self, id: ExternalId) -> Result<bool, StoreError>;

    /// Create the document, or replace the top-level fields of the stored one
    async fn upsert(&self, id: ExternalId, doc: &Value) -> Result<(), StoreError>;

    async fn get(&self, id: ExternalId) -> Result<Option<Value>, StoreError>;

    /// Up to `limit` available (visible) documents with ID > `after`, in ID order
    async fn scan_published(
        &self,
        after: ExternalId,
        limit: usize,
    ) -> Result<Vec<(ExternalId, Value)>, StoreError>;
}

/// Merge `incoming` into `existing`, replacing whole top-level fields.
///
/// Non-object values replace `existing` entirely.
pub fn merge_top_level(existing: &mut Value, incoming: &Value) {
    match (existing.as_object_mut(), incoming.as_object()) {
        (Some(stored), Some(fields)) => {
            for (k, v) in fields {
                stored.insert(k.clone(), v.clone());
            }
        }
        _ => *existing = incoming.clone(),
    }
}

fn key(id: ExternalId) -> Result<i64, StoreError> {
    i64::try_from(id).map_err(|_| StoreError::InvalidId(id))
}

/// PostgreSQL `reports` table with one JSONB document per ID.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect and make sure the table and indexes exist
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(url)
            .await?;
        ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let (n,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {TABLE}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn exists(&self, id: ExternalId) -> Result<bool, StoreError> {
        let (found,): (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (SELECT 1 FROM {TABLE} WHERE erowid_id = $1)"
        ))
        .bind(key(id)?)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn upsert(&self, id: ExternalId, doc: &Value) -> Result<(), StoreError> {
        // `||` on jsonb objects replaces top-level keys, like merge_top_level
        sqlx::query(&format!(
            r#"
            INSERT INTO {TABLE} (erowid_id, doc)
            VALUES ($1, $2)
            ON CONFLICT (erowid_id) DO UPDATE SET
                doc = {TABLE}.doc || EXCLUDED.doc
            "#
        ))
        .bind(key(id)?)
        .bind(Json(doc))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: ExternalId) -> Result<Option<Value>, StoreError> {
        let row: Option<(Json<Value>,)> =
            sqlx::query_as(&format!("SELECT doc FROM {TABLE} WHERE erowid_id = $1"))
                .bind(key(id)?)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(Json(doc),)| doc))
    }

    async fn scan_published(
        &self,
        after: ExternalId,
        limit: usize,
    ) -> Result<Vec<(ExternalId, Value)>, StoreError> {
        let rows: Vec<(i64, Json<Value>)> = sqlx::query_as(&format!(
            r#"
            SELECT erowid_id, doc FROM {TABLE}
            WHERE erowid_id > $1 AND doc @> '{{"meta": {{"available": true}}}}'
            ORDER BY erowid_id
            LIMIT $2
            "#
        ))
        .bind(key(after)?)
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, Json(doc))| (id as ExternalId, doc))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_replaces_top_level_fields() {
        let mut stored = json!({"meta": {"erowidId": 3, "reviewed": false}, "title": "x"});
        merge_top_level(
            &mut stored,
            &json!({"meta": {"erowidId": 3, "reviewed": true, "available": false}}),
        );
        assert_eq!(
            stored,
            json!({"meta": {"erowidId": 3, "reviewed": true, "available": false}, "title": "x"})
        );
    }

    #[test]
    fn merge_non_object_replaces() {
        let mut stored = json!([1, 2]);
        merge_top_level(&mut stored, &json!({"a": 1}));
        assert_eq!(stored, json!({"a": 1}));
    }

    #[test]
    fn merge_is_idempotent() {
        let doc = json!({"meta": {"erowidId": 9}, "author": "a"});
        let mut once = json!({});
        merge_top_level(&mut once, &doc);
        let mut twice = once.clone();
        merge_top_level(&mut twice, &doc);
        assert_eq!(once, twice);
    }

    #[test]
    fn key_rejects_out_of_range() {
        assert_eq!(key(42).unwrap(), 42);
        assert!(matches!(key(u64::MAX), Err(StoreError::InvalidId(_))));
    }
}
