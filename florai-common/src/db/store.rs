//! Generic document store
//!
//! Collections of JSON documents addressed by `(collection, id)`. This is
//! the only persistence surface the notification pipeline sees: prediction
//! history, notification documents, and user preferences all live here.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::SqlitePool;

use crate::{time, uuid_utils, Error, Result};

/// Read/write/query access to a document store
///
/// Implementations must be safe to share across concurrent requests. Writes
/// to distinct ids never conflict; the store decides ordering for writes to
/// the same id (last write wins for `upsert`).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch one document; `Ok(None)` when it does not exist
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>>;

    /// Create a document under a caller-chosen id; fails if the id is taken
    async fn insert(&self, collection: &str, id: &str, fields: Value) -> Result<()>;

    /// Create or replace a document
    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> Result<()>;

    /// All documents whose top-level `field` equals `value`, oldest first
    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>>;

    /// Create a document under a freshly generated id and return that id
    async fn add(&self, collection: &str, fields: Value) -> Result<String> {
        let id = uuid_utils::generate_document_id();
        self.insert(collection, &id, fields).await?;
        Ok(id)
    }
}

/// SQLite-backed document store
///
/// Every document is one row of the `documents` table with its JSON body
/// stored verbatim. Field queries use SQLite's `json_extract`.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    pool: SqlitePool,
}

impl SqliteDocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn encode(fields: &Value) -> Result<String> {
        if !fields.is_object() {
            return Err(Error::InvalidInput(
                "document body must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::to_string(fields)?)
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>> {
        let body: Option<String> =
            sqlx::query_scalar("SELECT body FROM documents WHERE collection = ? AND id = ?")
                .bind(collection)
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        body.map(|b| serde_json::from_str(&b).map_err(Error::from))
            .transpose()
    }

    async fn insert(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        let body = Self::encode(&fields)?;
        let now = time::to_document_timestamp(time::now());

        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::trace!(collection, id, "Inserted document");
        Ok(())
    }

    async fn upsert(&self, collection: &str, id: &str, fields: Value) -> Result<()> {
        let body = Self::encode(&fields)?;
        let now = time::to_document_timestamp(time::now());

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, body, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT (collection, id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(&body)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::trace!(collection, id, "Upserted document");
        Ok(())
    }

    async fn query(&self, collection: &str, field: &str, value: &Value) -> Result<Vec<Value>> {
        if field.is_empty() || !field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::InvalidInput(format!("invalid field name: {:?}", field)));
        }

        let path = format!("$.{}", field);
        let needle = serde_json::to_string(value)?;

        let bodies: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE collection = ?
              AND json_extract(body, ?) = json_extract(?, '$')
            ORDER BY created_at, rowid
            "#,
        )
        .bind(collection)
        .bind(&path)
        .bind(&needle)
        .fetch_all(&self.pool)
        .await?;

        bodies
            .iter()
            .map(|b| serde_json::from_str(b).map_err(Error::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory_database;
    use serde_json::json;

    async fn store() -> SqliteDocumentStore {
        SqliteDocumentStore::new(init_memory_database().await.unwrap())
    }

    #[tokio::test]
    async fn test_get_missing_document_returns_none() {
        let store = store().await;
        assert!(store.get("notifications", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_then_get() {
        let store = store().await;
        store
            .insert("ai_predictions", "p1", json!({"predictionID": "p1", "confidence": 0.89}))
            .await
            .unwrap();

        let doc = store.get("ai_predictions", "p1").await.unwrap().unwrap();
        assert_eq!(doc["confidence"], 0.89);
    }

    #[tokio::test]
    async fn test_insert_duplicate_id_fails() {
        let store = store().await;
        store.insert("c", "same", json!({"n": 1})).await.unwrap();
        let second = store.insert("c", "same", json!({"n": 2})).await;
        assert!(matches!(second, Err(Error::Database(_))));

        // Original document untouched
        let doc = store.get("c", "same").await.unwrap().unwrap();
        assert_eq!(doc["n"], 1);
    }

    #[tokio::test]
    async fn test_same_id_in_different_collections_is_independent() {
        let store = store().await;
        store.insert("a", "x", json!({"from": "a"})).await.unwrap();
        store.insert("b", "x", json!({"from": "b"})).await.unwrap();
        assert_eq!(store.get("a", "x").await.unwrap().unwrap()["from"], "a");
        assert_eq!(store.get("b", "x").await.unwrap().unwrap()["from"], "b");
    }

    #[tokio::test]
    async fn test_upsert_replaces_body() {
        let store = store().await;
        store
            .upsert("notificationPreferences", "u1", json!({"enableAiAlerts": false}))
            .await
            .unwrap();
        store
            .upsert("notificationPreferences", "u1", json!({"enableAiAlerts": true}))
            .await
            .unwrap();

        let doc = store.get("notificationPreferences", "u1").await.unwrap().unwrap();
        assert_eq!(doc["enableAiAlerts"], true);
    }

    #[tokio::test]
    async fn test_add_generates_distinct_ids() {
        let store = store().await;
        let a = store.add("c", json!({"k": 1})).await.unwrap();
        let b = store.add("c", json!({"k": 1})).await.unwrap();
        assert_ne!(a, b);
        assert!(uuid_utils::parse(&a).is_ok());
    }

    #[tokio::test]
    async fn test_non_object_body_rejected() {
        let store = store().await;
        let result = store.insert("c", "1", json!([1, 2, 3])).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_query_by_string_and_bool_fields() {
        let store = store().await;
        store
            .insert("notifications", "n1", json!({"userID": "u1", "read": false}))
            .await
            .unwrap();
        store
            .insert("notifications", "n2", json!({"userID": "u2", "read": false}))
            .await
            .unwrap();
        store
            .insert("notifications", "n3", json!({"userID": "u1", "read": true}))
            .await
            .unwrap();

        let for_u1 = store
            .query("notifications", "userID", &json!("u1"))
            .await
            .unwrap();
        assert_eq!(for_u1.len(), 2);

        let unread = store
            .query("notifications", "read", &json!(false))
            .await
            .unwrap();
        assert_eq!(unread.len(), 2);
    }

    #[tokio::test]
    async fn test_query_rejects_path_injection() {
        let store = store().await;
        let result = store.query("c", "a') OR 1=1 --", &json!(1)).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
