//! # Document Store
//!
//! The keyed document store every repository talks to, and its SQLite
//! implementation on [`Database`].
//!
//! ## Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  collection (path)                 id          data (JSON object)       │
//! │  ─────────────────────────────     ─────────   ──────────────────────   │
//! │  lojas/loja-01/estoque/armacoes    p-123       { titulo, preco, ... }   │
//! │  clientes                          c-456       { nome, cpf, ... }       │
//! │  lojas/loja-01/vendas              9f1c...     { itens, total, ... }    │
//! │  lojas/loja-01/servicos            OS2026...-1 { id_os, receita, ... }  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Writes
//! Every payload is passed through [`otica_core::document::sanitize`] before
//! it reaches SQLite, so blank strings and missing optionals are stored as
//! `null`. [`DocumentStore::commit`] applies a batch of [`WriteOp`]s inside
//! one SQLite transaction: either every op lands or none does.

use async_trait::async_trait;
use chrono::Utc;
use otica_core::document::{sanitize, Document};
use serde_json::Value;
use sqlx::{Sqlite, SqliteConnection};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::pool::Database;

// =============================================================================
// Types
// =============================================================================

/// A document together with its id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

/// One write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Inserts a new document; fails the whole batch if the id exists.
    Create {
        collection: String,
        id: String,
        data: Document,
    },
    /// Inserts or replaces a document.
    Set {
        collection: String,
        id: String,
        data: Document,
    },
    /// Removes a document; absent ids are ignored.
    Delete { collection: String, id: String },
}

impl WriteOp {
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Set { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }
}

/// Keyed JSON document storage.
///
/// Repositories hold an `Arc<dyn DocumentStore>`; nothing reaches for a
/// global handle.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads one document.
    async fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// Inserts or replaces one document.
    async fn set(&self, collection: &str, id: &str, data: Document) -> DbResult<()>;

    /// Deletes one document. Returns whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> DbResult<bool>;

    /// Every document in a collection, ordered by id.
    async fn list(&self, collection: &str) -> DbResult<Vec<StoredDocument>>;

    /// Documents whose top-level `field` equals `value`.
    ///
    /// `value` must be a string, number, bool or null.
    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> DbResult<Vec<StoredDocument>>;

    /// Applies all ops atomically.
    async fn commit(&self, ops: Vec<WriteOp>) -> DbResult<()>;
}

// =============================================================================
// SQLite Implementation
// =============================================================================

#[derive(sqlx::FromRow)]
struct DocumentRow {
    id: String,
    data: String,
}

impl DocumentRow {
    fn decode(self, collection: &str) -> DbResult<StoredDocument> {
        let value: Value = serde_json::from_str(&self.data)
            .map_err(|e| DbError::invalid_document(collection, e))?;
        match value {
            Value::Object(data) => Ok(StoredDocument { id: self.id, data }),
            _ => Err(DbError::invalid_document(collection, "root is not an object")),
        }
    }
}

fn encode(collection: &str, data: Document) -> DbResult<String> {
    let clean = sanitize(Value::Object(data)).map_err(|e| DbError::invalid_document(collection, e))?;
    serde_json::to_string(&clean).map_err(|e| DbError::invalid_document(collection, e))
}

const QUERY_FIELD_EQ: &str = "SELECT id, data FROM documents \
     WHERE collection = ?1 AND json_extract(data, ?2) = ?3 ORDER BY id";

const QUERY_FIELD_NULL: &str = "SELECT id, data FROM documents \
     WHERE collection = ?1 AND json_extract(data, ?2) IS NULL ORDER BY id";

fn field_path(field: &str) -> DbResult<String> {
    let valid = !field.is_empty()
        && field
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(DbError::QueryFailed(format!("invalid field name: {field}")));
    }
    Ok(format!("$.{field}"))
}

async fn upsert(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    json: &str,
    now: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT (collection, id)
        DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(json)
    .bind(now)
    .execute(conn)
    .await?;
    Ok(())
}

async fn insert(
    conn: &mut SqliteConnection,
    collection: &str,
    id: &str,
    json: &str,
    now: &str,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO documents (collection, id, data, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(json)
    .bind(now)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(e) => match DbError::from(e) {
            DbError::UniqueViolation { .. } => Err(DbError::duplicate(
                format!("{collection}/id"),
                id.to_string(),
            )),
            other => Err(other),
        },
    }
}

async fn remove(conn: &mut SqliteConnection, collection: &str, id: &str) -> DbResult<bool> {
    let result = sqlx::query("DELETE FROM documents WHERE collection = ?1 AND id = ?2")
        .bind(collection)
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

async fn apply(conn: &mut SqliteConnection, op: WriteOp, now: &str) -> DbResult<()> {
    match op {
        WriteOp::Create {
            collection,
            id,
            data,
        } => {
            let json = encode(&collection, data)?;
            insert(conn, &collection, &id, &json, now).await
        }
        WriteOp::Set {
            collection,
            id,
            data,
        } => {
            let json = encode(&collection, data)?;
            upsert(conn, &collection, &id, &json, now).await
        }
        WriteOp::Delete { collection, id } => remove(conn, &collection, &id).await.map(|_| ()),
    }
}

#[async_trait]
impl DocumentStore for Database {
    async fn get(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let row: Option<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ?1 AND id = ?2")
                .bind(collection)
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        row.map(|r| r.decode(collection).map(|d| d.data)).transpose()
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> DbResult<()> {
        debug!(collection, id, "Setting document");

        let json = encode(collection, data)?;
        let now = Utc::now().to_rfc3339();
        let mut conn = self.pool().acquire().await?;
        upsert(&mut *conn, collection, id, &json, &now).await
    }

    async fn delete(&self, collection: &str, id: &str) -> DbResult<bool> {
        debug!(collection, id, "Deleting document");

        let mut conn = self.pool().acquire().await?;
        remove(&mut *conn, collection, id).await
    }

    async fn list(&self, collection: &str) -> DbResult<Vec<StoredDocument>> {
        let rows: Vec<DocumentRow> =
            sqlx::query_as("SELECT id, data FROM documents WHERE collection = ?1 ORDER BY id")
                .bind(collection)
                .fetch_all(self.pool())
                .await?;

        rows.into_iter().map(|r| r.decode(collection)).collect()
    }

    async fn query_by_field(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> DbResult<Vec<StoredDocument>> {
        let path = field_path(field)?;

        let sql = match value {
            Value::Null => QUERY_FIELD_NULL,
            _ => QUERY_FIELD_EQ,
        };

        let query = sqlx::query_as::<Sqlite, DocumentRow>(sql);
        let query = query.bind(collection).bind(path);
        let query = match value {
            Value::Null => query,
            Value::Bool(b) => query.bind(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => query.bind(i),
                None => query.bind(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => query.bind(s.clone()),
            Value::Array(_) | Value::Object(_) => {
                return Err(DbError::QueryFailed(format!(
                    "cannot query {field} by a composite value"
                )))
            }
        };

        let rows = query.fetch_all(self.pool()).await?;
        rows.into_iter().map(|r| r.decode(collection)).collect()
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> DbResult<()> {
        debug!(ops = ops.len(), "Committing batch");

        let now = Utc::now().to_rfc3339();
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        for op in ops {
            // Dropping `tx` on error rolls the batch back
            apply(&mut *tx, op, &now).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::DbConfig;
    use serde_json::json;

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[tokio::test]
    async fn test_set_get_roundtrip_sanitizes() {
        let db = setup().await;

        db.set("clientes", "c1", doc(json!({ "nome": "Maria", "email": "  " })))
            .await
            .unwrap();

        let stored = db.get("clientes", "c1").await.unwrap().unwrap();
        assert_eq!(stored["nome"], "Maria");
        assert_eq!(stored["email"], Value::Null);

        assert!(db.get("clientes", "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_set_replaces_existing() {
        let db = setup().await;

        db.set("clientes", "c1", doc(json!({ "nome": "Maria" }))).await.unwrap();
        db.set("clientes", "c1", doc(json!({ "nome": "Maria Silva" }))).await.unwrap();

        let all = db.list("clientes").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].data["nome"], "Maria Silva");
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let db = setup().await;

        db.set("lojas/a/vendas", "1", doc(json!({ "total": 10 }))).await.unwrap();
        db.set("lojas/b/vendas", "1", doc(json!({ "total": 20 }))).await.unwrap();

        let a = db.list("lojas/a/vendas").await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].data["total"], 10);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = setup().await;

        db.set("clientes", "c1", doc(json!({ "nome": "Maria" }))).await.unwrap();

        assert!(db.delete("clientes", "c1").await.unwrap());
        assert!(!db.delete("clientes", "c1").await.unwrap());
        assert!(db.list("clientes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_by_field() {
        let db = setup().await;

        db.set("clientes", "c1", doc(json!({ "cpf": "52998224725", "temDependentes": true })))
            .await
            .unwrap();
        db.set("clientes", "c2", doc(json!({ "cpf": "11144477735", "dependentesDe": "c1", "temDependentes": false })))
            .await
            .unwrap();

        let by_cpf = db
            .query_by_field("clientes", "cpf", &json!("52998224725"))
            .await
            .unwrap();
        assert_eq!(by_cpf.len(), 1);
        assert_eq!(by_cpf[0].id, "c1");

        let dependents = db
            .query_by_field("clientes", "dependentesDe", &json!("c1"))
            .await
            .unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].id, "c2");

        let titulares = db
            .query_by_field("clientes", "dependentesDe", &Value::Null)
            .await
            .unwrap();
        assert_eq!(titulares.len(), 1);
        assert_eq!(titulares[0].id, "c1");

        let with_dependents = db
            .query_by_field("clientes", "temDependentes", &json!(true))
            .await
            .unwrap();
        assert_eq!(with_dependents.len(), 1);
    }

    #[tokio::test]
    async fn test_query_rejects_bad_field_names() {
        let db = setup().await;

        let result = db.query_by_field("clientes", "cpf') OR 1=1 --", &json!("x")).await;
        assert!(matches!(result, Err(DbError::QueryFailed(_))));

        let result = db.query_by_field("clientes", "cpf", &json!(["x"])).await;
        assert!(matches!(result, Err(DbError::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_commit_applies_every_op() {
        let db = setup().await;
        db.set("c", "old", doc(json!({ "v": 0 }))).await.unwrap();

        db.commit(vec![
            WriteOp::Create {
                collection: "c".to_string(),
                id: "a".to_string(),
                data: doc(json!({ "v": 1 })),
            },
            WriteOp::Set {
                collection: "c".to_string(),
                id: "b".to_string(),
                data: doc(json!({ "v": 2 })),
            },
            WriteOp::Delete {
                collection: "c".to_string(),
                id: "old".to_string(),
            },
        ])
        .await
        .unwrap();

        let ids: Vec<String> = db.list("c").await.unwrap().into_iter().map(|d| d.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_failed_commit_rolls_back_whole_batch() {
        let db = setup().await;
        db.set("c", "taken", doc(json!({ "v": 0 }))).await.unwrap();

        let result = db
            .commit(vec![
                WriteOp::Create {
                    collection: "c".to_string(),
                    id: "first".to_string(),
                    data: doc(json!({ "v": 1 })),
                },
                WriteOp::Create {
                    collection: "c".to_string(),
                    id: "taken".to_string(),
                    data: doc(json!({ "v": 2 })),
                },
            ])
            .await;

        assert!(matches!(result, Err(DbError::UniqueViolation { .. })));
        assert!(db.get("c", "first").await.unwrap().is_none());
        assert_eq!(db.get("c", "taken").await.unwrap().unwrap()["v"], 0);
    }
}
