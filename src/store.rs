//! Document store capability and its JSON-file implementation.
//!
//! Documents are JSON objects grouped into named collections and addressed by
//! key. The whole database lives in memory and is written back to a single
//! file after each change; a change only becomes visible once that write
//! succeeded, so a batch either lands completely or not at all.

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;

pub type Document = Map<String, Value>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed document in {collection}/{id}: {source}")]
    Malformed {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("document body must be a JSON object, got {0}")]
    NotAnObject(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    pub fn decode<T: DeserializeOwned>(&self, collection: &str) -> Result<T, StoreError> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|source| {
            StoreError::Malformed {
                collection: collection.to_string(),
                id: self.id.clone(),
                source,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Set {
        collection: String,
        id: String,
        data: Document,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Writes committed together through [`DocumentStore::commit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents in `collection` whose `field` equals `value`.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or overwrite.
    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    /// Insert under a fresh store-assigned key and return it.
    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;
}

/// Encode a typed value as a document body.
pub fn to_document<T: Serialize>(value: &T) -> Result<Document, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::NotAnObject(other.to_string())),
    }
}

type Collections = BTreeMap<String, BTreeMap<String, Document>>;

pub struct JsonFileStore {
    path: Option<PathBuf>,
    collections: Mutex<Collections>,
}

impl JsonFileStore {
    /// Open the database at `path`; a missing file is an empty database.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let collections = match fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Collections::default(),
            Err(err) => return Err(err.into()),
        };

        Ok(Self {
            path: Some(path),
            collections: Mutex::new(collections),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            collections: Mutex::new(Collections::default()),
        }
    }

    async fn apply(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        let mut collections = self.collections.lock().await;
        let mut next = collections.clone();
        for op in ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    data,
                } => {
                    next.entry(collection).or_default().insert(id, data);
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = next.get_mut(&collection) {
                        docs.remove(&id);
                    }
                }
            }
        }

        if let Some(path) = &self.path {
            persist(path, &next).await?;
        }
        *collections = next;
        Ok(())
    }
}

async fn persist(path: &Path, collections: &Collections) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(collections)?;
    fs::write(path, payload).await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.lock().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };

        Ok(docs
            .iter()
            .filter(|(_, data)| data.get(field) == Some(value))
            .map(|(id, data)| StoredDocument {
                id: id.clone(),
                data: data.clone(),
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.lock().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        self.apply(vec![WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            data,
        }])
        .await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, data).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.apply(vec![WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        }])
        .await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.apply(batch.ops).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn unique_path() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let mut path = std::env::temp_dir();
        path.push(format!("attendance_store_{}_{}.json", std::process::id(), nanos));
        path
    }

    #[tokio::test]
    async fn query_filters_on_field_equality() {
        let store = JsonFileStore::in_memory();
        store
            .set("attendance", "a", doc(json!({ "subjectId": "s1" })))
            .await
            .unwrap();
        store
            .set("attendance", "b", doc(json!({ "subjectId": "s2" })))
            .await
            .unwrap();

        let hits = store
            .query_eq("attendance", "subjectId", &json!("s1"))
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");

        let none = store.query_eq("missing", "x", &json!(1)).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn set_overwrites_existing_key() {
        let store = JsonFileStore::in_memory();
        store.set("c", "k", doc(json!({ "v": 1 }))).await.unwrap();
        store.set("c", "k", doc(json!({ "v": 2 }))).await.unwrap();
        let found = store.get("c", "k").await.unwrap().expect("document");
        assert_eq!(found.get("v"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn batch_commit_persists_and_reloads() {
        let path = unique_path();
        let store = JsonFileStore::open(&path).await.unwrap();
        let id = store.add("subjects", doc(json!({ "name": "Math" }))).await.unwrap();
        store.set("attendance", "x", doc(json!({ "subjectId": id }))).await.unwrap();

        let mut batch = WriteBatch::new();
        batch.delete("subjects", &id).delete("attendance", "x");
        assert_eq!(batch.len(), 2);
        store.commit(batch).await.unwrap();

        let reopened = JsonFileStore::open(&path).await.unwrap();
        assert!(reopened.get("subjects", &id).await.unwrap().is_none());
        assert!(reopened.get("attendance", "x").await.unwrap().is_none());
        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn failed_write_leaves_memory_untouched() {
        let mut path = unique_path();
        path.push("nested");
        path.push("db.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let result = store.set("c", "k", doc(json!({ "v": 1 }))).await;
        assert!(matches!(result, Err(StoreError::Io(_))));
        assert!(store.get("c", "k").await.unwrap().is_none());
    }
}
