//! Store wrapper for tests that can fail or stall on demand.

use crate::store::{Document, DocumentStore, JsonFileStore, StoreError, StoredDocument, WriteBatch};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

pub(crate) struct FlakyStore {
    pub inner: JsonFileStore,
    pub fail_queries: AtomicBool,
    pub fail_writes: AtomicBool,
    /// Writes wait for `release` while set.
    pub hold_writes: AtomicBool,
    pub release: Notify,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: JsonFileStore::in_memory(),
            fail_queries: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            hold_writes: AtomicBool::new(false),
            release: Notify::new(),
        }
    }

    pub fn set_flag(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }

    fn check(flag: &AtomicBool) -> Result<(), StoreError> {
        if flag.load(Ordering::SeqCst) {
            Err(StoreError::Io(std::io::Error::other("injected failure")))
        } else {
            Ok(())
        }
    }

    async fn before_write(&self) -> Result<(), StoreError> {
        if self.hold_writes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        Self::check(&self.fail_writes)
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        Self::check(&self.fail_queries)?;
        self.inner.query_eq(collection, field, value).await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn set(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        self.before_write().await?;
        self.inner.set(collection, id, data).await
    }

    async fn add(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        self.before_write().await?;
        self.inner.add(collection, data).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.before_write().await?;
        self.inner.delete(collection, id).await
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.before_write().await?;
        self.inner.commit(batch).await
    }
}
