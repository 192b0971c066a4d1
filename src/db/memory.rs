//! In-memory document store.
//!
//! Dependency-free backend used by the test suite and as the fallback
//! when no `DATABASE_URL` is configured, so the service still comes up
//! (empty) on a fresh checkout. Contents live for the process only.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::error::StoreError;
use crate::db::store::{Document, DocumentStore, Filter};

#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
    #[cfg(test)]
    failing_collections: RwLock<Vec<&'static str>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to the given collection fail with a permission
    /// error, for exercising partial-failure paths.
    #[cfg(test)]
    pub async fn fail_writes(&self, collection: &'static str) {
        self.failing_collections.write().await.push(collection);
    }

    #[cfg(test)]
    async fn write_fault(&self, collection: &str) -> Result<(), StoreError> {
        if self.failing_collections.read().await.contains(&collection) {
            return Err(StoreError::PermissionDenied {
                detail: format!("injected write fault on `{collection}`"),
            });
        }
        Ok(())
    }

    #[cfg(not(test))]
    async fn write_fault(&self, _collection: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, collection: &'static str, mut doc: Document) -> Result<String, StoreError> {
        self.write_fault(collection).await?;
        let id = Uuid::new_v4().to_string();
        doc.insert("id".to_string(), Value::String(id.clone()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), doc);
        Ok(id)
    }

    async fn put(&self, collection: &'static str, id: &str, mut doc: Document) -> Result<(), StoreError> {
        self.write_fault(collection).await?;
        doc.insert("id".to_string(), Value::String(id.to_string()));

        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), doc);
        Ok(())
    }

    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn find(&self, collection: &'static str, filter: Filter) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(docs
            .values()
            .filter(|doc| filter.matches(doc))
            .cloned()
            .collect())
    }

    async fn merge(
        &self,
        collection: &'static str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError> {
        self.write_fault(collection).await?;
        let mut collections = self.collections.write().await;
        let Some(doc) = collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
        else {
            return Ok(None);
        };
        for (field, value) in patch {
            doc.insert(field, value);
        }
        Ok(Some(doc.clone()))
    }

    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError> {
        self.write_fault(collection).await?;
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .is_some_and(|docs| docs.remove(id).is_some()))
    }
}
