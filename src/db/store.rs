//! Document-store boundary.
//!
//! The rest of the crate talks to persistence through [`DocumentStore`]
//! only. Documents are schemaless JSON objects grouped into named
//! collections; typed parsing happens above this boundary, in the
//! accessors. Two backends implement the trait: Postgres for real
//! deployments and an in-memory map for tests and store-less startup.

use async_trait::async_trait;
use serde_json::Value;

use crate::db::error::StoreError;

/// A raw stored document. Field names are camelCase on this level
/// because that is how the documents travel over the wire.
pub type Document = serde_json::Map<String, Value>;

/// Conjunction of exact-match clauses over top-level document fields.
#[derive(Debug, Clone, Default)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause. All clauses must hold for a match.
    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push((field.to_string(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Evaluates the filter against a document in memory.
    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, expected)| doc.get(field) == Some(expected))
    }

    /// The filter as a JSON object, suitable for a `@>` containment
    /// query against a jsonb column.
    pub fn to_containment(&self) -> Value {
        let mut object = Document::new();
        for (field, value) in &self.clauses {
            object.insert(field.clone(), value.clone());
        }
        Value::Object(object)
    }
}

/// CRUD over collections of JSON documents.
///
/// Identity keys are strings owned by the store (except for `put`,
/// where the caller chooses the key). Lookups that find nothing return
/// `Ok(None)`; only real backend failures surface as [`StoreError`].
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document under a fresh identity key and returns it.
    async fn insert(&self, collection: &'static str, doc: Document) -> Result<String, StoreError>;

    /// Writes a document under a caller-chosen identity key, replacing
    /// any previous document with that key.
    async fn put(&self, collection: &'static str, id: &str, doc: Document) -> Result<(), StoreError>;

    async fn get(&self, collection: &'static str, id: &str) -> Result<Option<Document>, StoreError>;

    /// All documents in the collection matching the filter, in no
    /// particular order. Callers sort.
    async fn find(&self, collection: &'static str, filter: Filter) -> Result<Vec<Document>, StoreError>;

    /// Shallow-merges `patch` into an existing document. Fields present
    /// in the patch overwrite; everything else is untouched. Returns
    /// the merged document, or `None` when the key does not exist.
    async fn merge(
        &self,
        collection: &'static str,
        id: &str,
        patch: Document,
    ) -> Result<Option<Document>, StoreError>;

    /// Removes a document. `false` means there was nothing to remove.
    async fn delete(&self, collection: &'static str, id: &str) -> Result<bool, StoreError>;

    /// Connectivity probe for health reporting.
    async fn ping(&self) -> Result<std::time::Duration, StoreError> {
        Ok(std::time::Duration::ZERO)
    }
}
