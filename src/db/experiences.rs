//! Experience collection accessor.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{timestamp, to_doc, Experience, NewExperience, PatchExperience};
use crate::db::sort::Comparator;
use crate::db::store::{DocumentStore, Filter};

pub struct Experiences {
    store: Arc<dyn DocumentStore>,
}

impl Experiences {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Ongoing positions first, then most recent start date.
    fn ordering() -> Comparator<Experience> {
        Comparator::new()
            .desc(|e: &Experience| e.current)
            .desc(|e: &Experience| e.start_date)
            .asc(|e: &Experience| e.id.clone())
    }

    pub async fn create(&self, owner_id: &str, data: NewExperience) -> Result<String, StoreError> {
        let mut doc = to_doc(&data);
        let now = timestamp(Utc::now());
        doc.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        doc.insert("createdAt".to_string(), now.clone());
        doc.insert("updatedAt".to_string(), now);

        self.store
            .insert(collections::EXPERIENCES, doc)
            .await
            .map_err(|e| log_failure("create experience", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Experience>, StoreError> {
        match self
            .store
            .get(collections::EXPERIENCES, id)
            .await
            .map_err(|e| log_failure("fetch experience", e))?
        {
            Some(doc) => Ok(Some(Experience::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Experience>, StoreError> {
        let docs = self
            .store
            .find(collections::EXPERIENCES, Filter::new().eq("ownerId", owner_id))
            .await
            .map_err(|e| log_failure("list experiences", e))?;

        let mut experiences = docs
            .into_iter()
            .map(Experience::from_doc)
            .collect::<Result<Vec<_>, _>>()?;
        Self::ordering().sort(&mut experiences);
        Ok(experiences)
    }

    pub async fn update(
        &self,
        id: &str,
        patch: PatchExperience,
    ) -> Result<Option<Experience>, StoreError> {
        let mut doc = to_doc(&patch);
        doc.insert("updatedAt".to_string(), timestamp(Utc::now()));

        match self
            .store
            .merge(collections::EXPERIENCES, id, doc)
            .await
            .map_err(|e| log_failure("update experience", e))?
        {
            Some(doc) => Ok(Some(Experience::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store
            .delete(collections::EXPERIENCES, id)
            .await
            .map_err(|e| log_failure("delete experience", e))
    }
}
