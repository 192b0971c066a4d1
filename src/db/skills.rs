//! Skill collection accessor.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{timestamp, to_doc, NewSkill, PatchSkill, Skill};
use crate::db::sort::Comparator;
use crate::db::store::{DocumentStore, Filter};

pub struct Skills {
    store: Arc<dyn DocumentStore>,
}

impl Skills {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Category label ascending so groups stay contiguous, then the
    /// manual order within each category.
    fn ordering() -> Comparator<Skill> {
        Comparator::new()
            .asc(|s: &Skill| s.category.label())
            .asc(|s: &Skill| s.order)
            .asc(|s: &Skill| s.id.clone())
    }

    pub async fn create(&self, owner_id: &str, data: NewSkill) -> Result<String, StoreError> {
        let mut doc = to_doc(&data);
        let now = timestamp(Utc::now());
        doc.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        doc.insert("createdAt".to_string(), now.clone());
        doc.insert("updatedAt".to_string(), now);

        self.store
            .insert(collections::SKILLS, doc)
            .await
            .map_err(|e| log_failure("create skill", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Skill>, StoreError> {
        match self
            .store
            .get(collections::SKILLS, id)
            .await
            .map_err(|e| log_failure("fetch skill", e))?
        {
            Some(doc) => Ok(Some(Skill::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Skill>, StoreError> {
        let docs = self
            .store
            .find(collections::SKILLS, Filter::new().eq("ownerId", owner_id))
            .await
            .map_err(|e| log_failure("list skills", e))?;

        let mut skills = docs
            .into_iter()
            .map(Skill::from_doc)
            .collect::<Result<Vec<_>, _>>()?;
        Self::ordering().sort(&mut skills);
        Ok(skills)
    }

    pub async fn update(&self, id: &str, patch: PatchSkill) -> Result<Option<Skill>, StoreError> {
        let mut doc = to_doc(&patch);
        doc.insert("updatedAt".to_string(), timestamp(Utc::now()));

        match self
            .store
            .merge(collections::SKILLS, id, doc)
            .await
            .map_err(|e| log_failure("update skill", e))?
        {
            Some(doc) => Ok(Some(Skill::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store
            .delete(collections::SKILLS, id)
            .await
            .map_err(|e| log_failure("delete skill", e))
    }
}
