//! Project collection accessor.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{timestamp, to_doc, NewProject, PatchProject, Project};
use crate::db::sort::Comparator;
use crate::db::store::{DocumentStore, Filter};

pub struct Projects {
    store: Arc<dyn DocumentStore>,
}

impl Projects {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Manual order ascending, id as the stable tiebreak.
    fn ordering() -> Comparator<Project> {
        Comparator::new()
            .asc(|p: &Project| p.order)
            .asc(|p: &Project| p.id.clone())
    }

    /// Stamps ownership and timestamps, inserts, returns the new id.
    pub async fn create(&self, owner_id: &str, data: NewProject) -> Result<String, StoreError> {
        let mut doc = to_doc(&data);
        let now = timestamp(Utc::now());
        doc.insert("ownerId".to_string(), Value::String(owner_id.to_string()));
        doc.insert("createdAt".to_string(), now.clone());
        doc.insert("updatedAt".to_string(), now);

        self.store
            .insert(collections::PROJECTS, doc)
            .await
            .map_err(|e| log_failure("create project", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Project>, StoreError> {
        match self
            .store
            .get(collections::PROJECTS, id)
            .await
            .map_err(|e| log_failure("fetch project", e))?
        {
            Some(doc) => Ok(Some(Project::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn list(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        self.fetch(Filter::new().eq("ownerId", owner_id)).await
    }

    pub async fn list_featured(&self, owner_id: &str) -> Result<Vec<Project>, StoreError> {
        self.fetch(Filter::new().eq("ownerId", owner_id).eq("featured", true))
            .await
    }

    async fn fetch(&self, filter: Filter) -> Result<Vec<Project>, StoreError> {
        let docs = self
            .store
            .find(collections::PROJECTS, filter)
            .await
            .map_err(|e| log_failure("list projects", e))?;

        let mut projects = docs
            .into_iter()
            .map(Project::from_doc)
            .collect::<Result<Vec<_>, _>>()?;
        Self::ordering().sort(&mut projects);
        Ok(projects)
    }

    /// Shallow-merges the patch and bumps `updatedAt`. `None` means the
    /// project does not exist.
    pub async fn update(&self, id: &str, patch: PatchProject) -> Result<Option<Project>, StoreError> {
        let mut doc = to_doc(&patch);
        doc.insert("updatedAt".to_string(), timestamp(Utc::now()));

        match self
            .store
            .merge(collections::PROJECTS, id, doc)
            .await
            .map_err(|e| log_failure("update project", e))?
        {
            Some(doc) => Ok(Some(Project::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn toggle_featured(&self, id: &str) -> Result<Option<Project>, StoreError> {
        let Some(existing) = self.get(id).await? else {
            return Ok(None);
        };
        self.update(
            id,
            PatchProject {
                featured: Some(!existing.featured),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store
            .delete(collections::PROJECTS, id)
            .await
            .map_err(|e| log_failure("delete project", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::models::ProjectCategory;
    use serde_json::json;

    fn sample(title: &str, order: i64) -> NewProject {
        NewProject {
            title: title.into(),
            summary: "summary".into(),
            description: "description".into(),
            image_urls: Vec::new(),
            thumbnail_url: "/media/projects/thumb.png".into(),
            technologies: vec!["rust".into()],
            category: ProjectCategory::Web,
            live_url: None,
            source_url: None,
            featured: false,
            order,
        }
    }

    fn accessor() -> (Arc<MemoryStore>, Projects) {
        let store = Arc::new(MemoryStore::new());
        (store.clone(), Projects::new(store))
    }

    #[tokio::test]
    async fn create_stamps_owner_and_timestamps() {
        let (_, projects) = accessor();
        let id = projects.create("owner-1", sample("Folio", 0)).await.unwrap();

        let fetched = projects.get(&id).await.unwrap().unwrap();
        assert_eq!(fetched.owner_id, "owner-1");
        assert_eq!(fetched.title, "Folio");
        assert_eq!(fetched.created_at, fetched.updated_at);
    }

    #[tokio::test]
    async fn list_sorts_by_manual_order_regardless_of_insertion() {
        let (_, projects) = accessor();
        projects.create("owner-1", sample("third", 30)).await.unwrap();
        projects.create("owner-1", sample("first", 10)).await.unwrap();
        projects.create("owner-1", sample("second", 20)).await.unwrap();

        let titles: Vec<_> = projects
            .list("owner-1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_owner() {
        let (_, projects) = accessor();
        projects.create("owner-1", sample("mine", 0)).await.unwrap();
        projects.create("owner-2", sample("theirs", 0)).await.unwrap();

        let listed = projects.list("owner-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, "mine");
    }

    #[tokio::test]
    async fn featured_listing_filters_and_keeps_the_order() {
        let (_, projects) = accessor();
        let mut starred = sample("starred-late", 20);
        starred.featured = true;
        projects.create("owner-1", starred).await.unwrap();

        let mut starred_early = sample("starred-early", 10);
        starred_early.featured = true;
        projects.create("owner-1", starred_early).await.unwrap();

        projects.create("owner-1", sample("plain", 0)).await.unwrap();

        let titles: Vec<_> = projects
            .list_featured("owner-1")
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["starred-early", "starred-late"]);
    }

    #[tokio::test]
    async fn update_patches_a_subset_and_bumps_updated_at() {
        let (_, projects) = accessor();
        let id = projects.create("owner-1", sample("before", 0)).await.unwrap();
        let created = projects.get(&id).await.unwrap().unwrap();

        let updated = projects
            .update(
                &id,
                PatchProject {
                    title: Some("after".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "after");
        assert_eq!(updated.summary, "summary");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn update_of_a_missing_project_is_none() {
        let (_, projects) = accessor();
        let result = projects
            .update("ghost", PatchProject::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn toggle_featured_flips_the_flag() {
        let (_, projects) = accessor();
        let id = projects.create("owner-1", sample("p", 0)).await.unwrap();

        let on = projects.toggle_featured(&id).await.unwrap().unwrap();
        assert!(on.featured);
        let off = projects.toggle_featured(&id).await.unwrap().unwrap();
        assert!(!off.featured);
    }

    #[tokio::test]
    async fn delete_reports_absence_on_the_second_call() {
        let (_, projects) = accessor();
        let id = projects.create("owner-1", sample("p", 0)).await.unwrap();

        assert!(projects.delete(&id).await.unwrap());
        assert!(!projects.delete(&id).await.unwrap());
        assert!(projects.get(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn a_corrupt_document_surfaces_as_malformed() {
        let (store, projects) = accessor();
        store
            .put(
                collections::PROJECTS,
                "bad",
                json!({"ownerId": "owner-1", "title": 42})
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();

        let err = projects.list("owner-1").await.unwrap_err();
        assert_eq!(err.kind(), "malformed");
    }
}
