//! Profile accessor.
//!
//! Profiles are keyed by the auth identity key instead of a generated
//! one, so the session bridge can line the two up without a lookup
//! table. There is no delete: a deployment keeps its owner profile.

use std::sync::Arc;

use chrono::Utc;

use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{timestamp, to_doc, PatchProfile, Profile};
use crate::db::store::DocumentStore;

pub struct Profiles {
    store: Arc<dyn DocumentStore>,
}

impl Profiles {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Writes the full profile under its identity key, replacing any
    /// previous document.
    pub async fn put(&self, profile: &Profile) -> Result<(), StoreError> {
        self.store
            .put(collections::USERS, &profile.id, to_doc(profile))
            .await
            .map_err(|e| log_failure("write profile", e))
    }

    pub async fn get(&self, id: &str) -> Result<Option<Profile>, StoreError> {
        match self
            .store
            .get(collections::USERS, id)
            .await
            .map_err(|e| log_failure("fetch profile", e))?
        {
            Some(doc) => Ok(Some(Profile::from_doc(doc)?)),
            None => Ok(None),
        }
    }

    pub async fn update(&self, id: &str, patch: PatchProfile) -> Result<Option<Profile>, StoreError> {
        let mut doc = to_doc(&patch);
        doc.insert("updatedAt".to_string(), timestamp(Utc::now()));

        match self
            .store
            .merge(collections::USERS, id, doc)
            .await
            .map_err(|e| log_failure("update profile", e))?
        {
            Some(doc) => Ok(Some(Profile::from_doc(doc)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    fn sample(id: &str) -> Profile {
        let now = Utc::now();
        Profile {
            id: id.into(),
            email: "owner@example.com".into(),
            display_name: "Owner".into(),
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            github: None,
            linkedin: None,
            twitter: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn accessor() -> Profiles {
        Profiles::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn put_keys_the_profile_by_its_identity() {
        let profiles = accessor();
        profiles.put(&sample("uid-1")).await.unwrap();

        let fetched = profiles.get("uid-1").await.unwrap().unwrap();
        assert_eq!(fetched.email, "owner@example.com");
        assert!(profiles.get("uid-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_merges_without_dropping_identity_fields() {
        let profiles = accessor();
        profiles.put(&sample("uid-1")).await.unwrap();

        let updated = profiles
            .update(
                "uid-1",
                PatchProfile {
                    bio: Some("writes Rust".into()),
                    location: Some("Berlin".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.bio.as_deref(), Some("writes Rust"));
        assert_eq!(updated.email, "owner@example.com");
        assert_eq!(updated.display_name, "Owner");
    }

    #[tokio::test]
    async fn update_of_an_absent_profile_is_none() {
        let profiles = accessor();
        let result = profiles
            .update("missing", PatchProfile::default())
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
