//! Email/password identity provider.
//!
//! Identities live in their own collection, separate from profiles:
//! this module is the only place that sees password hashes. Hashing
//! and verification run on the blocking pool because bcrypt is CPU
//! bound by design.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::auth::AuthError;
use crate::db::collections;
use crate::db::error::StoreError;
use crate::db::log_failure;
use crate::db::models::{parse_doc, timestamp};
use crate::db::store::{Document, DocumentStore, Filter};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct IdentityProvider {
    store: Arc<dyn DocumentStore>,
}

impl IdentityProvider {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Whether any identity exists at all. Registration closes once the
    /// single owner account is in place.
    pub async fn any_exists(&self) -> Result<bool, StoreError> {
        let docs = self
            .store
            .find(collections::IDENTITIES, Filter::new())
            .await
            .map_err(|e| log_failure("count identities", e))?;
        Ok(!docs.is_empty())
    }

    /// Creates an identity with the email normalized to lowercase.
    pub async fn create(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let email = email.trim().to_lowercase();
        let password_hash = hash_password(password.to_string()).await?;
        let created_at = Utc::now();

        let mut doc = Document::new();
        doc.insert("email".to_string(), Value::String(email.clone()));
        doc.insert("passwordHash".to_string(), Value::String(password_hash.clone()));
        doc.insert("createdAt".to_string(), timestamp(created_at));

        let id = self
            .store
            .insert(collections::IDENTITIES, doc)
            .await
            .map_err(|e| log_failure("create identity", e))?;

        Ok(Identity {
            id,
            email,
            password_hash,
            display_name: None,
            created_at,
        })
    }

    pub async fn get(&self, id: &str) -> Result<Option<Identity>, StoreError> {
        match self
            .store
            .get(collections::IDENTITIES, id)
            .await
            .map_err(|e| log_failure("fetch identity", e))?
        {
            Some(doc) => Ok(Some(parse_doc(collections::IDENTITIES, doc)?)),
            None => Ok(None),
        }
    }

    /// Display name is cosmetic on the identity record, so callers may
    /// treat a failure here as non-fatal.
    pub async fn set_display_name(&self, id: &str, name: &str) -> Result<(), StoreError> {
        let mut patch = Document::new();
        patch.insert("displayName".to_string(), Value::String(name.to_string()));
        self.store
            .merge(collections::IDENTITIES, id, patch)
            .await
            .map_err(|e| log_failure("set identity display name", e))?;
        Ok(())
    }

    /// Checks a password against the stored hash. Unknown emails and
    /// wrong passwords are both `None`; callers present them the same
    /// way so the response does not leak which one it was.
    pub async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<Identity>, AuthError> {
        let email = email.trim().to_lowercase();
        let docs = self
            .store
            .find(collections::IDENTITIES, Filter::new().eq("email", email.as_str()))
            .await
            .map_err(|e| log_failure("look up identity", e))?;

        let Some(doc) = docs.into_iter().next() else {
            return Ok(None);
        };
        let identity: Identity = parse_doc(collections::IDENTITIES, doc)?;

        let hash = identity.password_hash.clone();
        let candidate = password.to_string();
        let matches = tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash))
            .await
            .map_err(|e| AuthError::Hash(format!("verification task failed: {e}")))?
            .map_err(|e| AuthError::Hash(e.to_string()))?;

        Ok(matches.then_some(identity))
    }
}

async fn hash_password(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AuthError::Hash(format!("hashing task failed: {e}")))?
        .map_err(|e| AuthError::Hash(e.to_string()))
}
