//! Data layer: the document-store boundary, typed entities and the
//! per-collection accessors built on top of it.

pub mod blog;
pub mod error;
pub mod experiences;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod profiles;
pub mod projects;
pub mod skills;
pub mod sort;
pub mod store;

use error::StoreError;

/// Collection names as they appear in the store.
pub mod collections {
    /// Profiles, keyed by the auth identity key.
    pub const USERS: &str = "users";
    pub const PROJECTS: &str = "projects";
    pub const SKILLS: &str = "skills";
    pub const EXPERIENCES: &str = "experiences";
    pub const BLOG: &str = "blog";
    /// Email/password identities owned by the auth provider.
    pub const IDENTITIES: &str = "identities";
}

/// Logs a store failure at the point it leaves the data layer, then
/// hands the error back for propagation. Permission failures carry a
/// remediation hint because they mean deployment misconfiguration, not
/// a code path worth retrying.
pub(crate) fn log_failure(op: &'static str, err: StoreError) -> StoreError {
    match &err {
        StoreError::PermissionDenied { detail } => {
            tracing::error!(
                op,
                detail = %detail,
                "store denied access; check the database role grants (README, Configuration)"
            );
        }
        StoreError::Unavailable { detail } => {
            tracing::error!(op, detail = %detail, "store unavailable");
        }
        StoreError::Malformed { collection, id, .. } => {
            tracing::error!(op, collection, id = %id, "document does not match the entity schema");
        }
        StoreError::Backend(source) => {
            tracing::error!(op, error = %source, "store request failed");
        }
    }
    err
}
