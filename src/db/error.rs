//! Store failure taxonomy.
//!
//! Every backend maps its native failures into [`StoreError`] before the
//! error leaves the data layer, so accessors and routes react to the
//! cause class instead of backend-specific codes. Absence is never an
//! error here: lookups that find nothing return `Ok(None)`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend rejected the request outright. Retrying is pointless
    /// until the store's access rules change.
    #[error("store denied access: {detail}")]
    PermissionDenied { detail: String },

    /// The backend could not be reached or the pool gave up. Retrying
    /// later may succeed.
    #[error("store unavailable: {detail}")]
    Unavailable { detail: String },

    /// A stored document no longer matches the entity schema.
    #[error("malformed document {id} in `{collection}`")]
    Malformed {
        collection: &'static str,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Anything else the backend reported.
    #[error("store request failed")]
    Backend(#[source] sqlx::Error),
}

impl StoreError {
    /// Folds a raw sqlx failure into its cause class.
    pub fn classify(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(io) => StoreError::Unavailable {
                detail: io.to_string(),
            },
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable {
                detail: err.to_string(),
            },
            sqlx::Error::Configuration(_) => StoreError::Unavailable {
                detail: err.to_string(),
            },
            // 42501 is insufficient_privilege in Postgres.
            sqlx::Error::Database(db) if db.code().as_deref() == Some("42501") => {
                StoreError::PermissionDenied {
                    detail: db.message().to_string(),
                }
            }
            other => StoreError::Backend(other),
        }
    }

    /// Short machine-readable tag for log fields and wire envelopes.
    pub fn kind(&self) -> &'static str {
        match self {
            StoreError::PermissionDenied { .. } => "permission_denied",
            StoreError::Unavailable { .. } => "unavailable",
            StoreError::Malformed { .. } => "malformed",
            StoreError::Backend(_) => "backend",
        }
    }
}
