//! Environment-backed application configuration, resolved once at
//! startup and shared through application state.

use std::path::PathBuf;

pub const DEFAULT_SESSION_SECRET: &str = "dev-session-secret-change-me";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub host: String,
    pub port: u16,
    /// Identity key whose content the public pages show. Fixed per
    /// deployment, never taken from the request.
    pub owner_id: Option<String>,
    pub database_url: Option<String>,
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub media_root: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            environment: std::env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(4000),
            owner_id: std::env::var("OWNER_ID")
                .ok()
                .map(|raw| raw.trim().to_string())
                .filter(|id| !id.is_empty()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            session_secret: std::env::var("SESSION_SECRET")
                .unwrap_or_else(|_| DEFAULT_SESSION_SECRET.to_string()),
            session_ttl_hours: std::env::var("SESSION_TTL_HOURS")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(12),
            media_root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("media")),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Refuses to boot production on the baked-in secret. A missing
    /// owner id is survivable (public pages render empty) but worth a
    /// loud warning.
    pub fn enforce_startup_safety(&self) {
        if self.is_production() && self.session_secret == DEFAULT_SESSION_SECRET {
            panic!("SESSION_SECRET must be set to a real value in production");
        }
        if self.owner_id.is_none() {
            tracing::warn!("OWNER_ID is not set; public pages will render without content");
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Self {
        Self {
            environment: "test".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            owner_id: Some("owner-1".to_string()),
            database_url: None,
            session_secret: "test-secret".to_string(),
            session_ttl_hours: 12,
            media_root: PathBuf::from("media"),
        }
    }
}
