/**
 * Authentication Routes
 * Cookie-session registration, login, logout, and session introspection
 * backed by the session bridge.
 */
use axum::{
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::auth::{AuthError, LoginOutcome, SessionUser};
use crate::db::error::StoreError;
use crate::db::models::Profile;
use crate::gate;
use crate::routes::session_token;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SessionResponse {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            user: None,
            profile: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStateResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogoutResponse {
    pub success: bool,
}

// ============================================================================
// Cookies
// ============================================================================

/// The gate reads cookie *presence*; handlers verify the token itself.
/// `userId` is readable by frontend scripts on purpose, the session
/// token is not.
fn signed_in_jar(jar: CookieJar, outcome: &LoginOutcome, secure: bool) -> CookieJar {
    let token = Cookie::build((gate::SESSION_COOKIE, outcome.token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    let user = Cookie::build((gate::USER_COOKIE, outcome.user.id.clone()))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(secure)
        .build();
    jar.add(token).add(user)
}

fn signed_out_jar(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(gate::SESSION_COOKIE).path("/"))
        .remove(Cookie::build(gate::USER_COOKIE).path("/"))
}

// ============================================================================
// Validation
// ============================================================================

fn validate_credentials(email: &str, password: &str) -> Result<(), &'static str> {
    if email.is_empty() || password.is_empty() {
        return Err("Email and password are required");
    }
    if !email.contains('@') {
        return Err("Invalid email format");
    }
    if password.len() < 8 {
        return Err("Password must be at least 8 characters long");
    }
    Ok(())
}

fn auth_failure(err: AuthError) -> (StatusCode, Json<SessionResponse>) {
    let (status, message) = match &err {
        AuthError::InvalidCredentials => {
            (StatusCode::UNAUTHORIZED, "Invalid credentials".to_string())
        }
        AuthError::RegistrationClosed => (StatusCode::FORBIDDEN, err.to_string()),
        AuthError::ProfileSetup { .. } => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        AuthError::Store(StoreError::Unavailable { .. }) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Authentication service temporarily unavailable".to_string(),
        ),
        AuthError::Store(_) | AuthError::Hash(_) | AuthError::Token(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication failed".to_string(),
        ),
    };
    (status, Json(SessionResponse::failure(message)))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /register
/// Creates the owner account, then signs it in. Closed once an account
/// exists: this is a single-owner system.
pub async fn register(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(payload): Json<RegisterRequest>,
) -> impl IntoResponse {
    let ip = addr.ip().to_string();
    if !state.sessions.check_login_rate(&ip).await {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(SessionResponse::failure(
                "Too many requests. Please try again later.",
            )),
        )
            .into_response();
    }

    if let Err(reason) = validate_credentials(&payload.email, &payload.password) {
        return (
            StatusCode::BAD_REQUEST,
            Json(SessionResponse::failure(reason)),
        )
            .into_response();
    }
    if payload.display_name.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(SessionResponse::failure("Display name is required")),
        )
            .into_response();
    }

    match state
        .sessions
        .register(&payload.email, &payload.password, &payload.display_name)
        .await
    {
        Ok(outcome) => {
            tracing::info!("Owner account registered: {}", payload.email);
            let jar = signed_in_jar(jar, &outcome, state.config.is_production());
            (
                StatusCode::CREATED,
                jar,
                Json(SessionResponse {
                    success: true,
                    user: Some(outcome.user),
                    profile: outcome.profile,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            tracing::warn!("Registration failed: {}", err);
            auth_failure(err).into_response()
        }
    }
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> impl IntoResponse {
    let ip = addr.ip().to_string();
    if !state.sessions.check_login_rate(&ip).await {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(SessionResponse::failure(
                "Too many requests. Please try again later.",
            )),
        )
            .into_response();
    }

    if let Err(reason) = validate_credentials(&payload.email, &payload.password) {
        return (
            StatusCode::BAD_REQUEST,
            Json(SessionResponse::failure(reason)),
        )
            .into_response();
    }

    match state.sessions.login(&payload.email, &payload.password).await {
        Ok(outcome) => {
            tracing::info!("Successful login for {}", payload.email);
            let jar = signed_in_jar(jar, &outcome, state.config.is_production());
            (
                StatusCode::OK,
                jar,
                Json(SessionResponse {
                    success: true,
                    user: Some(outcome.user),
                    profile: outcome.profile,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            if matches!(err, AuthError::InvalidCredentials) {
                tracing::warn!("Failed login attempt for {}", payload.email);
            } else {
                tracing::error!("Login failed: {}", err);
            }
            auth_failure(err).into_response()
        }
    }
}

/// POST /logout
/// Idempotent: clears the session cookies whether or not they were set.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    state.sessions.logout();
    let jar = signed_out_jar(jar);
    (StatusCode::OK, jar, Json(LogoutResponse { success: true }))
}

/// GET /session
/// Always 200: "who am I" is a question, not a gate.
pub async fn session(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let snapshot = match session_token(&jar, &headers) {
        Some(token) => state.sessions.session_view(&token).await,
        None => None,
    };

    match snapshot {
        Some(snapshot) => Json(SessionStateResponse {
            authenticated: true,
            user: Some(snapshot.user),
            profile: snapshot.profile,
        }),
        None => Json(SessionStateResponse {
            authenticated: false,
            user: None,
            profile: None,
        }),
    }
}
