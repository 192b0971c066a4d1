/**
 * Routes Module
 * HTTP handlers plus the shared wire envelope and session helpers.
 */
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::auth::Claims;
use crate::db::error::StoreError;
use crate::gate;
use crate::AppState;

pub mod api;
pub mod auth;
pub mod blog;
pub mod dashboard;
pub mod experiences;
pub mod health;
pub mod home;
pub mod profile;
pub mod projects;
pub mod skills;
pub mod uploads;

// ===== Shared wire types =====

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: None,
        }
    }

    pub fn with_message(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

impl SuccessResponse {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

// ===== Session helpers =====

/// Token from the session cookie, falling back to a bearer header for
/// non-browser clients.
pub(crate) fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(gate::SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Validates the presented session token. The gate already bounced
/// cookie-less browsers; this is the real check behind it.
pub(crate) fn require_session(
    state: &AppState,
    jar: &CookieJar,
    headers: &HeaderMap,
) -> Result<Claims, (StatusCode, Json<ErrorResponse>)> {
    let Some(token) = session_token(jar, headers) else {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Authentication required")),
        ));
    };
    state.sessions.authenticate(&token).map_err(|_| {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Invalid or expired session")),
        )
    })
}

// ===== Failure mapping =====

/// Store failures for page and dashboard routes: outages are 503 so
/// clients can tell "try later" from "something broke".
pub(crate) fn store_error_response(err: &StoreError) -> (StatusCode, Json<ErrorResponse>) {
    match err {
        StoreError::Unavailable { .. } => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::with_message(
                "Content store unavailable",
                "The backing store cannot be reached right now; try again shortly",
            )),
        ),
        StoreError::PermissionDenied { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_message(
                "Content store rejected the request",
                "The store's access rules deny this operation; check the deployment's database grants",
            )),
        ),
        StoreError::Malformed { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::with_message(
                "Stored content is corrupted",
                "A stored record no longer matches its schema; see the server log for the document id",
            )),
        ),
        StoreError::Backend(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new("Content store request failed")),
        ),
    }
}

pub(crate) fn not_found(what: &str) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!("{what} not found"))),
    )
}

pub(crate) fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse::new(message)),
    )
}

/// Strips scripts and event handlers from owner-authored HTML before it
/// is stored. The dashboard is single-owner, but stored content is
/// served to everyone.
pub(crate) fn sanitize_html(html: &str) -> String {
    ammonia::clean(html)
}
