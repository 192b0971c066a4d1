/**
 * Profile Routes
 * The owner's profile document behind /settings.
 */
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;

use crate::db::models::PatchProfile;
use crate::routes::{bad_request, not_found, require_session, store_error_response};
use crate::AppState;

/// GET /settings/profile
pub async fn get_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    match state.profiles().get(&claims.sub).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => not_found("Profile").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// PATCH /settings/profile
/// Identity fields (id, email) belong to the auth provider and cannot
/// be edited here.
pub async fn update_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<PatchProfile>,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    if let Some(display_name) = &payload.display_name {
        if display_name.trim().is_empty() {
            return bad_request("Display name cannot be blank").into_response();
        }
    }

    match state.profiles().update(&claims.sub, payload).await {
        Ok(Some(profile)) => Json(profile).into_response(),
        Ok(None) => not_found("Profile").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}
