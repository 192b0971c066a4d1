/**
 * Experience Routes
 * Public work history (with rendered durations) plus dashboard CRUD.
 */
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::content::format_duration;
use crate::db::models::{Experience, NewExperience, PatchExperience};
use crate::routes::{
    bad_request, not_found, require_session, store_error_response, SuccessResponse,
};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Experience plus the rendered duration string ("2y 3m") the public
/// site shows next to each position.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExperienceView {
    #[serde(flatten)]
    pub experience: Experience,
    pub duration: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceViewsResponse {
    pub experiences: Vec<ExperienceView>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceListResponse {
    pub experiences: Vec<Experience>,
    pub count: usize,
}

fn into_view(experience: Experience) -> ExperienceView {
    let duration = format_duration(
        experience.start_date,
        experience.end_date,
        experience.current,
    );
    ExperienceView {
        experience,
        duration,
    }
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /experience - Owner's work history, current role first
pub async fn public_experiences(State(state): State<AppState>) -> impl IntoResponse {
    let Some(owner_id) = state.config.owner_id.clone() else {
        return Json(ExperienceViewsResponse {
            experiences: vec![],
            count: 0,
        })
        .into_response();
    };

    match state.experiences().list(&owner_id).await {
        Ok(experiences) => {
            let count = experiences.len();
            Json(ExperienceViewsResponse {
                experiences: experiences.into_iter().map(into_view).collect(),
                count,
            })
            .into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

// ============================================================================
// Dashboard Handlers
// ============================================================================

/// GET /dashboard/experience
pub async fn list_experiences(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    match state.experiences().list(&claims.sub).await {
        Ok(experiences) => {
            let count = experiences.len();
            Json(ExperienceListResponse { experiences, count }).into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/experience
pub async fn create_experience(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<NewExperience>,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    if payload.company.trim().is_empty() {
        return bad_request("Company is required").into_response();
    }
    if payload.position.trim().is_empty() {
        return bad_request("Position is required").into_response();
    }

    let id = match state.experiences().create(&claims.sub, payload).await {
        Ok(id) => id,
        Err(e) => return store_error_response(&e).into_response(),
    };

    match state.experiences().get(&id).await {
        Ok(Some(experience)) => (StatusCode::CREATED, Json(experience)).into_response(),
        Ok(None) => not_found("Experience").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// PATCH /dashboard/experience/{id}
pub async fn update_experience(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<PatchExperience>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.experiences().update(&id, payload).await {
        Ok(Some(experience)) => Json(experience).into_response(),
        Ok(None) => not_found("Experience").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// DELETE /dashboard/experience/{id}
pub async fn delete_experience(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.experiences().delete(&id).await {
        Ok(true) => Json(SuccessResponse::ok()).into_response(),
        Ok(false) => not_found("Experience").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}
