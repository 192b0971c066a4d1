/**
 * Read API Routes
 * Externally consumable JSON under /api with shared-cache headers, so a
 * CDN or the frontend's server can cache the owner's public content.
 */
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::error::StoreError;
use crate::routes::projects::ProjectListQuery;
use crate::AppState;

/// Entity lists tolerate five minutes of shared staleness
const LIST_CACHE: &str = "public, s-maxage=300, stale-while-revalidate=600";
/// The profile changes more often (avatar swaps while editing), so the
/// window is shorter
const PROFILE_CACHE: &str = "public, s-maxage=120, stale-while-revalidate=240";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEnvelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

fn ok_list<T: Serialize>(cache: &'static str, data: Vec<T>) -> Response {
    let count = data.len();
    (
        [(header::CACHE_CONTROL, cache)],
        Json(ApiEnvelope {
            success: true,
            data: Some(data),
            count: Some(count),
            error: None,
            message: None,
        }),
    )
        .into_response()
}

fn failure(err: &StoreError) -> Response {
    let status = match err {
        StoreError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ApiEnvelope::<()> {
            success: false,
            data: None,
            count: None,
            error: Some(err.kind().to_string()),
            message: Some(err.to_string()),
        }),
    )
        .into_response()
}

/// GET /api/projects[?featured=true]
pub async fn api_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Response {
    let Some(owner_id) = state.config.owner_id.clone() else {
        return ok_list::<crate::db::models::Project>(LIST_CACHE, vec![]);
    };

    let result = if query.featured.unwrap_or(false) {
        state.projects().list_featured(&owner_id).await
    } else {
        state.projects().list(&owner_id).await
    };

    match result {
        Ok(projects) => ok_list(LIST_CACHE, projects),
        Err(e) => failure(&e),
    }
}

/// GET /api/skills
pub async fn api_skills(State(state): State<AppState>) -> Response {
    let Some(owner_id) = state.config.owner_id.clone() else {
        return ok_list::<crate::db::models::Skill>(LIST_CACHE, vec![]);
    };

    match state.skills().list(&owner_id).await {
        Ok(skills) => ok_list(LIST_CACHE, skills),
        Err(e) => failure(&e),
    }
}

/// GET /api/experiences
pub async fn api_experiences(State(state): State<AppState>) -> Response {
    let Some(owner_id) = state.config.owner_id.clone() else {
        return ok_list::<crate::db::models::Experience>(LIST_CACHE, vec![]);
    };

    match state.experiences().list(&owner_id).await {
        Ok(experiences) => ok_list(LIST_CACHE, experiences),
        Err(e) => failure(&e),
    }
}

/// GET /api/profile
pub async fn api_profile(State(state): State<AppState>) -> Response {
    let profile = match state.config.owner_id.clone() {
        Some(owner_id) => match state.profiles().get(&owner_id).await {
            Ok(profile) => profile,
            Err(e) => return failure(&e),
        },
        None => None,
    };

    match profile {
        Some(profile) => (
            [(header::CACHE_CONTROL, PROFILE_CACHE)],
            Json(ApiEnvelope {
                success: true,
                data: Some(profile),
                count: None,
                error: None,
                message: None,
            }),
        )
            .into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiEnvelope::<()> {
                success: false,
                data: None,
                count: None,
                error: Some("not_found".to_string()),
                message: Some("No profile is published".to_string()),
            }),
        )
            .into_response(),
    }
}
