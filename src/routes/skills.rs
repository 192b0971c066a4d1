/**
 * Skill Routes
 * Public category-grouped listing plus dashboard CRUD.
 */
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::db::models::{NewSkill, PatchSkill, Skill, SkillCategory};
use crate::routes::{
    bad_request, not_found, require_session, store_error_response, SuccessResponse,
};
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// One category block on the public site
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGroup {
    pub category: SkillCategory,
    pub label: String,
    pub skills: Vec<Skill>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGroupsResponse {
    pub groups: Vec<SkillGroup>,
    pub count: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillListResponse {
    pub skills: Vec<Skill>,
    pub count: usize,
}

// ============================================================================
// Validation
// ============================================================================

fn validate_level(level: u8) -> Result<(), (StatusCode, Json<super::ErrorResponse>)> {
    if (1..=5).contains(&level) {
        Ok(())
    } else {
        Err(bad_request("Level must be between 1 and 5"))
    }
}

/// Folds the accessor's sorted output into contiguous category blocks.
/// Relies on the list already being ordered by category label.
pub(crate) fn group_by_category(skills: Vec<Skill>) -> Vec<SkillGroup> {
    let mut groups: Vec<SkillGroup> = Vec::new();
    for skill in skills {
        match groups.last_mut() {
            Some(group) if group.category == skill.category => group.skills.push(skill),
            _ => groups.push(SkillGroup {
                category: skill.category,
                label: skill.category.label().to_string(),
                skills: vec![skill],
            }),
        }
    }
    groups
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /skills - Owner's skills grouped by category
pub async fn public_skills(State(state): State<AppState>) -> impl IntoResponse {
    let Some(owner_id) = state.config.owner_id.clone() else {
        return Json(SkillGroupsResponse {
            groups: vec![],
            count: 0,
        })
        .into_response();
    };

    match state.skills().list(&owner_id).await {
        Ok(skills) => {
            let count = skills.len();
            Json(SkillGroupsResponse {
                groups: group_by_category(skills),
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

/// GET /dashboard/skills
pub async fn list_skills(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    match state.skills().list(&claims.sub).await {
        Ok(skills) => {
            let count = skills.len();
            Json(SkillListResponse { skills, count }).into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/skills
pub async fn create_skill(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<NewSkill>,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    if payload.name.trim().is_empty() {
        return bad_request("Name is required").into_response();
    }
    if let Err(rejection) = validate_level(payload.level) {
        return rejection.into_response();
    }

    let id = match state.skills().create(&claims.sub, payload).await {
        Ok(id) => id,
        Err(e) => return store_error_response(&e).into_response(),
    };

    match state.skills().get(&id).await {
        Ok(Some(skill)) => (StatusCode::CREATED, Json(skill)).into_response(),
        Ok(None) => not_found("Skill").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// PATCH /dashboard/skills/{id}
pub async fn update_skill(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<PatchSkill>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    if let Some(level) = payload.level {
        if let Err(rejection) = validate_level(level) {
            return rejection.into_response();
        }
    }

    match state.skills().update(&id, payload).await {
        Ok(Some(skill)) => Json(skill).into_response(),
        Ok(None) => not_found("Skill").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// DELETE /dashboard/skills/{id}
pub async fn delete_skill(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.skills().delete(&id).await {
        Ok(true) => Json(SuccessResponse::ok()).into_response(),
        Ok(false) => not_found("Skill").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}
