/**
 * Project Routes
 * Public listing plus dashboard CRUD for the owner's projects.
 */
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::db::models::{NewProject, PatchProject, Project};
use crate::routes::{
    bad_request, not_found, require_session, store_error_response, SuccessResponse,
};
use crate::storage;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /projects
#[derive(Debug, Default, Deserialize)]
pub struct ProjectListQuery {
    pub featured: Option<bool>,
}

/// Response for project list views
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
    pub count: usize,
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /projects - Owner's projects for the public site
/// `?featured=true` narrows to the featured set
pub async fn public_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> impl IntoResponse {
    // No owner configured: the public site renders empty rather than erroring
    let Some(owner_id) = state.config.owner_id.clone() else {
        return Json(ProjectListResponse {
            projects: vec![],
            count: 0,
        })
        .into_response();
    };

    let result = if query.featured.unwrap_or(false) {
        state.projects().list_featured(&owner_id).await
    } else {
        state.projects().list(&owner_id).await
    };

    match result {
        Ok(projects) => {
            let count = projects.len();
            Json(ProjectListResponse { projects, count }).into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

// ============================================================================
// Dashboard Handlers
// ============================================================================

/// GET /dashboard/projects - All of the signed-in owner's projects
pub async fn list_projects(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    match state.projects().list(&claims.sub).await {
        Ok(projects) => {
            let count = projects.len();
            Json(ProjectListResponse { projects, count }).into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/projects - Create a project
pub async fn create_project(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<NewProject>,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    if payload.title.trim().is_empty() {
        return bad_request("Title is required").into_response();
    }

    let id = match state.projects().create(&claims.sub, payload).await {
        Ok(id) => id,
        Err(e) => return store_error_response(&e).into_response(),
    };

    // Read back the stored document so the response reflects exactly
    // what was persisted, stamps included.
    match state.projects().get(&id).await {
        Ok(Some(project)) => (StatusCode::CREATED, Json(project)).into_response(),
        Ok(None) => not_found("Project").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// GET /dashboard/projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.projects().get(&id).await {
        Ok(Some(project)) => Json(project).into_response(),
        Ok(None) => not_found("Project").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// PATCH /dashboard/projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<PatchProject>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    if let Some(title) = &payload.title {
        if title.trim().is_empty() {
            return bad_request("Title cannot be blank").into_response();
        }
    }

    match state.projects().update(&id, payload).await {
        Ok(Some(project)) => Json(project).into_response(),
        Ok(None) => not_found("Project").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/projects/{id}/feature - Flip the featured flag
pub async fn toggle_project_featured(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.projects().toggle_featured(&id).await {
        Ok(Some(project)) => Json(project).into_response(),
        Ok(None) => not_found("Project").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// DELETE /dashboard/projects/{id}
/// Removes the document, then best-effort removes its uploaded images.
pub async fn delete_project(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    let existing = match state.projects().get(&id).await {
        Ok(Some(project)) => project,
        Ok(None) => return not_found("Project").into_response(),
        Err(e) => return store_error_response(&e).into_response(),
    };

    match state.projects().delete(&id).await {
        Ok(true) => {
            let mut urls = existing.image_urls.clone();
            urls.push(existing.thumbnail_url.clone());
            storage::cleanup_assets(&state.media, urls).await;
            Json(SuccessResponse::ok()).into_response()
        }
        Ok(false) => not_found("Project").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::{get, post};
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::db::memory::MemoryStore;
    use crate::db::models::ProjectCategory;

    fn test_state() -> AppState {
        AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new()))
    }

    fn test_router(state: AppState) -> Router {
        Router::new()
            .route("/projects", get(public_projects))
            .route(
                "/dashboard/projects",
                get(list_projects).post(create_project),
            )
            .route(
                "/dashboard/projects/{id}",
                get(get_project).patch(update_project).delete(delete_project),
            )
            .route(
                "/dashboard/projects/{id}/feature",
                post(toggle_project_featured),
            )
            .with_state(state)
    }

    async fn session_for(state: &AppState) -> String {
        let outcome = state
            .sessions
            .register("owner@example.com", "password123", "Owner")
            .await
            .unwrap();
        outcome.token
    }

    fn sample_project(title: &str, order: i64, featured: bool) -> NewProject {
        NewProject {
            title: title.to_string(),
            summary: "short".to_string(),
            description: "long".to_string(),
            image_urls: vec![],
            thumbnail_url: "/media/projects/thumb.png".to_string(),
            technologies: vec!["rust".to_string()],
            category: ProjectCategory::Web,
            live_url: None,
            source_url: None,
            featured,
            order,
        }
    }

    async fn request_json<T: serde::de::DeserializeOwned>(
        app: Router,
        req: Request<Body>,
    ) -> (StatusCode, T) {
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    fn authed_post(uri: &str, token: &str, body: &impl serde::Serialize) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    #[tokio::test]
    async fn dashboard_requires_a_session() {
        let state = test_state();
        let req = Request::get("/dashboard/projects").body(Body::empty()).unwrap();
        let res = test_router(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rejects_a_blank_title() {
        let state = test_state();
        let token = session_for(&state).await;
        let req = authed_post(
            "/dashboard/projects",
            &token,
            &sample_project("   ", 0, false),
        );
        let res = test_router(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_round_trips_the_stored_project() {
        let state = test_state();
        let token = session_for(&state).await;
        let req = authed_post(
            "/dashboard/projects",
            &token,
            &sample_project("Terminal Portfolio", 1, true),
        );
        let (status, project) =
            request_json::<Project>(test_router(state.clone()), req).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(project.title, "Terminal Portfolio");
        assert!(project.featured);
        assert!(!project.id.is_empty());
    }

    #[tokio::test]
    async fn public_list_is_empty_without_a_configured_owner() {
        let mut config = AppConfig::for_tests();
        config.owner_id = None;
        let state = AppState::new(config, Arc::new(MemoryStore::new()));

        let req = Request::get("/projects").body(Body::empty()).unwrap();
        let (status, body) =
            request_json::<ProjectListResponse>(test_router(state), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.count, 0);
    }

    #[tokio::test]
    async fn public_list_orders_by_order_and_filters_featured() {
        let state = test_state();
        let outcome = state
            .sessions
            .register("owner@example.com", "password123", "Owner")
            .await
            .unwrap();
        let token = outcome.token;
        // The public route serves whoever OWNER_ID names, so point it at
        // the account we just registered.
        let mut config = AppConfig::for_tests();
        config.owner_id = Some(outcome.user.id);
        let state = AppState {
            config: Arc::new(config),
            ..state
        };
        let app = test_router(state.clone());

        for (title, order, featured) in
            [("Second", 2, false), ("First", 1, true), ("Third", 3, false)]
        {
            let req = authed_post(
                "/dashboard/projects",
                &token,
                &sample_project(title, order, featured),
            );
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::CREATED);
        }

        let req = Request::get("/projects").body(Body::empty()).unwrap();
        let (status, body) = request_json::<ProjectListResponse>(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        let titles: Vec<&str> = body.projects.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["First", "Second", "Third"]);

        let req = Request::get("/projects?featured=true").body(Body::empty()).unwrap();
        let (_, featured) = request_json::<ProjectListResponse>(app, req).await;
        assert_eq!(featured.count, 1);
        assert_eq!(featured.projects[0].title, "First");
    }

    #[tokio::test]
    async fn update_patches_only_the_provided_fields() {
        let state = test_state();
        let token = session_for(&state).await;
        let app = test_router(state.clone());

        let req = authed_post(
            "/dashboard/projects",
            &token,
            &sample_project("Original", 1, false),
        );
        let (_, created) = request_json::<Project>(app.clone(), req).await;

        let patch = json!({ "summary": "rewritten" });
        let req = Request::patch(format!("/dashboard/projects/{}", created.id))
            .header("content-type", "application/json")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(patch.to_string()))
            .unwrap();
        let (status, updated) = request_json::<Project>(app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated.title, "Original");
        assert_eq!(updated.summary, "rewritten");
    }

    #[tokio::test]
    async fn feature_toggle_flips_and_missing_id_is_404() {
        let state = test_state();
        let token = session_for(&state).await;
        let app = test_router(state.clone());

        let req = authed_post(
            "/dashboard/projects",
            &token,
            &sample_project("Toggle me", 1, false),
        );
        let (_, created) = request_json::<Project>(app.clone(), req).await;

        let req = Request::post(format!("/dashboard/projects/{}/feature", created.id))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let (status, toggled) = request_json::<Project>(app.clone(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert!(toggled.featured);

        let req = Request::post("/dashboard/projects/nope/feature")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_removes_the_project() {
        let state = test_state();
        let token = session_for(&state).await;
        let app = test_router(state.clone());

        let req = authed_post(
            "/dashboard/projects",
            &token,
            &sample_project("Short lived", 1, false),
        );
        let (_, created) = request_json::<Project>(app.clone(), req).await;

        let req = Request::delete(format!("/dashboard/projects/{}", created.id))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = app.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let req = Request::get(format!("/dashboard/projects/{}", created.id))
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
