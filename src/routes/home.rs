/**
 * Home Route
 * The public landing composition: profile, featured projects, skills,
 * work history, and recent posts fetched in parallel. Each source fails
 * on its own; the page always renders.
 */
use axum::{extract::State, response::IntoResponse, Json};
use serde::Serialize;

use crate::db::error::StoreError;
use crate::db::models::Profile;
use crate::routes::blog::BlogPostSummary;
use crate::routes::experiences::ExperienceView;
use crate::routes::skills::{group_by_category, SkillGroup};
use crate::AppState;

/// How many recent posts the landing page shows
const RECENT_POSTS: usize = 3;

/// One independently-fetched slice of the page. `error` carries the
/// failure class when the slice could not be loaded; `data` is then
/// the empty value.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Section<T> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn section<T: Default>(result: Result<T, StoreError>) -> Section<T> {
    match result {
        Ok(data) => Section { data, error: None },
        Err(e) => Section {
            data: T::default(),
            error: Some(e.kind().to_string()),
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeResponse {
    pub profile: Section<Option<Profile>>,
    pub featured_projects: Section<Vec<crate::db::models::Project>>,
    pub skills: Section<Vec<SkillGroup>>,
    pub experiences: Section<Vec<ExperienceView>>,
    pub recent_posts: Section<Vec<BlogPostSummary>>,
}

/// GET / - Landing page composition
pub async fn home(State(state): State<AppState>) -> impl IntoResponse {
    let Some(owner_id) = state.config.owner_id.clone() else {
        // Nothing to show until OWNER_ID points at a registered account
        return Json(HomeResponse {
            profile: section(Ok(None)),
            featured_projects: section(Ok(vec![])),
            skills: section(Ok(vec![])),
            experiences: section(Ok(vec![])),
            recent_posts: section(Ok(vec![])),
        });
    };

    let profiles = state.profiles();
    let projects_repo = state.projects();
    let skills_repo = state.skills();
    let experiences_repo = state.experiences();
    let blog = state.blog();
    let (profile, projects, skills, experiences, posts) = tokio::join!(
        profiles.get(&owner_id),
        projects_repo.list_featured(&owner_id),
        skills_repo.list(&owner_id),
        experiences_repo.list(&owner_id),
        blog.list_published(&owner_id),
    );

    Json(HomeResponse {
        profile: section(profile),
        featured_projects: section(projects),
        skills: section(skills.map(group_by_category)),
        experiences: section(experiences.map(|list| {
            list.into_iter()
                .map(|experience| {
                    let duration = crate::content::format_duration(
                        experience.start_date,
                        experience.end_date,
                        experience.current,
                    );
                    ExperienceView {
                        experience,
                        duration,
                    }
                })
                .collect()
        })),
        recent_posts: section(posts.map(|list| {
            list.iter().take(RECENT_POSTS).map(BlogPostSummary::of).collect()
        })),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::db::collections;
    use crate::db::memory::MemoryStore;
    use crate::db::models::{NewProject, NewSkill, ProjectCategory, SkillCategory};
    use crate::db::store::DocumentStore;

    fn state_with_store(store: Arc<MemoryStore>) -> AppState {
        AppState::new(AppConfig::for_tests(), store)
    }

    fn test_router(state: AppState) -> Router {
        Router::new().route("/", get(home)).with_state(state)
    }

    async fn fetch_home(app: Router) -> Value {
        let req = Request::get("/").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unconfigured_owner_renders_an_empty_page() {
        let mut config = AppConfig::for_tests();
        config.owner_id = None;
        let state = AppState::new(config, Arc::new(MemoryStore::new()));

        let body = fetch_home(test_router(state)).await;
        assert!(body["profile"]["data"].is_null());
        assert_eq!(body["featuredProjects"]["data"], Value::Array(vec![]));
        assert!(body["profile"].get("error").is_none());
    }

    #[tokio::test]
    async fn sections_compose_the_owner_content() {
        let store = Arc::new(MemoryStore::new());
        let state = state_with_store(store);
        // Register for a real identity key, then point the public owner
        // config at it so the composition picks the content up.
        let outcome = state
            .sessions
            .register("owner@example.com", "password123", "Owner")
            .await
            .unwrap();
        let owner = outcome.user.id.clone();
        let mut config = AppConfig::for_tests();
        config.owner_id = Some(owner.clone());
        let state = AppState {
            config: Arc::new(config),
            ..state
        };

        state
            .projects()
            .create(
                &owner,
                NewProject {
                    title: "Showcase".to_string(),
                    summary: "s".to_string(),
                    description: "d".to_string(),
                    image_urls: vec![],
                    thumbnail_url: "t".to_string(),
                    technologies: vec![],
                    category: ProjectCategory::Web,
                    live_url: None,
                    source_url: None,
                    featured: true,
                    order: 0,
                },
            )
            .await
            .unwrap();
        state
            .skills()
            .create(
                &owner,
                NewSkill {
                    name: "Rust".to_string(),
                    category: SkillCategory::Backend,
                    level: 5,
                    order: 0,
                },
            )
            .await
            .unwrap();

        let body = fetch_home(test_router(state)).await;
        assert_eq!(body["profile"]["data"]["displayName"], "Owner");
        assert_eq!(body["featuredProjects"]["data"][0]["title"], "Showcase");
        assert_eq!(body["skills"]["data"][0]["label"], "backend");
        assert_eq!(body["recentPosts"]["data"], Value::Array(vec![]));
    }

    #[tokio::test]
    async fn one_failing_source_marks_only_its_section() {
        let store = Arc::new(MemoryStore::new());
        // A project document that no longer parses poisons the projects
        // slice; every other slice must still render.
        let owner = AppConfig::for_tests().owner_id.unwrap();
        store
            .insert(
                collections::PROJECTS,
                serde_json::json!({ "ownerId": owner, "featured": true, "title": 42 })
                    .as_object()
                    .cloned()
                    .unwrap(),
            )
            .await
            .unwrap();
        let state = state_with_store(store);

        let body = fetch_home(test_router(state)).await;
        assert_eq!(body["featuredProjects"]["error"], "malformed");
        assert_eq!(body["featuredProjects"]["data"], Value::Array(vec![]));
        assert!(body["skills"].get("error").is_none());
        assert!(body["experiences"].get("error").is_none());
    }
}
