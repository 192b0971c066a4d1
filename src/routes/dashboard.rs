/**
 * Dashboard Overview Route
 * One aggregate fetch for the editor's landing view. Sources load in
 * parallel and fail independently; a dead collection shows up as an
 * error marker on its own card, not a broken page.
 */
use axum::{extract::State, http::HeaderMap, response::IntoResponse, Json};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;

use crate::db::error::StoreError;
use crate::db::models::{BlogPost, Experience, Profile, Project, Skill};
use crate::routes::home::Section;
use crate::routes::require_session;
use crate::AppState;

/// A list-backed card: the rows plus how many there are
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountedSection<T> {
    pub data: Vec<T>,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

fn counted<T>(result: Result<Vec<T>, StoreError>) -> CountedSection<T> {
    match result {
        Ok(data) => CountedSection {
            count: data.len(),
            data,
            error: None,
        },
        Err(e) => CountedSection {
            data: vec![],
            count: 0,
            error: Some(e.kind().to_string()),
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub profile: Section<Option<Profile>>,
    pub projects: CountedSection<Project>,
    pub skills: CountedSection<Skill>,
    pub experiences: CountedSection<Experience>,
    pub posts: CountedSection<BlogPost>,
}

/// GET /dashboard
pub async fn overview(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    let profiles = state.profiles();
    let projects_repo = state.projects();
    let skills_repo = state.skills();
    let experiences_repo = state.experiences();
    let blog = state.blog();
    let (profile, projects, skills, experiences, posts) = tokio::join!(
        profiles.get(&claims.sub),
        projects_repo.list(&claims.sub),
        skills_repo.list(&claims.sub),
        experiences_repo.list(&claims.sub),
        blog.list(&claims.sub),
    );

    let profile = match profile {
        Ok(data) => Section { data, error: None },
        Err(e) => Section {
            data: None,
            error: Some(e.kind().to_string()),
        },
    };

    Json(DashboardResponse {
        profile,
        projects: counted(projects),
        skills: counted(skills),
        experiences: counted(experiences),
        posts: counted(posts),
    })
    .into_response()
}
