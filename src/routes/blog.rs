/**
 * Blog Routes
 * Public list/detail/RSS for published posts plus dashboard CRUD.
 */
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{is_valid_slug, reading_time_minutes};
use crate::db::models::{BlogCategory, BlogPost, NewBlogPost, PatchBlogPost};
use crate::routes::{
    bad_request, not_found, require_session, sanitize_html, store_error_response, SuccessResponse,
};
use crate::storage;
use crate::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for GET /blog (public list)
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListQuery {
    /// Case-insensitive match against title and excerpt
    pub q: Option<String>,
    pub tag: Option<String>,
    pub category: Option<BlogCategory>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_page() -> i64 {
    1
}

fn default_page_size() -> i64 {
    10
}

/// Response for GET /blog (public list)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogListResponse {
    pub posts: Vec<BlogPostSummary>,
    pub page: i64,
    pub page_size: i64,
    pub total: usize,
}

/// Blog post summary (for list views); carries the computed reading time
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostSummary {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub category: BlogCategory,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub featured: bool,
    pub view_count: i64,
    pub reading_time: u32,
}

impl BlogPostSummary {
    pub(crate) fn of(post: &BlogPost) -> Self {
        Self {
            id: post.id.clone(),
            title: post.title.clone(),
            slug: post.slug.clone(),
            excerpt: post.excerpt.clone(),
            cover_image: post.cover_image.clone(),
            category: post.category,
            tags: post.tags.clone(),
            published_at: post.published_at,
            featured: post.featured,
            view_count: post.view_count,
            reading_time: reading_time_minutes(&post.content),
        }
    }
}

/// Full post plus computed reading time (public detail view)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostView {
    #[serde(flatten)]
    pub post: BlogPost,
    pub reading_time: u32,
}

/// Owner's post list (dashboard)
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerBlogListResponse {
    pub posts: Vec<BlogPost>,
    pub count: usize,
}

// ============================================================================
// Filtering
// ============================================================================

fn matches_query(post: &BlogPost, query: &BlogListQuery) -> bool {
    if let Some(q) = query.q.as_deref() {
        let needle = q.to_lowercase();
        if !needle.is_empty()
            && !post.title.to_lowercase().contains(&needle)
            && !post.excerpt.to_lowercase().contains(&needle)
        {
            return false;
        }
    }
    if let Some(tag) = query.tag.as_deref() {
        if !post.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)) {
            return false;
        }
    }
    if let Some(category) = query.category {
        if post.category != category {
            return false;
        }
    }
    true
}

// ============================================================================
// Public Handlers
// ============================================================================

/// GET /blog - Published posts, newest publish first
pub async fn public_posts(
    State(state): State<AppState>,
    Query(query): Query<BlogListQuery>,
) -> impl IntoResponse {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);

    let Some(owner_id) = state.config.owner_id.clone() else {
        return Json(BlogListResponse {
            posts: vec![],
            page,
            page_size,
            total: 0,
        })
        .into_response();
    };

    let posts = match state.blog().list_published(&owner_id).await {
        Ok(posts) => posts,
        Err(e) => return store_error_response(&e).into_response(),
    };

    let filtered: Vec<&BlogPost> = posts.iter().filter(|p| matches_query(p, &query)).collect();
    let total = filtered.len();

    let start = ((page - 1) * page_size) as usize;
    let summaries: Vec<BlogPostSummary> = filtered
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .map(BlogPostSummary::of)
        .collect();

    Json(BlogListResponse {
        posts: summaries,
        page,
        page_size,
        total,
    })
    .into_response()
}

/// GET /blog/{slug} - Published post by slug
/// Counts the view best-effort; a failed count never breaks the read.
pub async fn public_post_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> impl IntoResponse {
    if !is_valid_slug(&slug) {
        return bad_request("Slug must contain only lowercase letters, numbers, and hyphens")
            .into_response();
    }

    let Some(owner_id) = state.config.owner_id.clone() else {
        return not_found("Post").into_response();
    };

    let post = match state.blog().get_by_slug_published(&owner_id, &slug).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found("Post").into_response(),
        Err(e) => return store_error_response(&e).into_response(),
    };

    if let Err(e) = state.blog().record_view(&post.id).await {
        tracing::warn!("View count update failed for post {}: {}", post.id, e);
    }

    let reading_time = reading_time_minutes(&post.content);
    Json(BlogPostView { post, reading_time }).into_response()
}

// ============================================================================
// RSS Feed
// ============================================================================

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn rfc822(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S +0000").to_string()
}

/// GET /blog/rss - RSS 2.0 feed of the 50 most recent published posts
pub async fn rss_feed(State(state): State<AppState>) -> Response {
    let base_url = std::env::var("SITE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
    let site_title = std::env::var("SITE_TITLE").unwrap_or_else(|_| "Portfolio Blog".to_string());
    let site_description = std::env::var("SITE_DESCRIPTION")
        .unwrap_or_else(|_| "Latest articles and insights".to_string());

    let posts = match state.config.owner_id.clone() {
        Some(owner_id) => match state.blog().list_published(&owner_id).await {
            Ok(posts) => posts,
            Err(e) => {
                tracing::error!("RSS feed could not load posts: {}", e);
                vec![]
            }
        },
        None => vec![],
    };

    let mut items = String::new();
    for post in posts.iter().take(50) {
        let post_url = format!("{}/blog/{}", base_url, post.slug);
        let stamp = post.published_at.unwrap_or(post.created_at);
        items.push_str(&format!(
            "    <item>\n\
                   <title>{}</title>\n\
                   <link>{}</link>\n\
                   <description>{}</description>\n\
                   <pubDate>{}</pubDate>\n\
                   <guid isPermaLink=\"true\">{}</guid>\n\
                 </item>\n",
            escape_xml(&post.title),
            escape_xml(&post_url),
            escape_xml(&post.excerpt),
            rfc822(&stamp),
            escape_xml(&post_url),
        ));
    }

    let feed_url = format!("{}/blog/rss", base_url);
    let blog_url = format!("{}/blog", base_url);

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>{}</title>
    <link>{}</link>
    <description>{}</description>
    <language>en-us</language>
    <atom:link href="{}" rel="self" type="application/rss+xml"/>
    <lastBuildDate>{}</lastBuildDate>
{}  </channel>
</rss>"#,
        escape_xml(&site_title),
        escape_xml(&blog_url),
        escape_xml(&site_description),
        escape_xml(&feed_url),
        posts
            .first()
            .map(|p| rfc822(&p.published_at.unwrap_or(p.created_at)))
            .unwrap_or_default(),
        items,
    );

    let mut response = Response::new(Body::from(xml));
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/rss+xml; charset=utf-8"),
    );
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("public, max-age=3600, stale-while-revalidate=600"),
    );
    response
}

// ============================================================================
// Dashboard Handlers
// ============================================================================

/// GET /dashboard/blog - All posts, featured first then newest
pub async fn list_posts(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    match state.blog().list(&claims.sub).await {
        Ok(posts) => {
            let count = posts.len();
            Json(OwnerBlogListResponse { posts, count }).into_response()
        }
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/blog - Create a post
/// Content HTML is sanitized before it is stored; an omitted slug is
/// derived from the title.
pub async fn create_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(mut payload): Json<NewBlogPost>,
) -> impl IntoResponse {
    let claims = match require_session(&state, &jar, &headers) {
        Ok(claims) => claims,
        Err(rejection) => return rejection.into_response(),
    };

    if payload.title.trim().is_empty() {
        return bad_request("Title is required").into_response();
    }
    if let Some(slug) = payload.slug.as_deref() {
        let slug = slug.trim();
        if !slug.is_empty() && !is_valid_slug(slug) {
            return bad_request("Slug must contain only lowercase letters, numbers, and hyphens")
                .into_response();
        }
    }

    payload.content = sanitize_html(&payload.content);

    let id = match state.blog().create(&claims.sub, payload).await {
        Ok(id) => id,
        Err(e) => return store_error_response(&e).into_response(),
    };

    match state.blog().get(&id).await {
        Ok(Some(post)) => (StatusCode::CREATED, Json(post)).into_response(),
        Ok(None) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// GET /dashboard/blog/{id}
pub async fn get_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.blog().get(&id).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// PATCH /dashboard/blog/{id}
/// The publish stamp follows the publish flag: stamped on the first
/// publish, cleared on unpublish, untouched by content-only edits.
pub async fn update_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(mut payload): Json<PatchBlogPost>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    if let Some(slug) = payload.slug.as_deref() {
        if !is_valid_slug(slug) {
            return bad_request("Slug must contain only lowercase letters, numbers, and hyphens")
                .into_response();
        }
    }
    if let Some(content) = payload.content.take() {
        payload.content = Some(sanitize_html(&content));
    }

    match state.blog().update(&id, payload).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/blog/{id}/publish - Flip the published flag
pub async fn toggle_post_published(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.blog().toggle_published(&id).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// POST /dashboard/blog/{id}/feature - Flip the featured flag
pub async fn toggle_post_featured(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    match state.blog().toggle_featured(&id).await {
        Ok(Some(post)) => Json(post).into_response(),
        Ok(None) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}

/// DELETE /dashboard/blog/{id}
/// Removes the post, then best-effort removes its cover image.
pub async fn delete_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> impl IntoResponse {
    if let Err(rejection) = require_session(&state, &jar, &headers) {
        return rejection.into_response();
    }

    let existing = match state.blog().get(&id).await {
        Ok(Some(post)) => post,
        Ok(None) => return not_found("Post").into_response(),
        Err(e) => return store_error_response(&e).into_response(),
    };

    match state.blog().delete(&id).await {
        Ok(true) => {
            storage::cleanup_assets(&state.media, existing.cover_image.clone()).await;
            Json(SuccessResponse::ok()).into_response()
        }
        Ok(false) => not_found("Post").into_response(),
        Err(e) => store_error_response(&e).into_response(),
    }
}
