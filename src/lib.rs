//! Portfolio CMS backend: application state, router assembly and the
//! server entry point.
//!
//! Everything stateful hangs off [`AppState`]: the resolved
//! configuration, the document store behind its trait, the session
//! bridge and the media store. Handlers receive a clone; clones are
//! handles, not copies.

pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod gate;
pub mod logging;
pub mod routes;
pub mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, limit::RequestBodyLimitLayer,
    services::ServeDir, trace::TraceLayer,
};

use auth::SessionBridge;
use config::AppConfig;
use db::blog::BlogPosts;
use db::experiences::Experiences;
use db::memory::MemoryStore;
use db::postgres::{DbConfig, PgStore};
use db::profiles::Profiles;
use db::projects::Projects;
use db::skills::Skills;
use db::store::DocumentStore;
use storage::MediaStore;

/// Public path the media directory is served under.
const MEDIA_BASE: &str = "/media";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<SessionBridge>,
    pub media: MediaStore,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Self {
        let sessions = Arc::new(SessionBridge::new(
            store.clone(),
            config.session_secret.clone(),
            config.session_ttl_hours,
        ));
        let media = MediaStore::new(config.media_root.clone(), MEDIA_BASE);
        Self {
            config: Arc::new(config),
            store,
            sessions,
            media,
        }
    }

    // Accessors are constructed per use; they hold nothing but the
    // store handle.

    pub fn projects(&self) -> Projects {
        Projects::new(self.store.clone())
    }

    pub fn skills(&self) -> Skills {
        Skills::new(self.store.clone())
    }

    pub fn experiences(&self) -> Experiences {
        Experiences::new(self.store.clone())
    }

    pub fn blog(&self) -> BlogPosts {
        BlogPosts::new(self.store.clone())
    }

    pub fn profiles(&self) -> Profiles {
        Profiles::new(self.store.clone())
    }
}

/// Configure CORS from environment variables.
/// Uses ALLOWED_ORIGINS (comma-separated) or FRONTEND_ORIGIN.
/// Falls back to the local frontend dev origins.
pub fn configure_cors() -> CorsLayer {
    let allowed_origins = std::env::var("ALLOWED_ORIGINS")
        .ok()
        .and_then(|s| {
            let origins: Vec<HeaderValue> = s
                .split(',')
                .filter_map(|origin| origin.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                None
            } else {
                Some(origins)
            }
        })
        .or_else(|| {
            std::env::var("FRONTEND_ORIGIN")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(|origin| vec![origin])
        })
        .unwrap_or_else(|| {
            vec![
                "http://localhost:3000".parse().unwrap(),
                "http://127.0.0.1:3000".parse().unwrap(),
            ]
        });

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
        ])
        .allow_credentials(true)
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let cors = configure_cors();
    tracing::info!("CORS configured");

    // Uploads carry images and get their own, larger body cap.
    let uploads = Router::new()
        .route(
            "/dashboard/uploads",
            post(routes::uploads::upload_media).get(routes::uploads::list_media),
        )
        .route(
            "/dashboard/uploads/{folder}/{filename}",
            delete(routes::uploads::delete_media),
        )
        .layer(RequestBodyLimitLayer::new(8 * 1024 * 1024));

    let content = Router::new()
        .route("/", get(routes::home::home))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/session", get(routes::auth::session))
        .route("/projects", get(routes::projects::public_projects))
        .route("/skills", get(routes::skills::public_skills))
        .route("/experience", get(routes::experiences::public_experiences))
        .route("/blog", get(routes::blog::public_posts))
        .route("/blog/rss", get(routes::blog::rss_feed))
        .route("/blog/{slug}", get(routes::blog::public_post_by_slug))
        .route("/api/projects", get(routes::api::api_projects))
        .route("/api/skills", get(routes::api::api_skills))
        .route("/api/experiences", get(routes::api::api_experiences))
        .route("/api/profile", get(routes::api::api_profile))
        .route("/dashboard", get(routes::dashboard::overview))
        .route(
            "/dashboard/projects",
            get(routes::projects::list_projects).post(routes::projects::create_project),
        )
        .route(
            "/dashboard/projects/{id}",
            get(routes::projects::get_project)
                .patch(routes::projects::update_project)
                .delete(routes::projects::delete_project),
        )
        .route(
            "/dashboard/projects/{id}/feature",
            post(routes::projects::toggle_project_featured),
        )
        .route(
            "/dashboard/skills",
            get(routes::skills::list_skills).post(routes::skills::create_skill),
        )
        .route(
            "/dashboard/skills/{id}",
            patch(routes::skills::update_skill).delete(routes::skills::delete_skill),
        )
        .route(
            "/dashboard/experience",
            get(routes::experiences::list_experiences)
                .post(routes::experiences::create_experience),
        )
        .route(
            "/dashboard/experience/{id}",
            patch(routes::experiences::update_experience)
                .delete(routes::experiences::delete_experience),
        )
        .route(
            "/dashboard/blog",
            get(routes::blog::list_posts).post(routes::blog::create_post),
        )
        .route(
            "/dashboard/blog/{id}",
            get(routes::blog::get_post)
                .patch(routes::blog::update_post)
                .delete(routes::blog::delete_post),
        )
        .route(
            "/dashboard/blog/{id}/publish",
            post(routes::blog::toggle_post_published),
        )
        .route(
            "/dashboard/blog/{id}/feature",
            post(routes::blog::toggle_post_featured),
        )
        .route(
            "/settings/profile",
            get(routes::profile::get_profile).patch(routes::profile::update_profile),
        )
        .route("/health", get(routes::health::health_ping))
        .route("/health/detailed", get(routes::health::health_detailed))
        .route("/health/ready", get(routes::health::health_ready))
        .layer(RequestBodyLimitLayer::new(2 * 1024 * 1024));

    Router::new()
        .merge(content)
        .merge(uploads)
        .nest_service(MEDIA_BASE, ServeDir::new(state.media.root()))
        .layer(logging::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::log_request))
        .layer(logging::set_request_id_layer())
        .layer(TraceLayer::new_for_http())
        // Compress responses with gzip/br/zstd automatically
        .layer(CompressionLayer::new())
        // The gate sits inside CORS so preflights are answered, never
        // redirected.
        .layer(middleware::from_fn(gate::enforce))
        .layer(cors)
        .with_state(state)
}

/// Run the server (used by main).
pub async fn run() {
    dotenvy::dotenv().ok();

    // Guards MUST be held for the programme's lifetime; dropping them early
    // shuts down background log-writer threads and loses buffered log lines.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = AppConfig::from_env();
    config.enforce_startup_safety();

    let store: Arc<dyn DocumentStore> = match config.database_url.clone() {
        Some(url) => match PgStore::connect(DbConfig::from_env(url)).await {
            Ok(store) => Arc::new(store),
            Err(err) => {
                tracing::warn!(
                    "Failed to initialize the database store: {}. Continuing on the \
                     in-memory store; content will not survive a restart.",
                    err
                );
                Arc::new(MemoryStore::new())
            }
        },
        None => {
            tracing::info!("DATABASE_URL not set. Running on the in-memory store.");
            Arc::new(MemoryStore::new())
        }
    };

    let state = AppState::new(config, store);

    let addr: SocketAddr = format!("{}:{}", state.config.host, state.config.port)
        .parse()
        .expect("Invalid HOST/PORT configuration");
    tracing::info!("Starting server on {}", addr);

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    fn test_app() -> (Router, AppState) {
        let state = AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new()));
        (create_app(state.clone()), state)
    }

    #[tokio::test]
    async fn the_home_page_serves_through_the_full_stack() {
        let (app, _) = test_app();
        let res = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn health_answers_under_the_middleware() {
        let (app, _) = test_app();
        let res = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn the_gate_is_wired_in_front_of_the_dashboard() {
        let (app, _) = test_app();
        let res = app
            .oneshot(Request::get("/dashboard").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(res.headers()[header::LOCATION], "/login");
    }

    #[tokio::test]
    async fn stored_media_is_served_back_under_its_public_url() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState {
            media: MediaStore::new(dir.path(), MEDIA_BASE),
            ..AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new()))
        };
        let app = create_app(state.clone());

        let png: Vec<u8> = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0]
            .to_vec();
        let stored = state.media.put("projects", "shot.png", &png).await.unwrap();

        let res = app
            .oneshot(Request::get(stored.url.as_str()).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn unknown_paths_fall_through_to_404() {
        let (app, _) = test_app();
        let res = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
