/**
 * Health Routes
 * Liveness ping plus detailed and readiness checks against the
 * document store.
 */
use axum::extract::State;
use axum::{http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::AppState;

lazy_static::lazy_static! {
    static ref SERVER_START: Instant = Instant::now();
}

/// Pins the start instant so uptime counts from boot, not first probe.
pub fn init_start_time() {
    lazy_static::initialize(&SERVER_START);
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceCheck {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    pub checks: HealthChecks,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthChecks {
    pub store: ServiceCheck,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub uptime: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

/// GET /health
pub async fn health_ping() -> impl IntoResponse {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
}

/// GET /health/detailed
///
/// Overall status stays "ok" while the process runs even if the store
/// probe fails, so the frontend can tell "backend down" apart from
/// "store down"; the store's own state is in the checks block.
pub async fn health_detailed(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();

    let store_check = match state.store.ping().await {
        Ok(duration) => ServiceCheck {
            status: "healthy".to_string(),
            response_time: Some(duration.as_millis() as u64),
            error: None,
        },
        Err(err) => ServiceCheck {
            status: "unhealthy".to_string(),
            response_time: None,
            error: Some(err.to_string()),
        },
    };

    (
        StatusCode::OK,
        Json(DetailedHealthResponse {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            uptime,
            checks: HealthChecks { store: store_check },
        }),
    )
}

/// GET /health/ready
pub async fn health_ready(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = SERVER_START.elapsed().as_secs();

    let response = match state.store.ping().await {
        Ok(_) => ReadyResponse {
            status: "ready".to_string(),
            timestamp: Utc::now(),
            uptime,
            reason: None,
        },
        Err(err) => ReadyResponse {
            status: "not ready".to_string(),
            timestamp: Utc::now(),
            uptime,
            reason: Some(format!("document store is not reachable: {err}")),
        },
    };

    (StatusCode::OK, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    use crate::config::AppConfig;
    use crate::db::memory::MemoryStore;

    fn test_router() -> Router {
        let state = AppState::new(AppConfig::for_tests(), Arc::new(MemoryStore::new()));
        Router::new()
            .route("/health", get(health_ping))
            .route("/health/detailed", get(health_detailed))
            .route("/health/ready", get(health_ready))
            .with_state(state)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(app: Router, uri: &str) -> (StatusCode, T) {
        let req = Request::get(uri).body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let value: T = serde_json::from_slice(&body).unwrap();
        (status, value)
    }

    #[tokio::test]
    async fn ping_answers_ok() {
        init_start_time();
        let (status, body) = get_json::<SimpleHealthResponse>(test_router(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
    }

    #[tokio::test]
    async fn detailed_reports_a_healthy_memory_store() {
        init_start_time();
        let (status, body) =
            get_json::<DetailedHealthResponse>(test_router(), "/health/detailed").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ok");
        assert_eq!(body.checks.store.status, "healthy");
    }

    #[tokio::test]
    async fn readiness_follows_the_store_probe() {
        init_start_time();
        let (status, body) = get_json::<ReadyResponse>(test_router(), "/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "ready");
        assert!(body.reason.is_none());
    }
}
