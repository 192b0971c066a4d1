/*!
 * Logging
 * tracing initialization plus request instrumentation. Console output
 * is human-readable in development and JSON in production; files under
 * logs/ rotate daily, with errors duplicated into their own file.
 */
use axum::{extract::Request, http::HeaderName, middleware::Next, response::Response};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Installs the global subscriber. The returned guards own the
/// non-blocking writers; drop them only at shutdown or buffered log
/// lines are lost.
pub fn init() -> Vec<WorkerGuard> {
    let environment =
        std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("folio_cms={level},tower_http={level},axum=info"))
    });

    let mut guards = Vec::new();

    let app_appender = tracing_appender::rolling::daily("logs", "folio-cms.log");
    let (app_writer, app_guard) = tracing_appender::non_blocking(app_appender);
    guards.push(app_guard);

    let error_appender = tracing_appender::rolling::daily("logs", "error.log");
    let (error_writer, error_guard) = tracing_appender::non_blocking(error_appender);
    guards.push(error_guard);

    let app_file = fmt::layer()
        .json()
        .with_target(true)
        .with_writer(app_writer);
    let error_file = fmt::layer()
        .json()
        .with_writer(error_writer)
        .with_filter(LevelFilter::ERROR);

    // The two console formats have different types; box them so the
    // file layers stack on a single subscriber type.
    let console = if environment == "production" {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().compact().boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(app_file)
        .with(error_file)
        .init();

    tracing::info!(environment = %environment, "logging initialized");
    guards
}

pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER), MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(HeaderName::from_static(REQUEST_ID_HEADER))
}

/// Request/response line with latency, correlated by request id.
pub async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let started = std::time::Instant::now();
    tracing::debug!(%method, %uri, request_id = %request_id, "request started");

    let response = next.run(request).await;

    let status = response.status();
    let latency_ms = started.elapsed().as_millis() as u64;
    if status.is_server_error() {
        tracing::error!(
            %method,
            %uri,
            status = status.as_u16(),
            latency_ms,
            request_id = %request_id,
            "request failed"
        );
    } else {
        tracing::info!(
            %method,
            %uri,
            status = status.as_u16(),
            latency_ms,
            request_id = %request_id,
            "request completed"
        );
    }
    response
}
