/**
 * Access Gate
 * Classifies every request path into a zone and applies the redirect
 * policy before any handler runs. The only input is the request path
 * and the presence of a session cookie; token validity is checked
 * later, by the handlers that actually need the identity.
 */
use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

/// Session token cookie. Set with the JWT at sign-in.
pub const SESSION_COOKIE: &str = "authToken";
/// Companion cookie carrying the signed-in identity key.
pub const USER_COOKIE: &str = "userId";

/// Paths under these prefixes are public content pages.
const PUBLIC_PREFIXES: &[&str] = &["/blog", "/projects", "/skills", "/experience"];
/// Sign-in surfaces; pointless once a session exists.
const AUTH_PAGES: &[&str] = &["/login", "/register"];
/// Owner-only surfaces.
const PROTECTED_PREFIXES: &[&str] = &["/dashboard", "/settings"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// Always reachable.
    Public,
    /// Reachable only without a session; redirects home to the dashboard.
    AuthPage,
    /// Reachable only with a session; redirects out to the login page.
    Protected,
    /// No gate policy. Handlers decide.
    Open,
}

/// Prefix match on whole path segments: `/blog` covers `/blog` and
/// `/blog/why-rust` but not `/blogging`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

pub fn classify(path: &str) -> Zone {
    if path == "/" {
        return Zone::Public;
    }
    if AUTH_PAGES.iter().any(|p| matches_prefix(path, p)) {
        return Zone::AuthPage;
    }
    if PROTECTED_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
        return Zone::Protected;
    }
    if PUBLIC_PREFIXES.iter().any(|p| matches_prefix(path, p)) {
        return Zone::Public;
    }
    Zone::Open
}

/// Presence check only. A cookie with an empty value counts as absent,
/// so a cleared-but-lingering cookie behaves like logged out.
fn has_session_cookie(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .any(|(name, value)| {
            let name = name.trim();
            (name == SESSION_COOKIE || name == USER_COOKIE) && !value.trim().is_empty()
        })
}

pub async fn enforce(request: Request, next: Next) -> Response {
    let zone = classify(request.uri().path());
    let signed_in = has_session_cookie(request.headers());

    match zone {
        Zone::AuthPage if signed_in => {
            tracing::debug!(path = request.uri().path(), "auth page while signed in, redirecting to dashboard");
            Redirect::temporary("/dashboard").into_response()
        }
        Zone::Protected if !signed_in => {
            tracing::debug!(path = request.uri().path(), "protected page without session, redirecting to login");
            Redirect::temporary("/login").into_response()
        }
        _ => next.run(request).await,
    }
}

// ===== Tests =====

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    #[test]
    fn classification_covers_the_route_table() {
        assert_eq!(classify("/"), Zone::Public);
        assert_eq!(classify("/blog"), Zone::Public);
        assert_eq!(classify("/blog/why-rust"), Zone::Public);
        assert_eq!(classify("/projects"), Zone::Public);
        assert_eq!(classify("/skills"), Zone::Public);
        assert_eq!(classify("/experience"), Zone::Public);

        assert_eq!(classify("/login"), Zone::AuthPage);
        assert_eq!(classify("/register"), Zone::AuthPage);

        assert_eq!(classify("/dashboard"), Zone::Protected);
        assert_eq!(classify("/dashboard/blog"), Zone::Protected);
        assert_eq!(classify("/settings"), Zone::Protected);
        assert_eq!(classify("/settings/profile"), Zone::Protected);

        assert_eq!(classify("/about"), Zone::Open);
        assert_eq!(classify("/health"), Zone::Open);
    }

    #[test]
    fn prefixes_match_whole_segments_only() {
        assert_eq!(classify("/blogging"), Zone::Open);
        assert_eq!(classify("/dashboardish"), Zone::Open);
        assert_eq!(classify("/loginish"), Zone::Open);
    }

    fn gated() -> Router {
        async fn ok() -> &'static str {
            "ok"
        }
        Router::new()
            .route("/", get(ok))
            .route("/login", get(ok))
            .route("/blog", get(ok))
            .route("/blog/{slug}", get(ok))
            .route("/dashboard", get(ok))
            .route("/about", get(ok))
            .layer(axum::middleware::from_fn(enforce))
    }

    async fn send(path: &str, cookie: Option<&str>) -> axum::response::Response {
        let mut request = HttpRequest::builder().uri(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        gated()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    fn location(response: &axum::response::Response) -> &str {
        response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }

    #[tokio::test]
    async fn protected_without_a_session_redirects_to_login() {
        let response = send("/dashboard", None).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn protected_with_a_session_cookie_passes_through() {
        let response = send("/dashboard", Some("authToken=abc123")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn the_user_cookie_alone_also_counts() {
        let response = send("/dashboard", Some("theme=dark; userId=uid-1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn auth_pages_bounce_signed_in_visitors_to_the_dashboard() {
        let response = send("/login", Some("userId=uid-1")).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/dashboard");

        let anonymous = send("/login", None).await;
        assert_eq!(anonymous.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn public_pages_ignore_session_state() {
        for cookie in [None, Some("authToken=abc123")] {
            assert_eq!(send("/", cookie).await.status(), StatusCode::OK);
            assert_eq!(send("/blog", cookie).await.status(), StatusCode::OK);
            assert_eq!(send("/blog/why-rust", cookie).await.status(), StatusCode::OK);
        }
    }

    #[tokio::test]
    async fn open_paths_are_left_alone() {
        assert_eq!(send("/about", None).await.status(), StatusCode::OK);
        assert_eq!(send("/about", Some("userId=uid-1")).await.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn an_empty_cookie_value_reads_as_signed_out() {
        let response = send("/dashboard", Some("authToken=")).await;
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(location(&response), "/login");

        // Gate checks presence, not validity. An expired or garbage
        // token passes here and fails at the handler.
        let garbage = send("/dashboard", Some("authToken=expired-garbage")).await;
        assert_eq!(garbage.status(), StatusCode::OK);
    }
}
