//! Request Middleware
//!
//! Rate limiting runs ahead of every handler, keyed on client IP and
//! endpoint class. Only login/registration and message traffic are
//! throttled; everything else passes straight through.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use platform::rate_limit::EndpointClass;

use crate::state::AppState;

/// Map a request path to its throttling class, if any.
fn classify(path: &str) -> Option<EndpointClass> {
    match path {
        "/api/register" | "/api/login" => Some(EndpointClass::Auth),
        p if p.starts_with("/api/user/messages") => Some(EndpointClass::Api),
        _ => None,
    }
}

/// Rate-limit middleware. Rejections are 429 with a class-specific body;
/// they never reach the handler and consume no bucket tokens.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(class) = classify(req.uri().path()) else {
        return next.run(req).await;
    };

    let client = addr.ip().to_string();
    if state.limiter.check(&client, class).is_allowed() {
        return next.run(req).await;
    }

    tracing::warn!(
        client = %client,
        class = class.as_str(),
        "Rate limiter blocked request"
    );

    let message = match class {
        EndpointClass::Auth => "Too many login attempts, please try again later",
        EndpointClass::Api => "Too many requests to the API, please try again later",
    };
    (StatusCode::TOO_MANY_REQUESTS, message).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_auth_endpoints() {
        assert_eq!(classify("/api/register"), Some(EndpointClass::Auth));
        assert_eq!(classify("/api/login"), Some(EndpointClass::Auth));
    }

    #[test]
    fn test_classify_message_endpoints() {
        assert_eq!(classify("/api/user/messages"), Some(EndpointClass::Api));
    }

    #[test]
    fn test_other_endpoints_bypass() {
        assert_eq!(classify("/api/logout"), None);
        assert_eq!(classify("/api/user/users"), None);
        assert_eq!(classify("/api/admin/block"), None);
        assert_eq!(classify("/"), None);
    }
}
