//! HTTP route handlers for Keyhole.
//!
//! # Route Structure
//!
//! ```text
//! GET    /                    - Home page (signed in)
//! GET    /health              - Liveness check
//! GET    /health/ready        - Readiness check (user repository)
//! GET    /static/keyhole.css  - Stylesheet
//!
//! # Auth
//! GET    /login               - Login page (signed out)
//! POST   /login               - Login action (rate limited)
//! GET    /register            - Register page (signed out)
//! POST   /register            - Register action (rate limited)
//! POST   /logout              - Logout action (form with `_method=DELETE`)
//! DELETE /logout              - Logout action
//! ```

pub mod auth;
pub mod home;

use axum::{
    Router,
    extract::{Request, State},
    http::{
        StatusCode,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::db::RepositoryError;
use crate::error::AppError;
use crate::middleware::{
    auth_rate_limiter, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

const STYLESHEET: &str = include_str!("../../static/keyhole.css");

/// Create the credential submission routes.
///
/// These are the only routes that verify or hash passwords, so they carry the
/// rate limiter when enabled.
fn credential_routes(rate_limited: bool, trust_proxy_headers: bool) -> Router<AppState> {
    let router = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register));

    if !rate_limited {
        return router;
    }

    match auth_rate_limiter(trust_proxy_headers) {
        Some(limiter) => router.layer(limiter),
        None => {
            tracing::warn!("auth rate limiter configuration rejected, continuing without it");
            router
        }
    }
}

/// Create all routes for Keyhole.
///
/// `trust_proxy_headers` lets the rate limiter key on `X-Forwarded-For` /
/// `X-Real-IP` instead of the peer address.
pub fn routes(rate_limited: bool, trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/login", get(auth::login_page))
        .route("/register", get(auth::register_page))
        .route("/logout", post(auth::logout).delete(auth::logout))
        .merge(credential_routes(rate_limited, trust_proxy_headers))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .route("/static/keyhole.css", get(stylesheet))
}

/// Build the complete application over the given session store.
///
/// Layer order, outermost first: Sentry, tracing, request ID, security
/// headers, session.
pub fn build_app<S>(state: AppState, store: S) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = create_session_layer(store, state.config());
    let rate_limited = state.config().auth_rate_limit;
    let trust_proxy_headers = state.config().trust_proxy_headers;

    routes(rate_limited, trust_proxy_headers)
        .layer(session_layer)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = tracing::field::Empty,
            )
        }))
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// # Errors
///
/// Returns `AppError::Database` (503 Service Unavailable) if the user
/// repository is not reachable.
async fn readiness(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state
        .users()
        .ping()
        .await
        .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
    Ok(StatusCode::OK)
}

/// Serve the stylesheet.
async fn stylesheet() -> impl IntoResponse {
    (
        [
            (CONTENT_TYPE, "text/css; charset=utf-8"),
            (CACHE_CONTROL, "public, max-age=3600"),
        ],
        STYLESHEET,
    )
}
