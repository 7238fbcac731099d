//! End-to-end authentication flow through the router.
//!
//! Runs the full middleware stack over the in-memory user repository and
//! `MemoryStore`, carrying the session cookie between requests by hand.

#![allow(clippy::unwrap_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{
        Request, StatusCode,
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
    },
    response::Response,
};
use http_body_util::BodyExt;
use secrecy::SecretString;
use tower::ServiceExt;
use tower_sessions::MemoryStore;
use url::Url;

use keyhole_web::config::{KeyholeConfig, SentryConfig};
use keyhole_core::{Email, UserId};
use keyhole_web::db::{MemoryUserRepository, RepositoryError, UserRepository};
use keyhole_web::middleware::SESSION_COOKIE_NAME;
use keyhole_web::models::{NewUser, UserRecord};
use keyhole_web::routes::build_app;
use keyhole_web::services::auth::HashParams;
use keyhole_web::state::AppState;

fn test_config() -> KeyholeConfig {
    KeyholeConfig {
        database_url: None,
        host: "127.0.0.1".parse().unwrap(),
        port: 3001,
        base_url: Url::parse("http://localhost:3001").unwrap(),
        session_secret: SecretString::from("Zq8#vL2!pT6@mW4$rY9%kB3^nH7&cX1*"),
        session_ttl: Duration::from_secs(60 * 60),
        lookup_timeout: Duration::from_secs(2),
        hash_params: HashParams::minimal(),
        auth_rate_limit: false,
        trust_proxy_headers: false,
        sentry: SentryConfig::default(),
    }
}

fn app_with(users: Arc<dyn UserRepository>, config: KeyholeConfig) -> Router {
    let state = AppState::new(config, users).unwrap();
    build_app(state, MemoryStore::default())
}

fn app() -> Router {
    app_with(Arc::new(MemoryUserRepository::new()), test_config())
}

fn rate_limited_app(trust_proxy_headers: bool) -> Router {
    let config = KeyholeConfig {
        auth_rate_limit: true,
        trust_proxy_headers,
        ..test_config()
    };
    app_with(Arc::new(MemoryUserRepository::new()), config)
}

/// Login POST from `peer`, claiming to be forwarded for `forwarded_for`.
fn login_attempt(peer: &str, forwarded_for: &str) -> Request<Body> {
    let mut request = Request::post("/login")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", forwarded_for)
        .body(Body::from("email=b%40x.com&password=x"))
        .unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

/// Repository whose backing database is down.
struct UnreachableRepository;

#[async_trait]
impl UserRepository for UnreachableRepository {
    async fn find_by_email(&self, _: &Email) -> Result<Option<UserRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn find_by_id(&self, _: UserId) -> Result<Option<UserRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn create(&self, _: NewUser) -> Result<UserRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }

    async fn ping(&self) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("connection refused".to_string()))
    }
}

fn get(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_form(path: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::post(path).header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body.to_owned())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn location(response: &Response) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

/// `name=value` pair of the session cookie set by this response.
fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find(|value| value.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .and_then(|value| value.split(';').next())
        .map(str::to_owned)
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_ann(app: &Router) {
    let response = send(
        app,
        post_form("/register", "name=Ann&email=a%40x.com&password=secret1", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

async fn login_ann(app: &Router) -> String {
    let response = send(
        app,
        post_form("/login", "email=a%40x.com&password=secret1", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");
    session_cookie(&response).unwrap()
}

#[tokio::test]
async fn test_full_session_lifecycle() {
    let app = app();

    // Anonymous visitors are sent to the login page
    let response = send(&app, get("/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    register_ann(&app).await;
    let cookie = login_ann(&app).await;

    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Hi Ann"));

    // Signed-in visitors cannot reach the anonymous pages
    for path in ["/login", "/register"] {
        let response = send(&app, get(path, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
        assert_eq!(location(&response), "/");
    }

    let response = send(&app, post_form("/logout", "_method=DELETE", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    // The old cookie no longer authenticates
    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_delete_logout() {
    let app = app();
    register_ann(&app).await;
    let cookie = login_ann(&app).await;

    let request = Request::delete("/logout")
        .header(COOKIE, &cookie)
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");

    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_logout_requires_session() {
    let app = app();
    let response = send(&app, post_form("/logout", "_method=DELETE", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_login_failures_render_distinct_messages() {
    let app = app();
    register_ann(&app).await;

    let response = send(
        &app,
        post_form("/login", "email=a%40x.com&password=wrong", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(session_cookie(&response).is_none());
    let body = body_text(response).await;
    assert!(body.contains("Incorrect password"));
    assert!(body.contains("a@x.com"));

    let response = send(&app, post_form("/login", "email=b%40x.com&password=x", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Email not registered"));
}

#[tokio::test]
async fn test_login_page_greets_guest() {
    let response = send(&app(), get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Hi Guest"));
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let app = app();
    register_ann(&app).await;

    let response = send(
        &app,
        post_form("/register", "name=Other&email=a%40x.com&password=secret2", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Email already registered"));

    // The first account's password still works
    login_ann(&app).await;
}

#[tokio::test]
async fn test_short_password_rejected() {
    let response = send(
        &app(),
        post_form("/register", "name=Ann&email=a%40x.com&password=abc", None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("at least 6 characters"));
}

#[tokio::test]
async fn test_deleted_user_session_is_anonymous() {
    let users = MemoryUserRepository::new();
    let app = app_with(Arc::new(users.clone()), test_config());
    register_ann(&app).await;
    let cookie = login_ann(&app).await;

    let user = users
        .find_by_email(&Email::parse("a@x.com").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(users.remove(user.id).await);

    let response = send(&app, get("/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_session_cookie_attributes() {
    let app = app();
    register_ann(&app).await;

    let response = send(
        &app,
        post_form("/login", "email=a%40x.com&password=secret1", None),
    )
    .await;
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .unwrap()
        .to_str()
        .unwrap()
        .to_owned();

    assert!(set_cookie.starts_with(&format!("{SESSION_COOKIE_NAME}=")));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    assert!(set_cookie.contains("Path=/"));
    assert!(!set_cookie.contains("Secure"));
}

#[tokio::test]
async fn test_tampered_cookie_is_anonymous() {
    let app = app();
    register_ann(&app).await;
    let cookie = login_ann(&app).await;

    let tampered = format!("{cookie}x");
    let response = send(&app, get("/", Some(&tampered))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
}

#[tokio::test]
async fn test_health_endpoints() {
    let app = app();

    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    let response = send(&app, get("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_readiness_reports_unreachable_repository() {
    let app = app_with(Arc::new(UnreachableRepository), test_config());

    let response = send(&app, get("/health/ready", None)).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "Service temporarily unavailable");

    // Liveness does not depend on the repository
    let response = send(&app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_responses_carry_security_headers() {
    let response = send(&app(), get("/login", None)).await;
    let headers = response.headers();

    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.get("content-security-policy").is_some());
    assert!(headers.get("x-request-id").is_some());
}

#[tokio::test]
async fn test_stylesheet_served() {
    let response = send(&app(), get("/static/keyhole.css", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(CONTENT_TYPE).unwrap(),
        "text/css; charset=utf-8"
    );
}

#[tokio::test]
async fn test_credential_posts_are_rate_limited() {
    let app = rate_limited_app(false);

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let request = login_attempt("198.51.100.20:40000", "203.0.113.7");
        statuses.push(send(&app, request).await.status());
    }

    assert!(statuses[..5].iter().all(|s| *s == StatusCode::OK));
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);

    // Page views are not limited
    let response = send(&app, get("/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_reset_limit() {
    let app = rate_limited_app(false);

    let mut statuses = Vec::new();
    for i in 0..6 {
        let request = login_attempt("198.51.100.20:40000", &format!("203.0.113.{i}"));
        statuses.push(send(&app, request).await.status());
    }

    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_headers_key_the_limit() {
    let app = rate_limited_app(true);

    // One proxy address, distinct forwarded clients
    for i in 0..6 {
        let request = login_attempt("10.0.0.2:40000", &format!("203.0.113.{i}"));
        assert_eq!(send(&app, request).await.status(), StatusCode::OK);
    }

    let mut statuses = Vec::new();
    for _ in 0..6 {
        let request = login_attempt("10.0.0.2:40000", "198.51.100.77");
        statuses.push(send(&app, request).await.status());
    }
    assert_eq!(statuses[5], StatusCode::TOO_MANY_REQUESTS);
}
