//! Keyhole - credential-based session authentication.
//!
//! This binary serves the login, registration and home pages on port 3001.
//!
//! # Architecture
//!
//! - Axum web framework with Askama templates for server-side rendering
//! - Argon2id password hashing on the blocking thread pool
//! - tower-sessions with a signed cookie carrying only the session ID
//! - `PostgreSQL` for users and sessions, or in-memory stores when no
//!   database is configured

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use keyhole_web::config::KeyholeConfig;
use keyhole_web::db::{self, MemoryUserRepository, PgUserRepository};
use keyhole_web::routes::build_app;
use keyhole_web::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tokio::task::JoinHandle;
use tower_sessions::{ExpiredDeletion, MemoryStore};
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// How often expired sessions are purged from `PostgreSQL`.
const EXPIRED_SESSION_SWEEP: Duration = Duration::from_secs(60 * 60);

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &KeyholeConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry.sample_rate,
            traces_sample_rate: config.sentry.traces_sample_rate,
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

/// Build the application over `PostgreSQL` stores.
///
/// Returns the router and the expired-session sweeper task.
async fn postgres_app(
    config: KeyholeConfig,
    database_url: &secrecy::SecretString,
) -> (Router, JoinHandle<()>) {
    let pool = db::create_pool(database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p keyhole-cli -- migrate

    let store = PostgresStore::new(pool.clone());
    let sweeper = tokio::task::spawn({
        let store = store.clone();
        async move {
            if let Err(e) = store.continuously_delete_expired(EXPIRED_SESSION_SWEEP).await {
                tracing::error!(error = %e, "expired session sweeper stopped");
            }
        }
    });

    let users = Arc::new(PgUserRepository::new(pool));
    let state = AppState::new(config, users).expect("Invalid password hashing parameters");

    (build_app(state, store), sweeper)
}

/// Build the application over in-memory stores.
fn memory_app(config: KeyholeConfig) -> Router {
    tracing::warn!("No database configured; users and sessions are kept in memory only");

    let users = Arc::new(MemoryUserRepository::new());
    let state = AppState::new(config, users).expect("Invalid password hashing parameters");

    build_app(state, MemoryStore::default())
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = KeyholeConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "keyhole_web=info,tower_http=debug".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let addr = config.socket_addr();

    let (app, sweeper) = match config.database_url.clone() {
        Some(database_url) => {
            let (app, sweeper) = postgres_app(config, &database_url).await;
            (app, Some(sweeper))
        }
        None => (memory_app(config), None),
    };

    tracing::info!("keyhole listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
