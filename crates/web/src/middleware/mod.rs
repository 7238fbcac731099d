//! HTTP middleware stack for Keyhole.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Security headers (CSP, frame and referrer policy, no-store)
//! 5. Session layer (tower-sessions with signed cookie)
//! 6. Rate limiting (governor, credential POSTs only)
//!
//! Route guards are extractors rather than layers; see [`auth`].

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{
    GuardOutcome, GuardRedirect, HOME_PATH, LOGIN_PATH, RequireAnonymous, RequireSession,
    require_anonymous, require_session,
};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::{AuthSession, SESSION_COOKIE_NAME, create_session_layer};
