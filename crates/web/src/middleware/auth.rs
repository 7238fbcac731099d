//! Route guards.
//!
//! The decisions are plain functions over the resolved identity; the
//! [`RequireSession`] and [`RequireAnonymous`] extractors apply them to a
//! request and turn the redirect outcome into a `303 See Other`.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};

use super::session::AuthSession;
use crate::models::AuthenticatedIdentity;
use crate::state::AppState;

/// Where anonymous visitors are sent.
pub const LOGIN_PATH: &str = "/login";

/// Where signed-in visitors are sent.
pub const HOME_PATH: &str = "/";

/// Result of a guard decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome<T> {
    /// Let the request through.
    Pass(T),
    /// Send the visitor elsewhere.
    Redirect(&'static str),
}

/// Admit only requests carrying an identity.
#[must_use]
pub fn require_session(
    identity: Option<AuthenticatedIdentity>,
) -> GuardOutcome<AuthenticatedIdentity> {
    match identity {
        Some(identity) => GuardOutcome::Pass(identity),
        None => GuardOutcome::Redirect(LOGIN_PATH),
    }
}

/// Admit only requests without an identity.
#[must_use]
pub fn require_anonymous(identity: Option<&AuthenticatedIdentity>) -> GuardOutcome<()> {
    match identity {
        Some(_) => GuardOutcome::Redirect(HOME_PATH),
        None => GuardOutcome::Pass(()),
    }
}

/// Redirect returned when a guard rejects a request.
#[derive(Debug)]
pub struct GuardRedirect(pub &'static str);

impl IntoResponse for GuardRedirect {
    fn into_response(self) -> Response {
        Redirect::to(self.0).into_response()
    }
}

/// Extractor that requires an authenticated session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireSession(identity): RequireSession,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", identity.name)
/// }
/// ```
pub struct RequireSession(pub AuthenticatedIdentity);

impl<S> FromRequestParts<S> for RequireSession
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = AuthSession::from_parts(parts, &AppState::from_ref(state))
            .resolve()
            .await;

        match require_session(identity) {
            GuardOutcome::Pass(identity) => Ok(Self(identity)),
            GuardOutcome::Redirect(to) => Err(GuardRedirect(to)),
        }
    }
}

/// Extractor that requires the visitor to be signed out.
pub struct RequireAnonymous;

impl<S> FromRequestParts<S> for RequireAnonymous
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = GuardRedirect;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let identity = AuthSession::from_parts(parts, &AppState::from_ref(state))
            .resolve()
            .await;

        match require_anonymous(identity.as_ref()) {
            GuardOutcome::Pass(()) => Ok(Self),
            GuardOutcome::Redirect(to) => Err(GuardRedirect(to)),
        }
    }
}
