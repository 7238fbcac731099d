//! Authentication route handlers.
//!
//! Handles login, registration and logout with email/password credentials.
//! Credential failures re-render the submitted form with a message; only a
//! successful submission redirects.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{AuthSession, HOME_PATH, LOGIN_PATH, RequireAnonymous, RequireSession};
use crate::services::auth::{AuthFailure, AuthOutcome, Registration};
use crate::state::AppState;

/// Name the login page greets visitors with.
const GUEST_NAME: &str = "Guest";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for RegisterForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub greeting: &'static str,
    pub email: String,
    pub error: Option<String>,
}

impl LoginTemplate {
    fn new(email: String, error: Option<String>) -> Self {
        Self {
            greeting: GUEST_NAME,
            email,
            error,
        }
    }
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub name: String,
    pub email: String,
    pub error: Option<String>,
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
#[instrument(skip_all)]
pub async fn login_page(_: RequireAnonymous) -> impl IntoResponse {
    LoginTemplate::new(String::new(), None)
}

/// Handle login form submission.
///
/// On success the session is bound to the user and the visitor is sent home.
/// Every failure re-renders the form with its own message.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    _: RequireAnonymous,
    auth_session: AuthSession,
    Form(form): Form<LoginForm>,
) -> Response {
    let password = SecretString::from(form.password);
    let failure = match state.auth().authenticate(&form.email, &password).await {
        AuthOutcome::Success(identity) => match auth_session.establish(&identity).await {
            Ok(()) => {
                set_sentry_user(&identity.id);
                add_breadcrumb("auth", "login");
                tracing::info!(user_id = %identity.id, "user logged in");
                return Redirect::to(HOME_PATH).into_response();
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to establish session");
                AuthFailure::LoginRejected
            }
        },
        AuthOutcome::Failure(failure) => failure,
    };

    let status = match failure {
        AuthFailure::EmailNotFound | AuthFailure::PasswordMismatch => StatusCode::OK,
        AuthFailure::LoginRejected | AuthFailure::LookupError => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        LoginTemplate::new(form.email, Some(failure.message().to_string())),
    )
        .into_response()
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
#[instrument(skip_all)]
pub async fn register_page(_: RequireAnonymous) -> impl IntoResponse {
    RegisterTemplate {
        name: String::new(),
        email: String::new(),
        error: None,
    }
}

/// Handle registration form submission.
///
/// Creates the account and sends the visitor to the login page; the new
/// account is not signed in automatically.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    _: RequireAnonymous,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = Registration {
        name: form.name.clone(),
        email: form.email.clone(),
        password: SecretString::from(form.password),
    };

    match state.auth().register(registration).await {
        Ok(user) => {
            add_breadcrumb("auth", "register");
            tracing::debug!(user_id = %user.id, "redirecting new user to login");
            Redirect::to(LOGIN_PATH).into_response()
        }
        Err(e) => {
            let status = if e.is_internal() {
                tracing::error!(error = %e, "registration failed");
                StatusCode::INTERNAL_SERVER_ERROR
            } else {
                tracing::debug!(error = %e, "registration rejected");
                StatusCode::OK
            };

            (
                status,
                RegisterTemplate {
                    name: form.name,
                    email: form.email,
                    error: Some(e.user_message()),
                },
            )
                .into_response()
        }
    }
}

// =============================================================================
// Logout
// =============================================================================

/// Handle logout.
///
/// Routed for both `DELETE /logout` and `POST /logout`; HTML forms send the
/// latter with a `_method=DELETE` field.
///
/// # Errors
///
/// Returns `AppError::Session` if the session store cannot delete the
/// session; the visitor stays signed in.
#[instrument(skip_all)]
pub async fn logout(
    RequireSession(identity): RequireSession,
    auth_session: AuthSession,
) -> Result<Redirect, AppError> {
    auth_session.destroy().await?;

    clear_sentry_user();
    add_breadcrumb("auth", "logout");
    tracing::info!(user_id = %identity.id, "user logged out");

    Ok(Redirect::to(LOGIN_PATH))
}
