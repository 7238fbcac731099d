//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::filters;
use crate::middleware::RequireSession;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub name: String,
}

/// Display the signed-in home page.
#[instrument(skip_all)]
pub async fn home(RequireSession(identity): RequireSession) -> impl IntoResponse {
    IndexTemplate {
        name: identity.name.to_string(),
    }
}
