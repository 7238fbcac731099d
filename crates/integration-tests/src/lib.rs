//! Integration tests for Keyhole.
//!
//! These run against a live server over HTTP and are `#[ignore]`d by default.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the server (in-memory stores are fine)
//! KEYHOLE_AUTH_RATE_LIMIT=false cargo run -p keyhole-web
//!
//! # Run the ignored tests against it
//! KEYHOLE_TEST_BASE_URL=http://localhost:3001 \
//!     cargo test -p keyhole-integration-tests -- --ignored
//! ```

use reqwest::{Client, redirect::Policy};

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("KEYHOLE_TEST_BASE_URL").unwrap_or_else(|_| "http://localhost:3001".to_string())
}

/// Client with a cookie jar that does not follow redirects.
///
/// # Errors
///
/// Returns an error if the TLS backend cannot be initialised.
pub fn client() -> reqwest::Result<Client> {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
}

/// An email address no other test run has registered.
#[must_use]
pub fn unique_email() -> String {
    format!("it-{}@example.test", uuid::Uuid::new_v4().simple())
}
