//! Business logic services.

pub mod auth;

pub use auth::{AuthFailure, AuthOutcome, AuthService, Registration};
