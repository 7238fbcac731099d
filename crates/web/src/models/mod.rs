//! Domain models for Keyhole.
//!
//! - [`user`] - Stored account records as returned by the user repository
//! - [`session`] - The identity carried forward after authentication

pub mod session;
pub mod user;

pub use session::{AuthenticatedIdentity, keys as session_keys};
pub use user::{NewUser, UserRecord};
