//! Core types for Keyhole.
//!
//! This module provides type-safe wrappers for account attributes.

pub mod email;
pub mod id;
pub mod name;

pub use email::{Email, EmailError};
pub use id::*;
pub use name::{DisplayName, DisplayNameError};
