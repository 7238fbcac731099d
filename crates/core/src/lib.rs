//! Keyhole Core - Shared domain types.
//!
//! This crate provides the types shared by the Keyhole components:
//! - `web` - Server-rendered login/register/session application
//! - `cli` - Command-line tools for migrations and account management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Validation happens at construction so the rest of the
//! workspace can rely on parsed values.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user ids, emails and display names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
