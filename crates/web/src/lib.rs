//! Keyhole web library.
//!
//! Email/password registration, login and cookie sessions for a
//! server-rendered site. The binary in `main.rs` wires these modules to a
//! listener; tests drive [`routes::build_app`] directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
