//! # Tremu Shared Library
//!
//! Domain logic behind the Tremu Kanban API.
//!
//! ## Module Organization
//!
//! - `ordering`: dense `0..n-1` ordering of columns and tasks
//! - `db`: connection pool and embedded migrations
//! - `models`: tables and their queries
//! - `auth`: passwords, tokens, request authentication, board permissions

pub mod auth;
pub mod db;
pub mod models;
pub mod ordering;

/// Current version of the Tremu shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
