/// API route handlers, organized by resource
///
/// - `health`: health check
/// - `auth`: register, login, token refresh
/// - `users`: current user
/// - `boards`: boards and membership
/// - `columns`: columns and column ordering
/// - `tasks`: tasks, assignment and moves

pub mod auth;
pub mod boards;
pub mod columns;
pub mod health;
pub mod tasks;
pub mod users;
