/// Middleware modules for the API server
///
/// - `auth`: JWT gate for every non-public route
/// - `security`: security response headers

pub mod auth;
pub mod security;
