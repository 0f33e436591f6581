/// Database layer
///
/// - `pool`: PostgreSQL connection pool with health checks
/// - `migrations`: embedded schema migrations
///
/// Table models live in [`crate::models`].

pub mod migrations;
pub mod pool;
