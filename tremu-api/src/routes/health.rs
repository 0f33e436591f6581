/// Health check endpoint
///
/// ```text
/// GET /health
/// ```
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected",
///   "migrations": { "appliedMigrations": 3, "latestVersion": 20250110000003, "isUpToDate": true },
///   "pool": { "active": 1, "idle": 4, "total": 5 }
/// }
/// ```
///
/// Always 200. A failed database ping or a schema behind the embedded
/// migrations reports `degraded`.

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tremu_shared::db::{
    migrations::{get_migration_status, MigrationStatus},
    pool::{get_pool_stats, health_check as ping_database, PoolStats},
};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,

    /// Schema migration state; absent when the database is unreachable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrations: Option<MigrationStatus>,

    /// Connection pool usage
    pub pool: PoolStats,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let connected = match ping_database(&state.db).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            false
        }
    };

    let migrations = if connected {
        match get_migration_status(&state.db).await {
            Ok(status) => Some(status),
            Err(e) => {
                tracing::warn!(error = %e, "Migration status check failed");
                None
            }
        }
    } else {
        None
    };

    Ok(Json(HealthResponse {
        status: overall_status(connected, migrations.as_ref()).to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if connected { "connected" } else { "disconnected" }.to_string(),
        migrations,
        pool: get_pool_stats(&state.db),
    }))
}

fn overall_status(connected: bool, migrations: Option<&MigrationStatus>) -> &'static str {
    match migrations {
        Some(status) if connected && status.is_up_to_date => "healthy",
        _ => "degraded",
    }
}
