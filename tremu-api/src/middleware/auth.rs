/// JWT gate for protected routes
///
/// Validates the bearer access token and inserts the caller's
/// `AuthContext` into request extensions. Any failure stops the request
/// with 401 before a handler runs.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tremu_shared::auth::middleware::authenticate;

use crate::{app::AppState, error::ApiError};

/// Axum middleware, installed with `from_fn_with_state`
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth = authenticate(req.headers(), state.jwt_secret()).map_err(|e| {
        tracing::warn!(path = %req.uri().path(), error = %e, "Rejected unauthenticated request");
        ApiError::from(e)
    })?;

    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}
