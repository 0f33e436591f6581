/// Current user endpoint
///
/// - `GET /api/user/me`

use axum::{extract::State, Extension};
use tremu_shared::{auth::middleware::AuthContext, models::user::User};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    response::Envelope,
};

/// Profile of the authenticated user
///
/// A valid token for a deleted account yields 404.
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<User>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    Ok(Envelope::ok("User retrieved", user))
}
