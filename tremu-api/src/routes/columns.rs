/// Column endpoints
///
/// # Endpoints
///
/// - `POST /api/boards/:id/columns` - Append a column (owner)
/// - `GET /api/boards/:id/columns` - Columns in order
/// - `PATCH /api/columns/:id` - Rename
/// - `DELETE /api/columns/:id` - Delete with its tasks (owner)
/// - `PATCH /api/columns/:id/reorder` - Move to `newOrder` (owner)

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use tracing::info;
use tremu_shared::{
    auth::{
        authorization::{require_membership, require_owner, BoardPermission},
        middleware::AuthContext,
    },
    models::column::{Column, CreateColumn},
};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_id, Trim, ValidatedJson},
    response::Envelope,
    routes::boards::load_board,
};

/// Create or rename request
#[derive(Debug, Deserialize, Validate)]
pub struct ColumnTitleRequest {
    /// Column title
    #[validate(length(min = 1, max = 100, message = "Title must be between 1 and 100 characters"))]
    pub title: String,
}

impl Trim for ColumnTitleRequest {
    fn trim(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
        }
    }
}

/// Reorder request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReorderColumnRequest {
    /// Target order within the board, `0..n`
    pub new_order: i64,
}

impl Trim for ReorderColumnRequest {
    fn trim(self) -> Self {
        self
    }
}

pub(crate) async fn load_column(state: &AppState, id: i64) -> ApiResult<Column> {
    Column::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("column"))
}

/// Append a column to a board
pub async fn create_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<String>,
    ValidatedJson(req): ValidatedJson<ColumnTitleRequest>,
) -> ApiResult<Envelope<Column>> {
    let board_id = parse_id(&board_id, "board")?;
    let board = load_board(&state, board_id).await?;
    require_owner(&state.db, board.id, auth.user_id, BoardPermission::ManageColumns).await?;

    let column = Column::create(
        &state.db,
        CreateColumn {
            board_id: board.id,
            title: req.title,
        },
    )
    .await?;

    info!(column_id = column.id, board_id = board.id, order = column.position, "Column created");
    Ok(Envelope::created("Column created successfully", column))
}

/// Columns of a board in order
pub async fn list_columns(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(board_id): Path<String>,
) -> ApiResult<Envelope<Vec<Column>>> {
    let board_id = parse_id(&board_id, "board")?;
    let board = load_board(&state, board_id).await?;
    require_membership(&state.db, board.id, auth.user_id).await?;

    let columns = Column::list_by_board(&state.db, board.id).await?;
    Ok(Envelope::ok("Columns retrieved", columns))
}

/// Rename a column
pub async fn update_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ColumnTitleRequest>,
) -> ApiResult<Envelope<Column>> {
    let id = parse_id(&id, "column")?;
    let column = load_column(&state, id).await?;
    require_membership(&state.db, column.board_id, auth.user_id).await?;

    let column = Column::update_title(&state.db, column.id, &req.title)
        .await?
        .ok_or_else(|| ApiError::not_found("column"))?;

    Ok(Envelope::ok("Column updated successfully", column))
}

/// Delete a column and its tasks
pub async fn delete_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    let id = parse_id(&id, "column")?;
    let column = load_column(&state, id).await?;
    require_owner(&state.db, column.board_id, auth.user_id, BoardPermission::ManageColumns).await?;

    if !Column::delete(&state.db, column.id).await? {
        return Err(ApiError::not_found("column"));
    }

    info!(column_id = column.id, board_id = column.board_id, "Column deleted");
    Ok(Envelope::message("Column deleted successfully"))
}

/// Move a column within its board
///
/// Responds with every column of the board in the new order.
pub async fn reorder_column(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ReorderColumnRequest>,
) -> ApiResult<Envelope<Vec<Column>>> {
    let id = parse_id(&id, "column")?;
    let column = load_column(&state, id).await?;
    require_owner(&state.db, column.board_id, auth.user_id, BoardPermission::ManageColumns).await?;

    let columns = Column::reorder(&state.db, column.id, req.new_order).await?;

    info!(
        column_id = column.id,
        from = column.position,
        to = req.new_order,
        "Column reordered"
    );
    Ok(Envelope::ok("Column reordered successfully", columns))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_is_trimmed_before_validation() {
        let req = ColumnTitleRequest {
            title: "   ".to_string(),
        }
        .trim();
        assert_eq!(req.title, "");
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_reorder_request_shape() {
        let req: ReorderColumnRequest = serde_json::from_str(r#"{"newOrder": 2}"#).unwrap();
        assert_eq!(req.new_order, 2);

        assert!(serde_json::from_str::<ReorderColumnRequest>(r#"{"newOrder": "2"}"#).is_err());
        assert!(serde_json::from_str::<ReorderColumnRequest>("{}").is_err());
    }
}
