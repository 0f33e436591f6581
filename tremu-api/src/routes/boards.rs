/// Board endpoints
///
/// # Endpoints
///
/// - `POST /api/boards` - Create a board; the caller becomes its owner
/// - `GET /api/boards` - Boards the caller belongs to
/// - `GET /api/boards/:id` - Board with members, columns and tasks
/// - `DELETE /api/boards/:id` - Delete a board (owner)
/// - `POST /api/boards/:id/invite` - Add a member by email (owner)
/// - `GET /api/boards/:id/members` - List members

use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    Extension,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use tremu_shared::{
    auth::{
        authorization::{require_membership, require_owner, BoardPermission},
        middleware::AuthContext,
    },
    models::{
        board::{Board, BoardSummary, CreateBoard},
        board_member::{BoardMember, BoardRole, CreateBoardMember, MemberProfile},
        column::Column,
        task::Task,
        user::{normalize_email, User},
    },
};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    extract::{parse_id, Trim, ValidatedJson},
    response::Envelope,
};

/// Create board request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateBoardRequest {
    /// Board title
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,
}

impl Trim for CreateBoardRequest {
    fn trim(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
        }
    }
}

/// Invite request
#[derive(Debug, Deserialize, Validate)]
pub struct InviteRequest {
    /// Email of the user to add
    #[validate(
        email(message = "Invalid email format"),
        length(max = 255, message = "Email must be at most 255 characters")
    )]
    pub email: String,
}

impl Trim for InviteRequest {
    fn trim(self) -> Self {
        Self {
            email: normalize_email(&self.email),
        }
    }
}

/// A column with its tasks, for the board view
#[derive(Debug, Serialize)]
pub struct ColumnWithTasks {
    /// The column
    #[serde(flatten)]
    pub column: Column,

    /// Its tasks in order
    pub tasks: Vec<Task>,
}

/// Full board view
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDetail {
    /// Board ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Owner
    pub owner_id: i64,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// The caller's role
    pub role: BoardRole,

    /// Members, owner first
    pub members: Vec<MemberProfile>,

    /// Columns in order, each with its tasks in order
    pub columns: Vec<ColumnWithTasks>,
}

/// Groups board-ordered tasks under their columns
fn nest_tasks(columns: Vec<Column>, tasks: Vec<Task>) -> Vec<ColumnWithTasks> {
    let mut by_column: HashMap<i64, Vec<Task>> = HashMap::new();
    for task in tasks {
        by_column.entry(task.column_id).or_default().push(task);
    }

    columns
        .into_iter()
        .map(|column| {
            let tasks = by_column.remove(&column.id).unwrap_or_default();
            ColumnWithTasks { column, tasks }
        })
        .collect()
}

pub(crate) async fn load_board(state: &AppState, id: i64) -> ApiResult<Board> {
    Board::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("board"))
}

/// Create a board
pub async fn create_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ValidatedJson(req): ValidatedJson<CreateBoardRequest>,
) -> ApiResult<Envelope<Board>> {
    let board = Board::create(
        &state.db,
        CreateBoard {
            title: req.title,
            owner_id: auth.user_id,
        },
    )
    .await?;

    info!(board_id = board.id, user_id = auth.user_id, "Board created");
    Ok(Envelope::created("Board created successfully", board))
}

/// Boards the caller belongs to, newest first
pub async fn list_boards(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Envelope<Vec<BoardSummary>>> {
    let boards = Board::list_for_user(&state.db, auth.user_id).await?;
    Ok(Envelope::ok("Boards retrieved", boards))
}

/// Board with members, columns and tasks
pub async fn get_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<BoardDetail>> {
    let id = parse_id(&id, "board")?;
    let board = load_board(&state, id).await?;
    let access = require_membership(&state.db, board.id, auth.user_id).await?;

    let members = BoardMember::list_by_board(&state.db, board.id).await?;
    let columns = Column::list_by_board(&state.db, board.id).await?;
    let tasks = Task::list_by_board(&state.db, board.id).await?;

    Ok(Envelope::ok(
        "Board retrieved",
        BoardDetail {
            id: board.id,
            title: board.title,
            owner_id: board.owner_id,
            created_at: board.created_at,
            role: access.role,
            members,
            columns: nest_tasks(columns, tasks),
        },
    ))
}

/// Delete a board and everything on it
pub async fn delete_board(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    let id = parse_id(&id, "board")?;
    let board = load_board(&state, id).await?;
    require_owner(&state.db, board.id, auth.user_id, BoardPermission::DeleteBoard).await?;

    if !Board::delete(&state.db, board.id).await? {
        return Err(ApiError::not_found("board"));
    }

    info!(board_id = board.id, user_id = auth.user_id, "Board deleted");
    Ok(Envelope::message("Board deleted successfully"))
}

/// Add an existing user to the board as a member
///
/// # Errors
///
/// - `404 Not Found`: no user with that email
/// - `409 Conflict`: already a member
pub async fn invite_member(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<InviteRequest>,
) -> ApiResult<Envelope<MemberProfile>> {
    let id = parse_id(&id, "board")?;
    let board = load_board(&state, id).await?;
    require_owner(&state.db, board.id, auth.user_id, BoardPermission::Invite).await?;

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;

    if BoardMember::is_member(&state.db, board.id, user.id).await? {
        return Err(ApiError::Conflict(
            "User is already a member of this board".to_string(),
        ));
    }

    let member = BoardMember::create(
        &state.db,
        CreateBoardMember {
            board_id: board.id,
            user_id: user.id,
            role: BoardRole::Member,
        },
    )
    .await?;

    info!(board_id = board.id, user_id = user.id, "Member invited");
    Ok(Envelope::created(
        "Member invited successfully",
        MemberProfile {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: member.role,
        },
    ))
}

/// Members of a board
pub async fn list_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<Vec<MemberProfile>>> {
    let id = parse_id(&id, "board")?;
    let board = load_board(&state, id).await?;
    require_membership(&state.db, board.id, auth.user_id).await?;

    let members = BoardMember::list_by_board(&state.db, board.id).await?;
    Ok(Envelope::ok("Members retrieved", members))
}
