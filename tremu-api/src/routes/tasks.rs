/// Task endpoints
///
/// Every task operation is open to any board member.
///
/// # Endpoints
///
/// - `POST /api/columns/:id/tasks` - Append a task
/// - `GET /api/columns/:id/tasks` - Tasks in order
/// - `PATCH /api/tasks/:id` - Edit title/description
/// - `PATCH /api/tasks/:id/assign` - Set or clear the assignee
/// - `PATCH /api/tasks/:id/move` - Reorder, or move to another column
/// - `DELETE /api/tasks/:id` - Delete

use axum::{
    extract::{Path, State},
    Extension,
};
use serde::Deserialize;
use tracing::{info, warn};
use tremu_shared::{
    auth::{authorization::require_membership, middleware::AuthContext},
    models::{
        board_member::BoardMember,
        task::{CreateTask, Task, UpdateTask},
    },
};
use validator::Validate;

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{double_option, parse_id, trim_opt, Trim, ValidatedJson},
    response::Envelope,
    routes::columns::load_column,
};

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    /// Title
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    /// Description
    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Assignee, who must be a board member
    pub assigned_to_id: Option<i64>,
}

impl Trim for CreateTaskRequest {
    fn trim(self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: trim_opt(self.description).filter(|d| !d.is_empty()),
            assigned_to_id: self.assigned_to_id,
        }
    }
}

/// Edit task request
///
/// `description: null` clears the description; leaving it out keeps it.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: Option<String>,

    /// New description
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
}

impl Trim for UpdateTaskRequest {
    fn trim(self) -> Self {
        Self {
            title: trim_opt(self.title),
            description: self
                .description
                .map(|d| trim_opt(d).filter(|d| !d.is_empty())),
        }
    }
}

/// Assign request; `assignedToId` must be present, `null` unassigns
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignTaskRequest {
    /// New assignee
    #[serde(default, deserialize_with = "double_option")]
    pub assigned_to_id: Option<Option<i64>>,
}

impl Trim for AssignTaskRequest {
    fn trim(self) -> Self {
        self
    }
}

/// Move request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    /// Destination column; defaults to the task's own column
    pub column_id: Option<i64>,

    /// Target order in the destination
    pub new_order: i64,
}

impl Trim for MoveTaskRequest {
    fn trim(self) -> Self {
        self
    }
}

/// Loads a task and authorizes the caller on its board
///
/// Returns the task and its board id.
async fn load_task_for_member(
    state: &AppState,
    auth: &AuthContext,
    id: i64,
) -> ApiResult<(Task, i64)> {
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("task"))?;
    let board_id = Task::board_id(&state.db, task.id)
        .await?
        .ok_or_else(|| ApiError::not_found("task"))?;

    require_membership(&state.db, board_id, auth.user_id).await?;
    Ok((task, board_id))
}

async fn ensure_assignee_is_member(
    state: &AppState,
    board_id: i64,
    assignee: Option<i64>,
) -> ApiResult<()> {
    if let Some(user_id) = assignee {
        if !BoardMember::is_member(&state.db, board_id, user_id).await? {
            warn!(board_id, user_id, "Assignee is not a board member");
            return Err(ApiError::BadRequest(
                "Assignee must be a member of this board".to_string(),
            ));
        }
    }
    Ok(())
}

/// Append a task to a column
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(column_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    let column_id = parse_id(&column_id, "column")?;
    let column = load_column(&state, column_id).await?;
    require_membership(&state.db, column.board_id, auth.user_id).await?;
    ensure_assignee_is_member(&state, column.board_id, req.assigned_to_id).await?;

    let task = Task::create(
        &state.db,
        CreateTask {
            column_id: column.id,
            title: req.title,
            description: req.description,
            assigned_to_id: req.assigned_to_id,
        },
    )
    .await?;

    info!(task_id = task.id, column_id = column.id, order = task.position, "Task created");
    Ok(Envelope::created("Task created successfully", task))
}

/// Tasks of a column in order
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(column_id): Path<String>,
) -> ApiResult<Envelope<Vec<Task>>> {
    let column_id = parse_id(&column_id, "column")?;
    let column = load_column(&state, column_id).await?;
    require_membership(&state.db, column.board_id, auth.user_id).await?;

    let tasks = Task::list_by_column(&state.db, column.id).await?;
    Ok(Envelope::ok("Tasks retrieved", tasks))
}

/// Edit a task's title and/or description
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    let id = parse_id(&id, "task")?;
    let (task, _) = load_task_for_member(&state, &auth, id).await?;

    let task = Task::update(
        &state.db,
        task.id,
        UpdateTask {
            title: req.title,
            description: req.description,
        },
    )
    .await?
    .ok_or_else(|| ApiError::not_found("task"))?;

    Ok(Envelope::ok("Task updated successfully", task))
}

/// Set or clear a task's assignee
pub async fn assign_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<AssignTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    let id = parse_id(&id, "task")?;
    let assignee = req.assigned_to_id.ok_or_else(|| {
        ApiError::ValidationError(vec![ValidationErrorDetail::new(
            "assignedToId",
            "assignedToId is required (use null to unassign)",
        )])
    })?;

    let (task, board_id) = load_task_for_member(&state, &auth, id).await?;
    ensure_assignee_is_member(&state, board_id, assignee).await?;

    let task = Task::assign(&state.db, task.id, assignee)
        .await?
        .ok_or_else(|| ApiError::not_found("task"))?;

    info!(task_id = task.id, assigned_to_id = ?task.assigned_to_id, "Task assigned");
    Ok(Envelope::ok("Task assigned successfully", task))
}

/// Move a task within its column or to another column of the same board
///
/// # Errors
///
/// - `400 Bad Request`: `newOrder` out of range, or the column is on
///   another board
/// - `404 Not Found`: task or destination column missing
pub async fn move_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<MoveTaskRequest>,
) -> ApiResult<Envelope<Task>> {
    let id = parse_id(&id, "task")?;
    if let Some(column_id) = req.column_id {
        if column_id <= 0 {
            return Err(ApiError::BadRequest(format!("Invalid column id: {}", column_id)));
        }
    }

    let (task, board_id) = load_task_for_member(&state, &auth, id).await?;

    if let Some(column_id) = req.column_id {
        let destination = load_column(&state, column_id).await?;
        if destination.board_id != board_id {
            return Err(ApiError::BadRequest(
                "Target column belongs to a different board".to_string(),
            ));
        }
    }

    let moved = Task::move_to(&state.db, task.id, req.column_id, req.new_order).await?;

    info!(
        task_id = moved.id,
        from_column = task.column_id,
        to_column = moved.column_id,
        order = moved.position,
        "Task moved"
    );
    Ok(Envelope::ok("Task moved successfully", moved))
}

/// Delete a task
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Envelope<()>> {
    let id = parse_id(&id, "task")?;
    let (task, _) = load_task_for_member(&state, &auth, id).await?;

    if !Task::delete(&state.db, task.id).await? {
        return Err(ApiError::not_found("task"));
    }

    info!(task_id = task.id, column_id = task.column_id, "Task deleted");
    Ok(Envelope::message("Task deleted successfully"))
}
