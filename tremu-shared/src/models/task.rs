/// Tasks within columns
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT,
///     column_id BIGINT NOT NULL REFERENCES columns(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL CHECK (position >= 0),
///     assigned_to_id BIGINT REFERENCES users(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT tasks_column_position_key UNIQUE (column_id, position)
///         DEFERRABLE INITIALLY DEFERRED
/// );
/// ```
///
/// # Moving tasks
///
/// A move within one column behaves like a column reorder: target orders
/// range over `0..n`. A move to another column of the same board removes the
/// task from the source (closing the gap) and inserts it into the
/// destination, where targets range over `0..=n`.
///
/// # Locking
///
/// Create, move and delete take the board row in share mode, then lock the
/// affected columns in ascending id order. Column mutations hold the board
/// exclusively, so a task move never waits on a column that a column
/// reorder already holds. The task's column is read again once its columns
/// are locked; if a concurrent move got there first, the transaction is
/// retried, up to [`MAX_LOCK_ATTEMPTS`] times.
///
/// # Example
///
/// ```no_run
/// use tremu_shared::models::task::{CreateTask, Task};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let task = Task::create(&pool, CreateTask {
///     column_id: 4,
///     title: "Write release notes".to_string(),
///     description: None,
///     assigned_to_id: None,
/// }).await?;
///
/// // Into column 5, at the top
/// let moved = Task::move_to(&pool, task.id, Some(5), 0).await?;
/// assert_eq!(moved.position, 0);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

use super::positions::{self, OrderedTable};
use super::ReorderError;
use crate::ordering::OrderingError;

/// A task card
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Free-form description
    pub description: Option<String>,

    /// Column the task sits in
    pub column_id: i64,

    /// Zero-based order within the column
    #[serde(rename = "order")]
    pub position: i32,

    /// Assigned board member, if any
    pub assigned_to_id: Option<i64>,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Column to append to
    pub column_id: i64,

    /// Title
    pub title: String,

    /// Description
    pub description: Option<String>,

    /// Assignee; must already be a member of the board
    pub assigned_to_id: Option<i64>,
}

/// Partial update of a task's content
///
/// `description` distinguishes "leave alone" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description
    pub description: Option<Option<String>>,
}

/// Attempts at locking a task's columns before giving up with
/// [`ReorderError::Contended`]
pub const MAX_LOCK_ATTEMPTS: u32 = 5;

const TASK_COLUMNS: &str =
    "id, title, description, column_id, position, assigned_to_id, created_at, updated_at";

impl Task {
    /// Appends a task to the end of its column
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, ReorderError> {
        let mut tx = pool.begin().await?;

        let board_id = board_of_column(&mut *tx, data.column_id)
            .await?
            .ok_or(ReorderError::NotFound("column"))?;
        if !positions::share_board(&mut *tx, board_id).await?
            || !positions::lock_parent(&mut *tx, OrderedTable::Tasks, data.column_id).await?
        {
            return Err(ReorderError::NotFound("column"));
        }

        let mut siblings =
            positions::load_siblings(&mut *tx, OrderedTable::Tasks, data.column_id).await?;

        let sql = format!(
            r#"
            INSERT INTO tasks (title, description, column_id, position, assigned_to_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {TASK_COLUMNS}
            "#
        );
        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(&data.title)
            .bind(&data.description)
            .bind(data.column_id)
            .bind(siblings.next_order())
            .bind(data.assigned_to_id)
            .fetch_one(&mut *tx)
            .await?;

        siblings.push(task.id)?;
        tx.commit().await?;

        debug!(task_id = task.id, column_id = task.column_id, order = task.position, "Task created");
        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::find_in(&mut *conn, id).await
    }

    async fn find_in(conn: &mut PgConnection, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    /// Board a task belongs to, through its column
    pub async fn board_id(pool: &PgPool, id: i64) -> Result<Option<i64>, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT c.board_id
            FROM tasks t
            JOIN columns c ON c.id = t.column_id
            WHERE t.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Tasks of a column in order
    pub async fn list_by_column(pool: &PgPool, column_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE column_id = $1 ORDER BY position ASC, id ASC"
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(column_id)
            .fetch_all(pool)
            .await
    }

    /// Every task on a board, grouped by column order then task order
    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>(
            r#"
            SELECT t.id, t.title, t.description, t.column_id, t.position,
                   t.assigned_to_id, t.created_at, t.updated_at
            FROM tasks t
            JOIN columns c ON c.id = t.column_id
            WHERE c.board_id = $1
            ORDER BY c.position ASC, t.position ASC, t.id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }

    /// Updates title and/or description; ordering is untouched
    pub async fn update(pool: &PgPool, id: i64, data: UpdateTask) -> Result<Option<Self>, sqlx::Error> {
        let (set_description, description) = match data.description {
            Some(description) => (true, description),
            None => (false, None),
        };

        let sql = format!(
            r#"
            UPDATE tasks
            SET title = COALESCE($2, title),
                description = CASE WHEN $3 THEN $4 ELSE description END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(data.title)
            .bind(set_description)
            .bind(description)
            .fetch_optional(pool)
            .await
    }

    /// Sets or clears the assignee
    pub async fn assign(
        pool: &PgPool,
        id: i64,
        assigned_to_id: Option<i64>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            UPDATE tasks
            SET assigned_to_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING {TASK_COLUMNS}
            "#
        );
        sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .bind(assigned_to_id)
            .fetch_optional(pool)
            .await
    }

    /// Moves a task within its column, or into another column of the board
    ///
    /// `target_column` of `None` (or the task's own column) reorders in
    /// place. Returns the task as it is after the move.
    ///
    /// # Errors
    ///
    /// - [`ReorderError::Ordering`] when `new_order` is out of range for the
    ///   destination; nothing is written
    /// - [`ReorderError::CrossBoard`] when the destination column is on
    ///   another board
    /// - [`ReorderError::NotFound`] when the task or destination column
    ///   does not exist
    /// - [`ReorderError::Contended`] when the task kept changing column on
    ///   every attempt
    pub async fn move_to(
        pool: &PgPool,
        id: i64,
        target_column: Option<i64>,
        new_order: i64,
    ) -> Result<Self, ReorderError> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            if let Some(task) = Self::try_move(pool, id, target_column, new_order).await? {
                return Ok(task);
            }
            debug!(task_id = id, attempt, "Task changed column while locking, retrying move");
        }

        warn!(task_id = id, attempts = MAX_LOCK_ATTEMPTS, "Giving up on contended task move");
        Err(ReorderError::Contended)
    }

    /// One move attempt; `None` means the task left its column before the
    /// column lock was granted and nothing was written
    async fn try_move(
        pool: &PgPool,
        id: i64,
        target_column: Option<i64>,
        new_order: i64,
    ) -> Result<Option<Self>, ReorderError> {
        let mut tx = pool.begin().await?;

        let (source_column, board_id) = share_board_of(&mut *tx, id).await?;
        let destination = target_column.unwrap_or(source_column);

        if destination != source_column {
            let destination_board = board_of_column(&mut *tx, destination)
                .await?
                .ok_or(ReorderError::NotFound("column"))?;
            if destination_board != board_id {
                return Err(ReorderError::CrossBoard);
            }
        }

        let mut columns = vec![source_column, destination];
        columns.sort_unstable();
        columns.dedup();
        for column_id in columns {
            if !positions::lock_parent(&mut *tx, OrderedTable::Tasks, column_id).await? {
                return Err(ReorderError::NotFound("column"));
            }
        }

        if column_of(&mut *tx, id).await? != Some(source_column) {
            return Ok(None);
        }

        if destination == source_column {
            let before = positions::load_siblings(&mut *tx, OrderedTable::Tasks, source_column).await?;
            let mut after = before.clone();
            after.move_to(id, new_order).map_err(task_missing)?;

            let changes = after.changes_since(&before);
            positions::write_positions(&mut *tx, OrderedTable::Tasks, &changes).await?;
        } else {
            let source_before =
                positions::load_siblings(&mut *tx, OrderedTable::Tasks, source_column).await?;
            let destination_before =
                positions::load_siblings(&mut *tx, OrderedTable::Tasks, destination).await?;

            let mut source_after = source_before.clone();
            let mut destination_after = destination_before.clone();
            source_after.remove(id).map_err(task_missing)?;
            destination_after.insert_at(id, new_order)?;

            sqlx::query("UPDATE tasks SET column_id = $2 WHERE id = $1")
                .bind(id)
                .bind(destination)
                .execute(&mut *tx)
                .await?;

            let source_changes = source_after.changes_since(&source_before);
            let destination_changes = destination_after.changes_since(&destination_before);
            positions::write_positions(&mut *tx, OrderedTable::Tasks, &source_changes).await?;
            positions::write_positions(&mut *tx, OrderedTable::Tasks, &destination_changes).await?;
        }

        sqlx::query("UPDATE tasks SET updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let task = Self::find_in(&mut *tx, id)
            .await?
            .ok_or(ReorderError::NotFound("task"))?;
        tx.commit().await?;

        debug!(
            task_id = id,
            from_column = source_column,
            to_column = destination,
            order = task.position,
            "Task moved"
        );
        Ok(Some(task))
    }

    /// Deletes a task, closing the gap it leaves in its column
    ///
    /// Returns `false` if the task did not exist.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, ReorderError> {
        for attempt in 1..=MAX_LOCK_ATTEMPTS {
            if let Some(deleted) = Self::try_delete(pool, id).await? {
                return Ok(deleted);
            }
            debug!(task_id = id, attempt, "Task changed column while locking, retrying delete");
        }

        warn!(task_id = id, attempts = MAX_LOCK_ATTEMPTS, "Giving up on contended task delete");
        Err(ReorderError::Contended)
    }

    async fn try_delete(pool: &PgPool, id: i64) -> Result<Option<bool>, ReorderError> {
        let mut tx = pool.begin().await?;

        let column_id = match share_board_of(&mut *tx, id).await {
            Ok((column_id, _)) => column_id,
            Err(ReorderError::NotFound(_)) => return Ok(Some(false)),
            Err(e) => return Err(e),
        };
        if !positions::lock_parent(&mut *tx, OrderedTable::Tasks, column_id).await? {
            return Ok(Some(false));
        }
        if column_of(&mut *tx, id).await? != Some(column_id) {
            return Ok(None);
        }

        let before = positions::load_siblings(&mut *tx, OrderedTable::Tasks, column_id).await?;
        let mut after = before.clone();
        if after.remove(id).is_err() {
            return Ok(Some(false));
        }

        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let changes = after.changes_since(&before);
        positions::write_positions(&mut *tx, OrderedTable::Tasks, &changes).await?;

        tx.commit().await?;

        debug!(task_id = id, column_id, shifted = changes.len(), "Task deleted");
        Ok(Some(true))
    }
}

/// Share-locks the task's board and returns the task's current
/// `(column_id, board_id)`
///
/// The board never changes while the task exists; the column may, until the
/// caller holds that column's lock.
async fn share_board_of(conn: &mut PgConnection, task_id: i64) -> Result<(i64, i64), ReorderError> {
    let board_id = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT c.board_id
        FROM tasks t
        JOIN columns c ON c.id = t.column_id
        WHERE t.id = $1
        "#,
    )
    .bind(task_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or(ReorderError::NotFound("task"))?;

    if !positions::share_board(&mut *conn, board_id).await? {
        return Err(ReorderError::NotFound("task"));
    }

    let column_id = column_of(&mut *conn, task_id)
        .await?
        .ok_or(ReorderError::NotFound("task"))?;
    Ok((column_id, board_id))
}

async fn column_of(conn: &mut PgConnection, task_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT column_id FROM tasks WHERE id = $1")
        .bind(task_id)
        .fetch_optional(conn)
        .await
}

async fn board_of_column(conn: &mut PgConnection, column_id: i64) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT board_id FROM columns WHERE id = $1")
        .bind(column_id)
        .fetch_optional(conn)
        .await
}

// A task id missing from its locked column
fn task_missing(err: OrderingError) -> ReorderError {
    match err {
        OrderingError::UnknownItem(_) => ReorderError::NotFound("task"),
        other => ReorderError::Ordering(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task() -> Task {
        Task {
            id: 9,
            title: "Ship it".to_string(),
            description: None,
            column_id: 2,
            position: 0,
            assigned_to_id: Some(5),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_task_json_shape() {
        let json = serde_json::to_value(sample_task()).unwrap();

        assert_eq!(json["order"], 0);
        assert_eq!(json["columnId"], 2);
        assert_eq!(json["assignedToId"], 5);
        assert!(json["description"].is_null());
        assert!(json.get("position").is_none());
    }

    #[test]
    fn test_update_task_default_touches_nothing() {
        let update = UpdateTask::default();
        assert!(update.title.is_none());
        assert!(update.description.is_none());
    }

    #[test]
    fn test_task_missing_maps_unknown_item() {
        assert!(matches!(
            task_missing(OrderingError::UnknownItem(9)),
            ReorderError::NotFound("task")
        ));
        assert!(matches!(
            task_missing(OrderingError::DuplicateItem(9)),
            ReorderError::Ordering(OrderingError::DuplicateItem(9))
        ));
    }
}
