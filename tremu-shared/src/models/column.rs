/// Board columns
///
/// # Schema
///
/// ```sql
/// CREATE TABLE columns (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(100) NOT NULL,
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     position INTEGER NOT NULL CHECK (position >= 0),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT columns_board_position_key UNIQUE (board_id, position)
///         DEFERRABLE INITIALLY DEFERRED
/// );
/// ```
///
/// `position` is exposed as `order` and is always `0..n-1` within a board.
/// Create, reorder and delete lock the board row exclusively, so they apply
/// one after the other and never overlap a task mutation on the same board
/// (those hold the board row in share mode).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::debug;

use super::positions::{self, OrderedTable};
use super::ReorderError;
use crate::ordering::OrderingError;

/// A column on a board
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    /// Column ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Owning board
    pub board_id: i64,

    /// Zero-based order within the board
    #[serde(rename = "order")]
    pub position: i32,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// Input for creating a column
#[derive(Debug, Clone)]
pub struct CreateColumn {
    /// Board to add the column to
    pub board_id: i64,

    /// Title
    pub title: String,
}

impl Column {
    /// Appends a column to the end of its board
    ///
    /// The new column's order equals the number of columns the board had.
    pub async fn create(pool: &PgPool, data: CreateColumn) -> Result<Self, ReorderError> {
        let mut tx = pool.begin().await?;

        if !positions::lock_parent(&mut *tx, OrderedTable::Columns, data.board_id).await? {
            return Err(ReorderError::NotFound("board"));
        }

        let mut siblings =
            positions::load_siblings(&mut *tx, OrderedTable::Columns, data.board_id).await?;

        let column = sqlx::query_as::<_, Column>(
            r#"
            INSERT INTO columns (title, board_id, position)
            VALUES ($1, $2, $3)
            RETURNING id, title, board_id, position, created_at
            "#,
        )
        .bind(&data.title)
        .bind(data.board_id)
        .bind(siblings.next_order())
        .fetch_one(&mut *tx)
        .await?;

        siblings.push(column.id)?;
        tx.commit().await?;

        debug!(column_id = column.id, board_id = column.board_id, order = column.position, "Column created");
        Ok(column)
    }

    /// Finds a column by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            "SELECT id, title, board_id, position, created_at FROM columns WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Columns of a board in order
    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::list_in(&mut *conn, board_id).await
    }

    async fn list_in(conn: &mut PgConnection, board_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            r#"
            SELECT id, title, board_id, position, created_at
            FROM columns
            WHERE board_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(conn)
        .await
    }

    /// Renames a column; ordering is untouched
    pub async fn update_title(
        pool: &PgPool,
        id: i64,
        title: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Column>(
            r#"
            UPDATE columns SET title = $2
            WHERE id = $1
            RETURNING id, title, board_id, position, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(pool)
        .await
    }

    /// Moves a column to `new_order` within its board
    ///
    /// Columns between the old and new slot shift by one toward the vacated
    /// slot. Returns the board's columns in their new order.
    ///
    /// # Errors
    ///
    /// - [`ReorderError::Ordering`] when `new_order` is outside `0..n`;
    ///   nothing is written
    /// - [`ReorderError::NotFound`] when the column does not exist
    pub async fn reorder(pool: &PgPool, id: i64, new_order: i64) -> Result<Vec<Self>, ReorderError> {
        let mut tx = pool.begin().await?;

        let board_id = board_of(&mut *tx, id).await?;
        if !positions::lock_parent(&mut *tx, OrderedTable::Columns, board_id).await? {
            return Err(ReorderError::NotFound("board"));
        }

        let before = positions::load_siblings(&mut *tx, OrderedTable::Columns, board_id).await?;
        let mut after = before.clone();
        let old = after.move_to(id, new_order).map_err(column_missing)?;

        let changes = after.changes_since(&before);
        positions::write_positions(&mut *tx, OrderedTable::Columns, &changes).await?;

        let columns = Self::list_in(&mut *tx, board_id).await?;
        tx.commit().await?;

        debug!(column_id = id, board_id, from = old, to = new_order, "Column reordered");
        Ok(columns)
    }

    /// Deletes a column and its tasks, closing the gap it leaves
    ///
    /// Returns `false` if the column did not exist.
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, ReorderError> {
        let mut tx = pool.begin().await?;

        let board_id = match board_of(&mut *tx, id).await {
            Ok(board_id) => board_id,
            Err(ReorderError::NotFound(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !positions::lock_parent(&mut *tx, OrderedTable::Columns, board_id).await? {
            return Ok(false);
        }

        let before = positions::load_siblings(&mut *tx, OrderedTable::Columns, board_id).await?;
        let mut after = before.clone();
        if after.remove(id).is_err() {
            return Ok(false);
        }

        sqlx::query("DELETE FROM columns WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let changes = after.changes_since(&before);
        positions::write_positions(&mut *tx, OrderedTable::Columns, &changes).await?;

        tx.commit().await?;

        debug!(column_id = id, board_id, shifted = changes.len(), "Column deleted");
        Ok(true)
    }
}

async fn board_of(conn: &mut PgConnection, column_id: i64) -> Result<i64, ReorderError> {
    sqlx::query_scalar::<_, i64>("SELECT board_id FROM columns WHERE id = $1")
        .bind(column_id)
        .fetch_optional(conn)
        .await?
        .ok_or(ReorderError::NotFound("column"))
}

// The column vanished between lookup and lock
fn column_missing(err: OrderingError) -> ReorderError {
    match err {
        OrderingError::UnknownItem(_) => ReorderError::NotFound("column"),
        other => ReorderError::Ordering(other),
    }
}
