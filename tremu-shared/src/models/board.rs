/// Boards
///
/// # Schema
///
/// ```sql
/// CREATE TABLE boards (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(100) NOT NULL,
///     owner_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// Deleting a board cascades to its memberships, columns and tasks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;

use super::board_member::{BoardMember, BoardRole, CreateBoardMember};

/// A Kanban board
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Board {
    /// Board ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Creator and owner
    pub owner_id: i64,

    /// Creation time
    pub created_at: DateTime<Utc>,
}

/// A board as seen by one of its members
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    /// Board ID
    pub id: i64,

    /// Title
    pub title: String,

    /// Owner
    pub owner_id: i64,

    /// Creation time
    pub created_at: DateTime<Utc>,

    /// The viewing user's role
    pub role: BoardRole,
}

/// Input for creating a board
#[derive(Debug, Clone)]
pub struct CreateBoard {
    /// Title
    pub title: String,

    /// Creating user, who becomes the owner
    pub owner_id: i64,
}

impl Board {
    /// Creates a board and its owner membership in one transaction
    pub async fn create(pool: &PgPool, data: CreateBoard) -> Result<Self, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let board = sqlx::query_as::<_, Board>(
            r#"
            INSERT INTO boards (title, owner_id)
            VALUES ($1, $2)
            RETURNING id, title, owner_id, created_at
            "#,
        )
        .bind(&data.title)
        .bind(data.owner_id)
        .fetch_one(&mut *tx)
        .await?;

        BoardMember::insert(
            &mut *tx,
            CreateBoardMember {
                board_id: board.id,
                user_id: data.owner_id,
                role: BoardRole::Owner,
            },
        )
        .await?;

        tx.commit().await?;

        debug!(board_id = board.id, owner_id = board.owner_id, "Board created");
        Ok(board)
    }

    /// Finds a board by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Board>(
            "SELECT id, title, owner_id, created_at FROM boards WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Boards the user belongs to, newest first, with their role on each
    pub async fn list_for_user(pool: &PgPool, user_id: i64) -> Result<Vec<BoardSummary>, sqlx::Error> {
        sqlx::query_as::<_, BoardSummary>(
            r#"
            SELECT b.id, b.title, b.owner_id, b.created_at, m.role
            FROM boards b
            JOIN board_members m ON m.board_id = b.id
            WHERE m.user_id = $1
            ORDER BY b.created_at DESC, b.id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Deletes a board and everything on it
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM boards WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
