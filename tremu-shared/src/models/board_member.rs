/// Board membership with roles
///
/// # Schema
///
/// ```sql
/// CREATE TYPE board_role AS ENUM ('owner', 'member');
///
/// CREATE TABLE board_members (
///     board_id BIGINT NOT NULL REFERENCES boards(id) ON DELETE CASCADE,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     role board_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     PRIMARY KEY (board_id, user_id)
/// );
/// ```
///
/// # Roles
///
/// - **owner**: the board's creator; manages structure (columns) and invites
/// - **member**: reads the board, edits column titles, works on tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};

/// Role of a user on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "board_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BoardRole {
    /// Created the board
    Owner,

    /// Invited collaborator
    Member,
}

impl BoardRole {
    /// Create, delete and reorder columns
    pub fn can_manage_columns(&self) -> bool {
        matches!(self, BoardRole::Owner)
    }

    /// Invite other users
    pub fn can_invite(&self) -> bool {
        matches!(self, BoardRole::Owner)
    }

    /// Delete the board
    pub fn can_delete_board(&self) -> bool {
        matches!(self, BoardRole::Owner)
    }
}

/// Membership row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BoardMember {
    /// Board ID
    pub board_id: i64,

    /// User ID
    pub user_id: i64,

    /// Role on the board
    pub role: BoardRole,

    /// When the user joined
    pub created_at: DateTime<Utc>,
}

/// A member with their public profile, for board views
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MemberProfile {
    /// User ID
    pub user_id: i64,

    /// Email address
    pub email: String,

    /// Display name
    pub name: String,

    /// Role on the board
    pub role: BoardRole,
}

/// Input for adding a member
#[derive(Debug, Clone, Copy)]
pub struct CreateBoardMember {
    /// Board ID
    pub board_id: i64,

    /// User ID
    pub user_id: i64,

    /// Role to grant
    pub role: BoardRole,
}

impl BoardMember {
    /// Adds a user to a board
    ///
    /// # Errors
    ///
    /// An existing membership surfaces as a primary-key violation.
    pub async fn create(pool: &PgPool, data: CreateBoardMember) -> Result<Self, sqlx::Error> {
        let mut conn = pool.acquire().await?;
        Self::insert(&mut *conn, data).await
    }

    pub(crate) async fn insert(
        conn: &mut PgConnection,
        data: CreateBoardMember,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, BoardMember>(
            r#"
            INSERT INTO board_members (board_id, user_id, role)
            VALUES ($1, $2, $3)
            RETURNING board_id, user_id, role, created_at
            "#,
        )
        .bind(data.board_id)
        .bind(data.user_id)
        .bind(data.role)
        .fetch_one(conn)
        .await
    }

    /// A user's role on a board, if they are a member
    pub async fn get_role(
        pool: &PgPool,
        board_id: i64,
        user_id: i64,
    ) -> Result<Option<BoardRole>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT role FROM board_members WHERE board_id = $1 AND user_id = $2",
        )
        .bind(board_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
    }

    /// Whether a user belongs to a board (any role)
    pub async fn is_member(pool: &PgPool, board_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        Ok(Self::get_role(pool, board_id, user_id).await?.is_some())
    }

    /// Members of a board with their profiles, owner first
    pub async fn list_by_board(pool: &PgPool, board_id: i64) -> Result<Vec<MemberProfile>, sqlx::Error> {
        sqlx::query_as::<_, MemberProfile>(
            r#"
            SELECT u.id AS user_id, u.email, u.name, m.role
            FROM board_members m
            JOIN users u ON u.id = m.user_id
            WHERE m.board_id = $1
            ORDER BY m.role ASC, m.created_at ASC
            "#,
        )
        .bind(board_id)
        .fetch_all(pool)
        .await
    }
}
