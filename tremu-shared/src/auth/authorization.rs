/// Board-level authorization
///
/// # Permission Model
///
/// 1. **Membership**: only members of a board may see or touch anything on it
/// 2. **Role**: structural changes (columns, invites, deleting the board) are
///    reserved for the owner; members work on tasks and rename columns
///
/// # Example
///
/// ```no_run
/// use tremu_shared::auth::authorization::{require_membership, BoardPermission};
/// use tremu_shared::auth::middleware::AuthContext;
/// use sqlx::PgPool;
///
/// async fn can_reorder(
///     pool: &PgPool,
///     auth: &AuthContext,
///     board_id: i64,
/// ) -> Result<(), Box<dyn std::error::Error>> {
///     let access = require_membership(pool, board_id, auth.user_id).await?;
///     access.require(BoardPermission::ManageColumns)?;
///     Ok(())
/// }
/// ```

use sqlx::PgPool;

use crate::models::board_member::{BoardMember, BoardRole};

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// User is not a member of the board
    #[error("Not a member of board {0}")]
    NotMember(i64),

    /// Member lacks the role for this action
    #[error("Only the board owner can {0}")]
    OwnerOnly(&'static str),

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

/// Actions that need more than plain membership
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardPermission {
    /// Create, delete or reorder columns
    ManageColumns,

    /// Invite users
    Invite,

    /// Delete the board
    DeleteBoard,
}

impl BoardPermission {
    fn granted_to(self, role: BoardRole) -> bool {
        match self {
            BoardPermission::ManageColumns => role.can_manage_columns(),
            BoardPermission::Invite => role.can_invite(),
            BoardPermission::DeleteBoard => role.can_delete_board(),
        }
    }

    fn describe(self) -> &'static str {
        match self {
            BoardPermission::ManageColumns => "manage columns",
            BoardPermission::Invite => "invite members",
            BoardPermission::DeleteBoard => "delete the board",
        }
    }
}

/// Proof that a user is a member of a board, with their role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardAccess {
    /// Board ID
    pub board_id: i64,

    /// Caller's role on it
    pub role: BoardRole,
}

impl BoardAccess {
    /// Checks the role against an action
    pub fn require(&self, permission: BoardPermission) -> Result<(), AuthzError> {
        if !permission.granted_to(self.role) {
            return Err(AuthzError::OwnerOnly(permission.describe()));
        }

        Ok(())
    }
}

/// Checks that a user belongs to a board
pub async fn require_membership(
    pool: &PgPool,
    board_id: i64,
    user_id: i64,
) -> Result<BoardAccess, AuthzError> {
    let role = BoardMember::get_role(pool, board_id, user_id)
        .await?
        .ok_or(AuthzError::NotMember(board_id))?;

    Ok(BoardAccess { board_id, role })
}

/// Checks that a user owns a board
pub async fn require_owner(
    pool: &PgPool,
    board_id: i64,
    user_id: i64,
    permission: BoardPermission,
) -> Result<BoardAccess, AuthzError> {
    let access = require_membership(pool, board_id, user_id).await?;
    access.require(permission)?;
    Ok(access)
}
