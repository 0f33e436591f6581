/// Database models for Tremu
///
/// Each model owns its table's queries. Columns and tasks additionally keep
/// their `position` dense per parent: every mutation that affects ordering
/// runs in one transaction that locks the parent row, loads the siblings into
/// an [`OrderedCollection`](crate::ordering::OrderedCollection), applies the
/// change and writes back only the rows whose position moved.
///
/// # Models
///
/// - `user`: accounts
/// - `board`: boards, created together with their owner membership
/// - `board_member`: who may see a board, and with which role
/// - `column`: ordered columns within a board
/// - `task`: ordered tasks within a column
///
/// # Example
///
/// ```no_run
/// use tremu_shared::db::pool::{create_pool, DatabaseConfig};
/// use tremu_shared::models::column::Column;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new("postgresql://localhost/tremu")).await?;
///
/// // Move column 12 to the front of its board
/// let columns = Column::reorder(&pool, 12, 0).await?;
/// assert_eq!(columns[0].id, 12);
/// # Ok(())
/// # }
/// ```

pub mod board;
pub mod board_member;
pub mod column;
pub mod task;
pub mod user;

mod positions;

use crate::ordering::OrderingError;

/// Error type for operations that change ordering
#[derive(Debug, thiserror::Error)]
pub enum ReorderError {
    /// The row, or the parent it belongs to, no longer exists
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The destination column belongs to a different board
    #[error("target column belongs to a different board")]
    CrossBoard,

    /// The requested order is invalid for the collection
    #[error(transparent)]
    Ordering(#[from] OrderingError),

    /// The task kept changing column while its columns were being locked
    #[error("task is being moved concurrently")]
    Contended,

    /// Database failure
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}
