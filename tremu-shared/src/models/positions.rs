//! Row-level plumbing for [`OrderedCollection`]: locking a parent, loading
//! its children in order, and writing changed positions back.
//!
//! Every function here runs on a connection that is already inside a
//! transaction.

use sqlx::PgConnection;
use tracing::debug;

use crate::ordering::{ItemId, OrderedCollection};

/// A table whose rows are densely ordered under a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OrderedTable {
    /// `columns`, ordered per `board_id`
    Columns,

    /// `tasks`, ordered per `column_id`
    Tasks,
}

impl OrderedTable {
    fn table(self) -> &'static str {
        match self {
            OrderedTable::Columns => "columns",
            OrderedTable::Tasks => "tasks",
        }
    }

    fn parent_table(self) -> &'static str {
        match self {
            OrderedTable::Columns => "boards",
            OrderedTable::Tasks => "columns",
        }
    }

    fn parent_key(self) -> &'static str {
        match self {
            OrderedTable::Columns => "board_id",
            OrderedTable::Tasks => "column_id",
        }
    }
}

/// Locks the parent row so ordering changes on one parent are serialized
///
/// Returns `false` when the parent no longer exists.
pub(crate) async fn lock_parent(
    conn: &mut PgConnection,
    table: OrderedTable,
    parent_id: i64,
) -> Result<bool, sqlx::Error> {
    let sql = format!("SELECT id FROM {} WHERE id = $1 FOR UPDATE", table.parent_table());

    let row: Option<i64> = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.is_some())
}

/// Takes a shared lock on a board row
///
/// Task mutations hold it before locking any column. Column mutations lock
/// the board exclusively through [`lock_parent`], so the two kinds never
/// interleave on one board. Returns `false` when the board no longer exists.
pub(crate) async fn share_board(conn: &mut PgConnection, board_id: i64) -> Result<bool, sqlx::Error> {
    let row: Option<i64> = sqlx::query_scalar("SELECT id FROM boards WHERE id = $1 FOR SHARE")
        .bind(board_id)
        .fetch_optional(conn)
        .await?;

    Ok(row.is_some())
}

/// Loads the ids of a parent's children sorted by position
pub(crate) async fn load_siblings(
    conn: &mut PgConnection,
    table: OrderedTable,
    parent_id: i64,
) -> Result<OrderedCollection, sqlx::Error> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = $1 ORDER BY position ASC, id ASC",
        table.table(),
        table.parent_key(),
    );

    let ids: Vec<ItemId> = sqlx::query_scalar(&sql)
        .bind(parent_id)
        .fetch_all(conn)
        .await?;

    Ok(OrderedCollection::from_ids(ids))
}

/// Writes new positions for the given rows
pub(crate) async fn write_positions(
    conn: &mut PgConnection,
    table: OrderedTable,
    changes: &[(ItemId, i32)],
) -> Result<(), sqlx::Error> {
    if changes.is_empty() {
        return Ok(());
    }

    let sql = format!("UPDATE {} SET position = $2 WHERE id = $1", table.table());

    for (id, position) in changes {
        sqlx::query(&sql)
            .bind(id)
            .bind(position)
            .execute(&mut *conn)
            .await?;
    }

    debug!(table = table.table(), rows = changes.len(), "Positions rewritten");
    Ok(())
}
