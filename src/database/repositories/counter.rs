//! Queue counter repository — the sequence allocator
//!
//! Every event owns one counter row holding `next_order`. Order numbers are
//! handed out in contiguous blocks through a single atomic increment-and-return
//! statement, so concurrent reservations can never overlap.

use sqlx::{PgConnection, PgPool};
use crate::utils::errors::QueueBuddyError;

/// A reserved, contiguous range of order numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBlock {
    pub start: i32,
    pub end: i32,
    /// Counter value after the reservation
    pub next_order: i32,
}

impl OrderBlock {
    pub fn len(&self) -> i32 {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }
}

#[derive(Debug, Clone)]
pub struct CounterRepository {
    pool: PgPool,
}

impl CounterRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Seed the counter for an event. Idempotent; an existing counter is
    /// left untouched so the sequence never restarts.
    pub async fn seed(&self, event_id: i64, first_order: i32) -> Result<(), QueueBuddyError> {
        sqlx::query(
            r#"
            INSERT INTO queue_counters (event_id, next_order)
            VALUES ($1, $2)
            ON CONFLICT (event_id) DO NOTHING
            "#
        )
        .bind(event_id)
        .bind(first_order)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Read the next order number without reserving anything
    pub async fn peek(&self, event_id: i64) -> Result<Option<i32>, QueueBuddyError> {
        let row: Option<(i32,)> = sqlx::query_as(
            "SELECT next_order FROM queue_counters WHERE event_id = $1"
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.0))
    }
}

/// Atomically reserve a contiguous block of `count` order numbers for an
/// event, inside the caller's transaction.
///
/// The single UPDATE .. RETURNING both advances and reads the counter, and
/// the row lock it takes serializes concurrent reservations for the same
/// event. A missing counter row is a setup error, not a runtime condition.
pub async fn reserve_block(
    conn: &mut PgConnection,
    event_id: i64,
    count: i32,
) -> Result<OrderBlock, QueueBuddyError> {
    if count < 1 {
        return Err(QueueBuddyError::InvalidInput(
            format!("cannot reserve a block of {} order numbers", count)
        ));
    }

    let row: Option<(i32,)> = sqlx::query_as(
        r#"
        UPDATE queue_counters
        SET next_order = next_order + $2
        WHERE event_id = $1
        RETURNING next_order
        "#
    )
    .bind(event_id)
    .bind(count)
    .fetch_optional(conn)
    .await?;

    let next_order = row
        .map(|r| r.0)
        .ok_or(QueueBuddyError::CounterNotSeeded { event_id })?;

    Ok(OrderBlock {
        start: next_order - count,
        end: next_order - 1,
        next_order,
    })
}
