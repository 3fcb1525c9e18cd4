//! Surplus ledger repository — the quota ledger
//!
//! Append-only DONATE/ALLOCATE entries per event. The pool balance is
//! computed at read time; allocations must be balance-checked inside the same
//! transaction that writes the entry (see `services::pool` and
//! `services::intake::confirm`).

use sqlx::{PgConnection, PgPool};
use crate::models::ledger::{LedgerEntry, LedgerEntryType};
use crate::utils::errors::QueueBuddyError;

#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Pool balance for an event: sum(DONATE) - sum(ALLOCATE), 0 when the
    /// ledger is empty
    pub async fn balance(&self, event_id: i64) -> Result<i64, QueueBuddyError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(CASE
                WHEN entry_type = 'DONATE' THEN amount
                WHEN entry_type = 'ALLOCATE' THEN -amount
                ELSE 0 END), 0)::BIGINT
            FROM surplus_ledger
            WHERE event_id = $1
            "#
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    /// Most recent entries, newest first
    pub async fn recent(&self, event_id: i64, limit: i64) -> Result<Vec<LedgerEntry>, QueueBuddyError> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, event_id, entry_type, amount, email, ref_request_id, created_at
            FROM surplus_ledger
            WHERE event_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        )
        .bind(event_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

/// Pool balance computed inside the caller's transaction
pub async fn balance(conn: &mut PgConnection, event_id: i64) -> Result<i64, QueueBuddyError> {
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(CASE
            WHEN entry_type = 'DONATE' THEN amount
            WHEN entry_type = 'ALLOCATE' THEN -amount
            ELSE 0 END), 0)::BIGINT
        FROM surplus_ledger
        WHERE event_id = $1
        "#
    )
    .bind(event_id)
    .fetch_one(conn)
    .await?;

    Ok(row.0)
}

/// Append an immutable ledger entry inside the caller's transaction.
///
/// ALLOCATE callers are responsible for checking the balance first, under
/// the same transaction's event row lock.
pub async fn record(
    conn: &mut PgConnection,
    event_id: i64,
    entry_type: LedgerEntryType,
    amount: i32,
    email: &str,
    ref_request_id: Option<i64>,
) -> Result<(), QueueBuddyError> {
    if amount < 1 {
        return Err(QueueBuddyError::InvalidInput(
            format!("ledger amount must be positive, got {}", amount)
        ));
    }

    sqlx::query(
        r#"
        INSERT INTO surplus_ledger (event_id, entry_type, amount, email, ref_request_id, created_at)
        VALUES ($1, $2, $3, $4, $5, NOW())
        "#
    )
    .bind(event_id)
    .bind(entry_type)
    .bind(amount)
    .bind(email)
    .bind(ref_request_id)
    .execute(conn)
    .await?;

    Ok(())
}
