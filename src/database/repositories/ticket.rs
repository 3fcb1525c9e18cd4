//! Ticket repository implementation
//!
//! Pool-based reads cover the board; the transaction-scoped free functions
//! cover lifecycle mutations and issuance, which always run inside one
//! transaction held by the calling service.

use sqlx::{PgConnection, PgPool};
use crate::models::ticket::{Ticket, TicketIssue, TicketStatus, TicketSummary};
use crate::utils::errors::QueueBuddyError;

const TICKET_COLUMNS: &str =
    "id, event_id, code, name, email, wa, status, queue_order, slot_no, in_process_at, processing_ms, created_at, updated_at";

/// Parsed operator-facing ticket reference.
///
/// Codes are the operator-facing identifier, so code lookup is the default;
/// a purely numeric token is additionally tried as an id. When both match,
/// the code match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketRef {
    pub code: String,
    pub id: Option<i64>,
}

impl TicketRef {
    pub fn parse(raw: &str) -> Result<Self, QueueBuddyError> {
        let token = raw.trim();
        if token.is_empty() {
            return Err(QueueBuddyError::InvalidInput(
                "ticket reference must not be empty".to_string()
            ));
        }

        let id = if token.contains('-') {
            None
        } else {
            token.parse::<i64>().ok()
        };

        Ok(Self { code: token.to_uppercase(), id })
    }
}

#[derive(Debug, Clone)]
pub struct TicketRepository {
    pool: PgPool,
}

impl TicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Serving tickets ordered by slot
    pub async fn serving(&self, event_id: i64) -> Result<Vec<TicketSummary>, QueueBuddyError> {
        let rows = sqlx::query_as::<_, TicketSummary>(
            r#"
            SELECT id, code, name, status, queue_order, slot_no
            FROM tickets
            WHERE event_id = $1 AND status = 'IN_PROCESS'
            ORDER BY slot_no ASC, queue_order ASC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Queued backlog ordered by queue_order; `limit` trims to a preview
    pub async fn queued(&self, event_id: i64, limit: Option<i64>) -> Result<Vec<TicketSummary>, QueueBuddyError> {
        let rows = sqlx::query_as::<_, TicketSummary>(
            r#"
            SELECT id, code, name, status, queue_order, slot_no
            FROM tickets
            WHERE event_id = $1 AND status = 'QUEUED'
            ORDER BY queue_order ASC
            LIMIT $2
            "#
        )
        .bind(event_id)
        .bind(limit.unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Deferred holding area, most recently skipped first
    pub async fn deferred(&self, event_id: i64) -> Result<Vec<TicketSummary>, QueueBuddyError> {
        let rows = sqlx::query_as::<_, TicketSummary>(
            r#"
            SELECT id, code, name, status, queue_order, slot_no
            FROM tickets
            WHERE event_id = $1 AND status = 'DEFERRED'
            ORDER BY updated_at DESC
            "#
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Per-status ticket counts for an event
    pub async fn status_counts(&self, event_id: i64) -> Result<Vec<(TicketStatus, i64)>, QueueBuddyError> {
        let rows: Vec<(TicketStatus, i64)> = sqlx::query_as(
            "SELECT status, COUNT(*) FROM tickets WHERE event_id = $1 GROUP BY status"
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// All tickets held by an email for an event, order ascending
    pub async fn for_email(&self, event_id: i64, email: &str) -> Result<Vec<TicketIssue>, QueueBuddyError> {
        let rows = sqlx::query_as::<_, TicketIssue>(
            r#"
            SELECT code, queue_order, status
            FROM tickets
            WHERE event_id = $1 AND email = $2
            ORDER BY queue_order ASC
            "#
        )
        .bind(event_id)
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Count of tickets already issued to an email for an event
    pub async fn count_for_email(&self, event_id: i64, email: &str) -> Result<i64, QueueBuddyError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND email = $2"
        )
        .bind(event_id)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }
}

/// Resolve a ticket by reference and lock its row for the transaction.
/// Code match wins over id match when both hit.
pub async fn find_by_ref(
    conn: &mut PgConnection,
    event_id: i64,
    reference: &TicketRef,
) -> Result<Option<Ticket>, QueueBuddyError> {
    let ticket = sqlx::query_as::<_, Ticket>(&format!(
        r#"
        SELECT {TICKET_COLUMNS}
        FROM tickets
        WHERE event_id = $1 AND (code = $2 OR ($3::BIGINT IS NOT NULL AND id = $3))
        ORDER BY (code = $2) DESC
        LIMIT 1
        FOR UPDATE
        "#
    ))
    .bind(event_id)
    .bind(&reference.code)
    .bind(reference.id)
    .fetch_optional(conn)
    .await?;

    Ok(ticket)
}

/// Slot numbers currently occupied by serving tickets
pub async fn used_slots(conn: &mut PgConnection, event_id: i64) -> Result<Vec<i32>, QueueBuddyError> {
    let rows: Vec<(i32,)> = sqlx::query_as(
        r#"
        SELECT slot_no FROM tickets
        WHERE event_id = $1 AND status = 'IN_PROCESS' AND slot_no IS NOT NULL
        ORDER BY slot_no ASC
        "#
    )
    .bind(event_id)
    .fetch_all(conn)
    .await?;

    Ok(rows.into_iter().map(|r| r.0).collect())
}

/// Oldest queued tickets, locked for promotion
pub async fn pick_queued(
    conn: &mut PgConnection,
    event_id: i64,
    limit: i64,
) -> Result<Vec<TicketSummary>, QueueBuddyError> {
    let rows = sqlx::query_as::<_, TicketSummary>(
        r#"
        SELECT id, code, name, status, queue_order, slot_no
        FROM tickets
        WHERE event_id = $1 AND status = 'QUEUED'
        ORDER BY queue_order ASC
        LIMIT $2
        FOR UPDATE
        "#
    )
    .bind(event_id)
    .bind(limit)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// QUEUED/DEFERRED -> IN_PROCESS, occupying the given slot
pub async fn assign_slot(conn: &mut PgConnection, ticket_id: i64, slot_no: i32) -> Result<(), QueueBuddyError> {
    sqlx::query(
        r#"
        UPDATE tickets
        SET status = 'IN_PROCESS', slot_no = $2, in_process_at = NOW(), updated_at = NOW()
        WHERE id = $1
        "#
    )
    .bind(ticket_id)
    .bind(slot_no)
    .execute(conn)
    .await?;

    Ok(())
}

/// IN_PROCESS -> DEFERRED, freeing the slot
pub async fn mark_deferred(conn: &mut PgConnection, ticket_id: i64) -> Result<(), QueueBuddyError> {
    sqlx::query(
        "UPDATE tickets SET status = 'DEFERRED', slot_no = NULL, updated_at = NOW() WHERE id = $1"
    )
    .bind(ticket_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// DEFERRED -> QUEUED, returning the ticket to the backlog
pub async fn requeue(conn: &mut PgConnection, ticket_id: i64) -> Result<(), QueueBuddyError> {
    sqlx::query(
        "UPDATE tickets SET status = 'QUEUED', slot_no = NULL, updated_at = NOW() WHERE id = $1"
    )
    .bind(ticket_id)
    .execute(conn)
    .await?;

    Ok(())
}

/// IN_PROCESS -> DONE, freeing the slot and recording the service time
pub async fn mark_done(conn: &mut PgConnection, ticket_id: i64) -> Result<Option<i64>, QueueBuddyError> {
    let row: (Option<i64>,) = sqlx::query_as(
        r#"
        UPDATE tickets
        SET status = 'DONE',
            slot_no = NULL,
            processing_ms = CASE
                WHEN in_process_at IS NOT NULL
                THEN (EXTRACT(EPOCH FROM (NOW() - in_process_at)) * 1000)::BIGINT
                ELSE NULL END,
            updated_at = NOW()
        WHERE id = $1
        RETURNING processing_ms
        "#
    )
    .bind(ticket_id)
    .fetch_one(conn)
    .await?;

    Ok(row.0)
}

/// Insert one issued ticket as QUEUED. Conflicting codes are ignored so a
/// retried confirmation never duplicates tickets.
pub async fn insert_issued(
    conn: &mut PgConnection,
    event_id: i64,
    code: &str,
    name: &str,
    email: &str,
    wa: Option<&str>,
    queue_order: i32,
) -> Result<(), QueueBuddyError> {
    sqlx::query(
        r#"
        INSERT INTO tickets (event_id, code, name, email, wa, status, queue_order, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, 'QUEUED', $6, NOW(), NOW())
        ON CONFLICT (event_id, code) DO NOTHING
        "#
    )
    .bind(event_id)
    .bind(code)
    .bind(name)
    .bind(email)
    .bind(wa)
    .bind(queue_order)
    .execute(conn)
    .await?;

    Ok(())
}

/// Issued-ticket count inside the caller's transaction
pub async fn count_for_email(conn: &mut PgConnection, event_id: i64, email: &str) -> Result<i64, QueueBuddyError> {
    let row: (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM tickets WHERE event_id = $1 AND email = $2"
    )
    .bind(event_id)
    .bind(email)
    .fetch_one(conn)
    .await?;

    Ok(row.0)
}

/// Ticket holdings for an email inside the caller's transaction
pub async fn for_email(conn: &mut PgConnection, event_id: i64, email: &str) -> Result<Vec<TicketIssue>, QueueBuddyError> {
    let rows = sqlx::query_as::<_, TicketIssue>(
        r#"
        SELECT code, queue_order, status
        FROM tickets
        WHERE event_id = $1 AND email = $2
        ORDER BY queue_order ASC
        "#
    )
    .bind(event_id)
    .bind(email)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}
