//! Event repository implementation

use sqlx::{PgConnection, PgPool};
use chrono::Utc;
use crate::models::event::{Event, CreateEventRequest};
use crate::utils::errors::QueueBuddyError;

#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new event
    pub async fn create(&self, request: CreateEventRequest) -> Result<Event, QueueBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            r#"
            INSERT INTO events (name, code_prefix, starts_at, ends_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, name, code_prefix, starts_at, ends_at, created_at, updated_at
            "#
        )
        .bind(request.name)
        .bind(request.code_prefix)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(Utc::now())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }

    /// Find event by ID
    pub async fn find_by_id(&self, id: i64) -> Result<Option<Event>, QueueBuddyError> {
        let event = sqlx::query_as::<_, Event>(
            "SELECT id, name, code_prefix, starts_at, ends_at, created_at, updated_at FROM events WHERE id = $1"
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    /// List events, newest first
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Event>, QueueBuddyError> {
        let events = sqlx::query_as::<_, Event>(
            "SELECT id, name, code_prefix, starts_at, ends_at, created_at, updated_at FROM events ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }
}

/// Lock the event row for the duration of the caller's transaction.
///
/// Serializes slot assignment and pool draws per event; fails with
/// `EventNotFound` when the event is absent.
pub async fn lock_for_update(conn: &mut PgConnection, event_id: i64) -> Result<(), QueueBuddyError> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM events WHERE id = $1 FOR UPDATE")
        .bind(event_id)
        .fetch_optional(conn)
        .await?;

    match row {
        Some(_) => Ok(()),
        None => Err(QueueBuddyError::EventNotFound { event_id }),
    }
}

/// Load the event inside the caller's transaction
pub async fn find_by_id(conn: &mut PgConnection, event_id: i64) -> Result<Option<Event>, QueueBuddyError> {
    let event = sqlx::query_as::<_, Event>(
        "SELECT id, name, code_prefix, starts_at, ends_at, created_at, updated_at FROM events WHERE id = $1"
    )
    .bind(event_id)
    .fetch_optional(conn)
    .await?;

    Ok(event)
}
