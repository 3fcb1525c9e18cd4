//! Direct master registration
//!
//! Fast path for pre-registered quota holders: one call issues every ticket
//! the master entry still allows, skipping the request/confirm round-trip.
//! Walk-ins and gimmick entrants always go through intake.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::database::repositories::{counter, event, master, ticket};
use crate::models::ticket::{ticket_code, TicketIssue};
use crate::utils::errors::{QueueBuddyError, Result};
use crate::utils::logging::log_issuance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterOutcome {
    pub event_id: i64,
    pub email: String,
    /// Every ticket now held by this email for the event
    pub tickets: Vec<TicketIssue>,
    pub issued: i64,
    pub quota: i32,
    pub remaining: i64,
    /// Order range allocated by this call; `None` when quota was already used up
    pub allocated_range: Option<(i32, i32)>,
}

#[derive(Clone)]
pub struct RegisterService {
    pool: PgPool,
}

impl RegisterService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Issue all remaining quota tickets for a master email.
    ///
    /// Exhausted quota is a normal outcome, not an error: the caller gets the
    /// tickets already held so the front desk can re-print them. The issued
    /// count is read under the event row lock, in the same transaction that
    /// reserves orders and inserts tickets, so two simultaneous calls for the
    /// same email serialize and the second one sees the first one's tickets.
    pub async fn register(&self, event_id: i64, email: &str, wa: Option<&str>) -> Result<RegisterOutcome> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(QueueBuddyError::InvalidInput("email is required".to_string()));
        }

        let mut tx = self.pool.begin().await?;
        event::lock_for_update(&mut tx, event_id).await?;

        let ev = event::find_by_id(&mut tx, event_id)
            .await?
            .ok_or(QueueBuddyError::EventNotFound { event_id })?;
        let mu = master::find_by_email(&mut tx, &email)
            .await?
            .ok_or_else(|| QueueBuddyError::MasterNotFound { email: email.clone() })?;
        let name = mu.full_name();

        let issued = ticket::count_for_email(&mut tx, event_id, &email).await?;
        let remaining = mu.quota as i64 - issued;
        if remaining <= 0 {
            let tickets = ticket::for_email(&mut tx, event_id, &email).await?;
            tx.commit().await?;

            return Ok(RegisterOutcome {
                event_id,
                email,
                tickets,
                issued,
                quota: mu.quota,
                remaining: 0,
                allocated_range: None,
            });
        }

        let block = counter::reserve_block(&mut tx, event_id, remaining as i32).await?;
        for order in block.start..=block.end {
            let code = ticket_code(&ev.code_prefix, order);
            ticket::insert_issued(&mut tx, event_id, &code, &name, &email, wa, order).await?;
        }

        let tickets = ticket::for_email(&mut tx, event_id, &email).await?;
        tx.commit().await?;

        log_issuance(event_id, &email, remaining as i32, block.start, block.end);
        info!(event_id = event_id, email = %email, issued = remaining, "Direct registration issued tickets");

        Ok(RegisterOutcome {
            event_id,
            email,
            issued: issued + remaining,
            quota: mu.quota,
            remaining: 0,
            tickets,
            allocated_range: Some((block.start, block.end)),
        })
    }
}
