//! Queue service — ticket lifecycle and slot allocation
//!
//! Drives tickets through QUEUED -> IN_PROCESS -> DONE with DEFERRED/recall
//! detours, and assigns the fixed serving slots 1..=N. Every mutating
//! operation runs in one transaction and takes the event row lock first, so
//! concurrent admin actions against the same event serialize cleanly; the
//! partial unique index on (event_id, slot_no) is the database-level backstop.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::config::QueueConfig;
use crate::database::repositories::{event, ticket};
use crate::database::repositories::ticket::{TicketRef, TicketRepository};
use crate::models::ticket::{TicketStatus, TicketSummary};
use crate::utils::errors::{QueueBuddyError, Result};
use crate::utils::logging::log_ticket_transition;

/// Why a promote call moved fewer tickets than the slot capacity.
/// Both reasons are success responses; callers poll promote repeatedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    #[serde(rename = "no-free-slot")]
    NoFreeSlot,
    #[serde(rename = "queue-empty")]
    QueueEmpty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoteOutcome {
    pub promoted: usize,
    pub codes: Vec<String>,
    pub reason: Option<HaltReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipOutcome {
    pub id: i64,
    pub code: String,
    pub new_status: TicketStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallOutcome {
    pub id: i64,
    pub code: String,
    pub new_status: TicketStatus,
    pub slot_no: Option<i32>,
    pub reason: Option<HaltReason>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoneOutcome {
    pub id: i64,
    pub code: String,
    pub new_status: TicketStatus,
    pub processing_ms: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardTotals {
    pub active: i64,
    pub queued: i64,
    pub deferred: i64,
    pub done: i64,
    pub queue_batches: i64,
}

/// Read-only snapshot for TV boards and admin consoles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSnapshot {
    pub active: Vec<TicketSummary>,
    pub queue: Vec<TicketSummary>,
    pub skip_grid: Vec<TicketSummary>,
    pub next: Vec<TicketSummary>,
    pub totals: BoardTotals,
}

/// Free slot numbers in 1..=capacity given the occupied ones
fn free_slots(used: &[i32], capacity: i32) -> Vec<i32> {
    (1..=capacity).filter(|slot| !used.contains(slot)).collect()
}

#[derive(Clone)]
pub struct QueueService {
    pool: PgPool,
    tickets: TicketRepository,
    config: QueueConfig,
}

impl QueueService {
    pub fn new(pool: PgPool, config: QueueConfig) -> Self {
        let tickets = TicketRepository::new(pool.clone());
        Self { pool, tickets, config }
    }

    /// Fill free serving slots from the backlog, FIFO by queue_order.
    ///
    /// Pairs the oldest queued tickets with the lowest free slots. Never
    /// promotes more tickets than there are free slots.
    pub async fn promote(&self, event_id: i64) -> Result<PromoteOutcome> {
        let mut tx = self.pool.begin().await?;
        event::lock_for_update(&mut tx, event_id).await?;

        let used = ticket::used_slots(&mut tx, event_id).await?;
        let free = free_slots(&used, self.config.active_slots);
        if free.is_empty() {
            debug!(event_id = event_id, "Promote found no free slot");
            return Ok(PromoteOutcome {
                promoted: 0,
                codes: vec![],
                reason: Some(HaltReason::NoFreeSlot),
            });
        }

        let picks = ticket::pick_queued(&mut tx, event_id, free.len() as i64).await?;
        if picks.is_empty() {
            debug!(event_id = event_id, "Promote found an empty backlog");
            return Ok(PromoteOutcome {
                promoted: 0,
                codes: vec![],
                reason: Some(HaltReason::QueueEmpty),
            });
        }

        for (pick, slot) in picks.iter().zip(free.iter()) {
            ticket::assign_slot(&mut tx, pick.id, *slot).await?;
            log_ticket_transition(event_id, &pick.code, TicketStatus::Queued, TicketStatus::InProcess, Some(*slot));
        }

        tx.commit().await?;

        let codes: Vec<String> = picks.iter().map(|p| p.code.clone()).collect();
        info!(event_id = event_id, promoted = picks.len(), "Promoted backlog into serving slots");
        Ok(PromoteOutcome { promoted: picks.len(), codes, reason: None })
    }

    /// Interrupt service: IN_PROCESS -> DEFERRED, freeing the slot
    pub async fn skip(&self, event_id: i64, reference: &str) -> Result<SkipOutcome> {
        let reference = TicketRef::parse(reference)?;

        let mut tx = self.pool.begin().await?;
        let t = ticket::find_by_ref(&mut tx, event_id, &reference)
            .await?
            .ok_or_else(|| QueueBuddyError::TicketNotFound { reference: reference.code.clone() })?;

        if t.status != TicketStatus::InProcess {
            return Err(QueueBuddyError::InvalidState {
                code: t.code,
                status: t.status.to_string(),
                required: "IN_PROCESS",
            });
        }

        ticket::mark_deferred(&mut tx, t.id).await?;
        tx.commit().await?;

        log_ticket_transition(event_id, &t.code, TicketStatus::InProcess, TicketStatus::Deferred, None);
        Ok(SkipOutcome { id: t.id, code: t.code, new_status: TicketStatus::Deferred })
    }

    /// Re-admit a DEFERRED/QUEUED ticket to serving.
    ///
    /// With no free slot a DEFERRED ticket is returned to the backlog
    /// (success, reason no-free-slot) while a QUEUED ticket fails; the
    /// asymmetry keeps skipped guests from being stranded in the holding
    /// area. Slots are never preempted.
    pub async fn recall(&self, event_id: i64, reference: &str) -> Result<RecallOutcome> {
        let reference = TicketRef::parse(reference)?;

        let mut tx = self.pool.begin().await?;
        event::lock_for_update(&mut tx, event_id).await?;

        let t = ticket::find_by_ref(&mut tx, event_id, &reference)
            .await?
            .ok_or_else(|| QueueBuddyError::TicketNotFound { reference: reference.code.clone() })?;

        if t.status != TicketStatus::Deferred && t.status != TicketStatus::Queued {
            return Err(QueueBuddyError::InvalidState {
                code: t.code,
                status: t.status.to_string(),
                required: "DEFERRED or QUEUED",
            });
        }

        let used = ticket::used_slots(&mut tx, event_id).await?;
        let free = free_slots(&used, self.config.active_slots);

        match free.first() {
            Some(&slot) => {
                ticket::assign_slot(&mut tx, t.id, slot).await?;
                tx.commit().await?;

                log_ticket_transition(event_id, &t.code, t.status, TicketStatus::InProcess, Some(slot));
                Ok(RecallOutcome {
                    id: t.id,
                    code: t.code,
                    new_status: TicketStatus::InProcess,
                    slot_no: Some(slot),
                    reason: None,
                })
            }
            None if t.status == TicketStatus::Deferred => {
                ticket::requeue(&mut tx, t.id).await?;
                tx.commit().await?;

                log_ticket_transition(event_id, &t.code, TicketStatus::Deferred, TicketStatus::Queued, None);
                Ok(RecallOutcome {
                    id: t.id,
                    code: t.code,
                    new_status: TicketStatus::Queued,
                    slot_no: None,
                    reason: Some(HaltReason::NoFreeSlot),
                })
            }
            None => Err(QueueBuddyError::NoFreeSlot { event_id }),
        }
    }

    /// Finish service: IN_PROCESS -> DONE, recording the elapsed service time
    pub async fn done(&self, event_id: i64, reference: &str) -> Result<DoneOutcome> {
        let reference = TicketRef::parse(reference)?;

        let mut tx = self.pool.begin().await?;
        let t = ticket::find_by_ref(&mut tx, event_id, &reference)
            .await?
            .ok_or_else(|| QueueBuddyError::TicketNotFound { reference: reference.code.clone() })?;

        if t.status != TicketStatus::InProcess {
            return Err(QueueBuddyError::InvalidState {
                code: t.code,
                status: t.status.to_string(),
                required: "IN_PROCESS",
            });
        }

        let processing_ms = ticket::mark_done(&mut tx, t.id).await?;
        tx.commit().await?;

        log_ticket_transition(event_id, &t.code, TicketStatus::InProcess, TicketStatus::Done, None);
        Ok(DoneOutcome { id: t.id, code: t.code, new_status: TicketStatus::Done, processing_ms })
    }

    /// Aggregated read-only board; safe at any concurrency level
    pub async fn board(&self, event_id: i64) -> Result<BoardSnapshot> {
        let (active, queue, skip_grid, next, counts) = futures::try_join!(
            self.tickets.serving(event_id),
            self.tickets.queued(event_id, None),
            self.tickets.deferred(event_id),
            self.tickets.queued(event_id, Some(self.config.preview_size)),
            self.tickets.status_counts(event_id),
        )?;

        let count_of = |status: TicketStatus| {
            counts
                .iter()
                .find(|(s, _)| *s == status)
                .map(|(_, n)| *n)
                .unwrap_or(0)
        };

        let queued = count_of(TicketStatus::Queued);
        let capacity = self.config.active_slots as i64;
        let totals = BoardTotals {
            active: count_of(TicketStatus::InProcess),
            queued,
            deferred: count_of(TicketStatus::Deferred),
            done: count_of(TicketStatus::Done),
            queue_batches: (queued + capacity - 1) / capacity,
        };

        Ok(BoardSnapshot { active, queue, skip_grid, next, totals })
    }
}
