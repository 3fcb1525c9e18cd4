//! Ticket model and lifecycle states

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Ticket lifecycle status.
///
/// QUEUED tickets wait in the backlog ordered by `queue_order`; IN_PROCESS
/// tickets occupy exactly one serving slot; DEFERRED tickets sit in a holding
/// area until recalled; DONE is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ticket_status")]
pub enum TicketStatus {
    #[sqlx(rename = "QUEUED")]
    #[serde(rename = "QUEUED")]
    Queued,
    #[sqlx(rename = "IN_PROCESS")]
    #[serde(rename = "IN_PROCESS")]
    InProcess,
    #[sqlx(rename = "DEFERRED")]
    #[serde(rename = "DEFERRED")]
    Deferred,
    #[sqlx(rename = "DONE")]
    #[serde(rename = "DONE")]
    Done,
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TicketStatus::Queued => "QUEUED",
            TicketStatus::InProcess => "IN_PROCESS",
            TicketStatus::Deferred => "DEFERRED",
            TicketStatus::Done => "DONE",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: i64,
    pub event_id: i64,
    pub code: String,
    pub name: String,
    pub email: Option<String>,
    pub wa: Option<String>,
    pub status: TicketStatus,
    /// Monotonic per-event sequence number, assigned once and never reused
    pub queue_order: i32,
    /// Occupied serving slot, set only while IN_PROCESS
    pub slot_no: Option<i32>,
    pub in_process_at: Option<DateTime<Utc>>,
    pub processing_ms: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact ticket row for board listings
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: TicketStatus,
    pub queue_order: i32,
    pub slot_no: Option<i32>,
}

/// Issued-ticket view returned from registration flows
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketIssue {
    pub code: String,
    pub queue_order: i32,
    pub status: TicketStatus,
}

/// Format the human-readable ticket code printed on physical tickets.
///
/// The order number is zero-padded to three digits; larger orders keep their
/// full width.
pub fn ticket_code(prefix: &str, order: i32) -> String {
    format!("{}-{:03}", prefix, order)
}
