//! Surplus ledger model
//!
//! The ledger is append-only. The pool balance for an event is always
//! computed at read time as sum(DONATE) - sum(ALLOCATE); there is no
//! materialized running total to drift out of sync.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type")]
pub enum LedgerEntryType {
    #[sqlx(rename = "DONATE")]
    #[serde(rename = "DONATE")]
    Donate,
    #[sqlx(rename = "ALLOCATE")]
    #[serde(rename = "ALLOCATE")]
    Allocate,
}

impl std::fmt::Display for LedgerEntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerEntryType::Donate => write!(f, "DONATE"),
            LedgerEntryType::Allocate => write!(f, "ALLOCATE"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct LedgerEntry {
    pub id: i64,
    pub event_id: i64,
    pub entry_type: LedgerEntryType,
    pub amount: i32,
    pub email: String,
    pub ref_request_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}
