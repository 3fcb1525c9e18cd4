//! Registration request model

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Where a registrant comes from: pre-registered quota holder, unregistered
/// walk-in, or promotional/contest entrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_source")]
pub enum RequestSource {
    #[sqlx(rename = "MASTER")]
    #[serde(rename = "MASTER")]
    Master,
    #[sqlx(rename = "WALKIN")]
    #[serde(rename = "WALKIN")]
    Walkin,
    #[sqlx(rename = "GIMMICK")]
    #[serde(rename = "GIMMICK")]
    Gimmick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "request_status")]
pub enum RequestStatus {
    #[sqlx(rename = "PENDING")]
    #[serde(rename = "PENDING")]
    Pending,
    #[sqlx(rename = "CONFIRMED")]
    #[serde(rename = "CONFIRMED")]
    Confirmed,
    #[sqlx(rename = "CANCELLED")]
    #[serde(rename = "CANCELLED")]
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RegistrationRequest {
    pub id: i64,
    pub event_id: i64,
    pub email: String,
    pub name: String,
    pub wa: Option<String>,
    pub source: RequestSource,
    pub status: RequestStatus,
    /// Snapshot taken at submission time, re-verified at confirmation
    pub is_master_match: bool,
    pub master_quota: i32,
    pub issued_before: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationRequest {
    /// Quota still usable according to the submission-time snapshot.
    /// Display/audit only; confirmation re-checks live numbers.
    pub fn quota_remaining(&self) -> i32 {
        (self.master_quota - self.issued_before).max(0)
    }
}

/// Intake input supplied by the external HTTP layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRequestInput {
    pub event_id: i64,
    pub email: String,
    pub name: String,
    pub wa: Option<String>,
    pub source: Option<RequestSource>,
}
