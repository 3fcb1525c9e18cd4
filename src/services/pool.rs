//! Surplus pool service
//!
//! Operator-facing view of the quota ledger: balance reads, manual donations
//! and the locked allocate used when drawing the pool down outside a
//! confirmation (e.g. back-office corrections).

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::info;

use crate::database::repositories::{event, ledger};
use crate::database::repositories::LedgerRepository;
use crate::models::ledger::{LedgerEntry, LedgerEntryType};
use crate::utils::errors::{QueueBuddyError, Result};
use crate::utils::logging::log_ledger_entry;

/// Attribution recorded for manual operator donations
const SYSTEM_ATTRIBUTION: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolBalance {
    pub event_id: i64,
    pub pool: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolDiagnostics {
    pub event_id: i64,
    pub pool: i64,
    pub last: Vec<LedgerEntry>,
}

#[derive(Clone)]
pub struct PoolService {
    db: PgPool,
    ledger: LedgerRepository,
}

impl PoolService {
    pub fn new(db: PgPool) -> Self {
        Self {
            ledger: LedgerRepository::new(db.clone()),
            db,
        }
    }

    /// Current pool balance; 0 for an empty ledger
    pub async fn balance(&self, event_id: i64) -> Result<PoolBalance> {
        let pool = self.ledger.balance(event_id).await?;
        Ok(PoolBalance { event_id, pool })
    }

    /// Manual donation into the pool, attributed to the operator
    pub async fn donate(&self, event_id: i64, amount: i32) -> Result<PoolBalance> {
        if amount < 1 {
            return Err(QueueBuddyError::InvalidInput(
                "donation amount must be positive".to_string()
            ));
        }

        let mut tx = self.db.begin().await?;
        event::lock_for_update(&mut tx, event_id).await?;
        ledger::record(&mut tx, event_id, LedgerEntryType::Donate, amount, SYSTEM_ATTRIBUTION, None).await?;
        tx.commit().await?;

        log_ledger_entry(event_id, "DONATE", amount, SYSTEM_ATTRIBUTION);
        self.balance(event_id).await
    }

    /// Draw the pool down by `amount`, checked and written under the event
    /// row lock so concurrent draws can never push the balance negative.
    pub async fn allocate(&self, event_id: i64, amount: i32, email: &str, ref_request_id: Option<i64>) -> Result<PoolBalance> {
        if amount < 1 {
            return Err(QueueBuddyError::InvalidInput(
                "allocation amount must be positive".to_string()
            ));
        }

        let mut tx = self.db.begin().await?;
        event::lock_for_update(&mut tx, event_id).await?;

        let available = ledger::balance(&mut tx, event_id).await?;
        if available < amount as i64 {
            return Err(QueueBuddyError::PoolInsufficient { requested: amount, available });
        }

        ledger::record(&mut tx, event_id, LedgerEntryType::Allocate, amount, email, ref_request_id).await?;
        let pool = ledger::balance(&mut tx, event_id).await?;
        tx.commit().await?;

        log_ledger_entry(event_id, "ALLOCATE", amount, email);
        info!(event_id = event_id, amount = amount, pool = pool, "Pool allocation recorded");
        Ok(PoolBalance { event_id, pool })
    }

    /// Balance plus the most recent entries, for operator debugging
    pub async fn diagnostics(&self, event_id: i64) -> Result<PoolDiagnostics> {
        let pool = self.ledger.balance(event_id).await?;
        let last = self.ledger.recent(event_id, 5).await?;

        Ok(PoolDiagnostics { event_id, pool, last })
    }
}
