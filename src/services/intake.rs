//! Registration request intake and confirmation
//!
//! Intake deduplicates concurrent submissions for the same (event, email)
//! through the partial unique index on PENDING rows. Confirmation is the one
//! operation that touches everything at once: it locks the request row,
//! re-verifies quota or pool balance against live counts, reserves an order
//! block, inserts tickets and writes the matching ledger entry, all inside a
//! single transaction so no partial application can survive.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, info};

use crate::database::repositories::{counter, event, ledger, master, request, ticket};
use crate::database::repositories::request::{RegistrantFilter, RequestRepository};
use crate::database::repositories::ticket::TicketRepository;
use crate::database::repositories::{LedgerRepository, MasterUserRepository};
use crate::models::ledger::LedgerEntryType;
use crate::models::request::{CreateRequestInput, RegistrationRequest, RequestSource, RequestStatus};
use crate::models::ticket::{ticket_code, TicketIssue};
use crate::utils::errors::{QueueBuddyError, Result};
use crate::utils::logging::{log_issuance, log_ledger_entry};

/// Request row plus its display-only remaining quota
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestView {
    #[serde(flatten)]
    pub request: RegistrationRequest,
    pub quota_remaining: i32,
}

impl From<RegistrationRequest> for RequestView {
    fn from(request: RegistrationRequest) -> Self {
        let quota_remaining = request.quota_remaining();
        Self { request, quota_remaining }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeOutcome {
    /// True when an existing PENDING request was returned instead of a new row
    pub dedup: bool,
    pub request: RequestView,
    pub pool_remaining: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingQueue {
    pub event_id: i64,
    pub pool_remaining: i64,
    pub pending: Vec<RequestView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrantPage {
    pub event_id: i64,
    pub total: i64,
    pub items: Vec<RequestView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub request_id: i64,
    pub event_id: i64,
    pub email: String,
    /// Every ticket now held by this email for the event
    pub tickets: Vec<TicketIssue>,
    pub donated: i32,
    pub allocated: i32,
    pub pool_after: i64,
}

/// Source resolution at intake time: an explicit GIMMICK request keeps its
/// source, everyone else is MASTER when on the list and WALKIN otherwise.
fn resolve_source(is_master: bool, requested: Option<RequestSource>) -> RequestSource {
    match (requested, is_master) {
        (Some(RequestSource::Gimmick), _) => RequestSource::Gimmick,
        (_, true) => RequestSource::Master,
        (_, false) => RequestSource::Walkin,
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[derive(Clone)]
pub struct IntakeService {
    pool: PgPool,
    requests: RequestRepository,
    tickets: TicketRepository,
    ledger: LedgerRepository,
    masters: MasterUserRepository,
}

impl IntakeService {
    pub fn new(pool: PgPool) -> Self {
        Self {
            requests: RequestRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            masters: MasterUserRepository::new(pool.clone()),
            pool,
        }
    }

    /// Accept a registration request, deduplicating on (event, email) while
    /// a PENDING row exists.
    pub async fn create_request(&self, input: CreateRequestInput) -> Result<IntakeOutcome> {
        let email = normalize_email(&input.email);
        let name = input.name.trim().to_string();
        if email.is_empty() || name.is_empty() {
            return Err(QueueBuddyError::InvalidInput(
                "email and name are required".to_string()
            ));
        }
        let wa = input.wa.as_deref().map(str::trim).filter(|w| !w.is_empty());

        let pool_remaining = self.ledger.balance(input.event_id).await?;

        if let Some(existing) = self.requests.find_pending(input.event_id, &email).await? {
            debug!(event_id = input.event_id, email = %email, "Intake deduplicated onto existing request");
            return Ok(IntakeOutcome { dedup: true, request: existing.into(), pool_remaining });
        }

        let mu = self.masters.find_by_email(&email).await?;
        let source = resolve_source(mu.is_some(), input.source);
        let master_quota = mu.as_ref().map(|m| m.quota).unwrap_or(0);
        let issued_before = self.tickets.count_for_email(input.event_id, &email).await? as i32;

        let inserted = self
            .requests
            .insert_pending(
                input.event_id,
                &email,
                &name,
                wa,
                source,
                mu.is_some(),
                master_quota,
                issued_before,
            )
            .await?;

        match inserted {
            Some(created) => {
                info!(event_id = input.event_id, request_id = created.id, source = ?source, "Registration request created");
                Ok(IntakeOutcome { dedup: false, request: created.into(), pool_remaining })
            }
            // Lost the insert race; the winner's row is the request.
            None => {
                let existing = self
                    .requests
                    .find_pending(input.event_id, &email)
                    .await?
                    .ok_or_else(|| QueueBuddyError::InvalidInput(
                        "pending request vanished during dedup".to_string()
                    ))?;
                Ok(IntakeOutcome { dedup: true, request: existing.into(), pool_remaining })
            }
        }
    }

    /// All PENDING requests for an event, plus the pool balance
    pub async fn list_pending(&self, event_id: i64) -> Result<PendingQueue> {
        let pending = self.requests.list_pending(event_id).await?;
        let pool_remaining = self.ledger.balance(event_id).await?;

        Ok(PendingQueue {
            event_id,
            pool_remaining,
            pending: pending.into_iter().map(Into::into).collect(),
        })
    }

    /// Filtered, paginated registrant listing
    pub async fn list_registrants(&self, event_id: i64, filter: RegistrantFilter) -> Result<RegistrantPage> {
        let (total, items) = self.requests.list(event_id, &filter).await?;

        Ok(RegistrantPage {
            event_id,
            total,
            items: items.into_iter().map(Into::into).collect(),
        })
    }

    /// Confirm a PENDING request and issue tickets.
    ///
    /// MASTER requests draw on live quota; a leftover becomes a DONATE entry,
    /// and `use_count = 0` donates the full remaining amount without issuing
    /// anything. WALKIN/GIMMICK requests draw on the surplus pool and record
    /// an ALLOCATE entry. Retrying an already-confirmed request returns
    /// `AlreadyProcessed` and writes nothing.
    pub async fn confirm(&self, request_id: i64, use_count: i32) -> Result<ConfirmOutcome> {
        if use_count < 0 {
            return Err(QueueBuddyError::InvalidInput(
                "use_count must not be negative".to_string()
            ));
        }

        let mut tx = self.pool.begin().await?;

        let req = request::lock_by_id(&mut tx, request_id)
            .await?
            .ok_or(QueueBuddyError::RequestNotFound { request_id })?;
        if req.status != RequestStatus::Pending {
            return Err(QueueBuddyError::AlreadyProcessed { request_id });
        }

        // The event row lock serializes this confirmation against every other
        // issuing operation for the event (other confirms, direct
        // registration, pool draws), so the live counts read below cannot be
        // invalidated before the writes land.
        event::lock_for_update(&mut tx, req.event_id).await?;
        let ev = event::find_by_id(&mut tx, req.event_id)
            .await?
            .ok_or(QueueBuddyError::EventNotFound { event_id: req.event_id })?;

        let mut donated = 0i32;
        let mut allocated = 0i32;

        match req.source {
            RequestSource::Master => {
                let mu = master::find_by_email(&mut tx, &req.email)
                    .await?
                    .ok_or_else(|| QueueBuddyError::MasterNotFound { email: req.email.clone() })?;

                // Live numbers, not the intake-time snapshot.
                let issued = ticket::count_for_email(&mut tx, req.event_id, &req.email).await?;
                let remaining = mu.quota as i64 - issued;
                if remaining <= 0 {
                    return Err(QueueBuddyError::QuotaExhausted { quota: mu.quota, issued });
                }
                if use_count as i64 > remaining {
                    return Err(QueueBuddyError::OverRequest { requested: use_count, remaining });
                }

                if use_count > 0 {
                    let block = counter::reserve_block(&mut tx, req.event_id, use_count).await?;
                    for order in block.start..=block.end {
                        let code = ticket_code(&ev.code_prefix, order);
                        ticket::insert_issued(
                            &mut tx, req.event_id, &code, &req.name, &req.email,
                            req.wa.as_deref(), order,
                        )
                        .await?;
                    }
                    log_issuance(req.event_id, &req.email, use_count, block.start, block.end);
                }

                let leftover = (remaining - use_count as i64) as i32;
                if leftover > 0 {
                    ledger::record(
                        &mut tx, req.event_id, LedgerEntryType::Donate, leftover,
                        &req.email, Some(request_id),
                    )
                    .await?;
                    donated = leftover;
                    log_ledger_entry(req.event_id, "DONATE", leftover, &req.email);
                }
            }
            RequestSource::Walkin | RequestSource::Gimmick => {
                if use_count == 0 {
                    return Err(QueueBuddyError::InvalidInput(
                        "use_count must be at least 1 for WALKIN/GIMMICK requests".to_string()
                    ));
                }

                // Balance check and ALLOCATE write are one atomic step under
                // the event row lock taken above.
                let available = ledger::balance(&mut tx, req.event_id).await?;
                if available < use_count as i64 {
                    return Err(QueueBuddyError::PoolInsufficient { requested: use_count, available });
                }

                ledger::record(
                    &mut tx, req.event_id, LedgerEntryType::Allocate, use_count,
                    &req.email, Some(request_id),
                )
                .await?;
                allocated = use_count;
                log_ledger_entry(req.event_id, "ALLOCATE", use_count, &req.email);

                let block = counter::reserve_block(&mut tx, req.event_id, use_count).await?;
                for order in block.start..=block.end {
                    let code = ticket_code(&ev.code_prefix, order);
                    ticket::insert_issued(
                        &mut tx, req.event_id, &code, &req.name, &req.email,
                        req.wa.as_deref(), order,
                    )
                    .await?;
                }
                log_issuance(req.event_id, &req.email, use_count, block.start, block.end);
            }
        }

        request::set_status(&mut tx, request_id, RequestStatus::Confirmed).await?;

        let pool_after = ledger::balance(&mut tx, req.event_id).await?;
        let tickets = ticket::for_email(&mut tx, req.event_id, &req.email).await?;

        tx.commit().await?;

        info!(
            request_id = request_id,
            event_id = req.event_id,
            email = %req.email,
            donated = donated,
            allocated = allocated,
            "Registration request confirmed"
        );

        Ok(ConfirmOutcome {
            request_id,
            event_id: req.event_id,
            email: req.email,
            tickets,
            donated,
            allocated,
            pool_after,
        })
    }

    /// Cancel a PENDING request; terminal states never mutate again
    pub async fn cancel(&self, request_id: i64) -> Result<RequestView> {
        let mut tx = self.pool.begin().await?;

        let req = request::lock_by_id(&mut tx, request_id)
            .await?
            .ok_or(QueueBuddyError::RequestNotFound { request_id })?;
        if req.status != RequestStatus::Pending {
            return Err(QueueBuddyError::AlreadyProcessed { request_id });
        }

        request::set_status(&mut tx, request_id, RequestStatus::Cancelled).await?;
        tx.commit().await?;

        info!(request_id = request_id, event_id = req.event_id, "Registration request cancelled");

        let mut cancelled = req;
        cancelled.status = RequestStatus::Cancelled;
        Ok(cancelled.into())
    }
}
