//! Database service layer
//!
//! This module provides a high-level interface to database operations

use crate::database::{
    DatabasePool, EventRepository, TicketRepository, CounterRepository,
    LedgerRepository, RequestRepository, MasterUserRepository,
};
use crate::models::event::{CreateEventRequest, Event};
use crate::utils::errors::QueueBuddyError;

#[derive(Debug, Clone)]
pub struct DatabaseService {
    pub events: EventRepository,
    pub tickets: TicketRepository,
    pub counters: CounterRepository,
    pub ledger: LedgerRepository,
    pub requests: RequestRepository,
    pub masters: MasterUserRepository,
}

impl DatabaseService {
    pub fn new(pool: DatabasePool) -> Self {
        Self {
            events: EventRepository::new(pool.clone()),
            tickets: TicketRepository::new(pool.clone()),
            counters: CounterRepository::new(pool.clone()),
            ledger: LedgerRepository::new(pool.clone()),
            requests: RequestRepository::new(pool.clone()),
            masters: MasterUserRepository::new(pool),
        }
    }

    /// Create an event and seed its queue counter in one step.
    ///
    /// Every ticket-issuing operation requires the counter row, so event
    /// setup always provisions it.
    pub async fn initialize_event(
        &self,
        request: CreateEventRequest,
        first_order: i32,
    ) -> Result<Event, QueueBuddyError> {
        if request.code_prefix.trim().is_empty() {
            return Err(QueueBuddyError::InvalidInput(
                "event code prefix must not be empty".to_string()
            ));
        }

        let event = self.events.create(request).await?;
        self.counters.seed(event.id, first_order).await?;

        tracing::info!(event_id = event.id, code_prefix = %event.code_prefix, "Event initialized");
        Ok(event)
    }
}
