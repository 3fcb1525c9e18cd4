//! Repository modules for database operations
//!
//! Each repository owns the pool-based read/list surface for one entity.
//! Operations that must run inside a caller-held transaction (counter
//! reservation, ledger writes, ticket issuance, request locking) are exposed
//! as free functions taking `&mut PgConnection` in the same modules.

pub mod event;
pub mod ticket;
pub mod counter;
pub mod ledger;
pub mod request;
pub mod master;

pub use event::EventRepository;
pub use ticket::TicketRepository;
pub use counter::CounterRepository;
pub use ledger::LedgerRepository;
pub use request::RequestRepository;
pub use master::MasterUserRepository;
