//! Data models module

pub mod event;
pub mod ticket;
pub mod ledger;
pub mod request;
pub mod master;

pub use event::{Event, CreateEventRequest};
pub use ticket::{Ticket, TicketSummary, TicketIssue, TicketStatus, ticket_code};
pub use ledger::{LedgerEntry, LedgerEntryType};
pub use request::{RegistrationRequest, RequestSource, RequestStatus, CreateRequestInput};
pub use master::MasterUser;
