//! Database module

pub mod connection;
pub mod repositories;
pub mod service;

pub use connection::{DatabasePool, DatabaseConfig, create_pool, run_migrations, health_check};
pub use repositories::{
    EventRepository, TicketRepository, CounterRepository, LedgerRepository,
    RequestRepository, MasterUserRepository,
};
pub use service::DatabaseService;
