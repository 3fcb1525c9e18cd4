//! QueueBuddy service-queue core
//!
//! Backend core for running a live, single-event service queue: a fixed set of
//! active serving slots fed from a FIFO ticket backlog, sequential ticket code
//! issuance, and a surplus quota pool that lets unused per-person allocation be
//! donated and re-allocated to walk-in registrants. The HTTP layer is an
//! external collaborator; every operation here returns a tagged result it can
//! translate into status codes.

#![allow(non_snake_case)]

pub mod config;
pub mod services;
pub mod models;
pub mod database;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{QueueBuddyError, Result};

// Re-export main components for easy access
pub use database::DatabaseService;
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
