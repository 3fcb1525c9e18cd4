//! Error handling for QueueBuddy
//!
//! This module defines the main error types used throughout the crate.
//! Business-rule rejections are ordinary enum variants carrying enough
//! context (remaining quota, pool balance) for the caller to retry with
//! corrected input; the HTTP layer maps variants to status codes.

use thiserror::Error;

/// Main error type for QueueBuddy operations
#[derive(Error, Debug)]
pub enum QueueBuddyError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Event not found: {event_id}")]
    EventNotFound { event_id: i64 },

    #[error("Ticket not found: {reference}")]
    TicketNotFound { reference: String },

    #[error("Registration request not found: {request_id}")]
    RequestNotFound { request_id: i64 },

    #[error("Email not present in master list: {email}")]
    MasterNotFound { email: String },

    /// Setup precondition violation. Every event must have its queue counter
    /// seeded before any ticket can be issued.
    #[error("Queue counter not seeded for event {event_id}")]
    CounterNotSeeded { event_id: i64 },

    #[error("Ticket {code} is {status}, operation requires {required}")]
    InvalidState {
        code: String,
        status: String,
        required: &'static str,
    },

    #[error("Registration request {request_id} has already been processed")]
    AlreadyProcessed { request_id: i64 },

    #[error("Master quota exhausted: quota {quota}, already issued {issued}")]
    QuotaExhausted { quota: i32, issued: i64 },

    #[error("Requested {requested} tickets but only {remaining} remaining")]
    OverRequest { requested: i32, remaining: i64 },

    #[error("Surplus pool insufficient: requested {requested}, available {available}")]
    PoolInsufficient { requested: i32, available: i64 },

    #[error("No free serving slot for event {event_id}")]
    NoFreeSlot { event_id: i64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for QueueBuddy operations
pub type Result<T> = std::result::Result<T, QueueBuddyError>;

impl QueueBuddyError {
    /// Check if the error is recoverable by the caller retrying with
    /// corrected input
    pub fn is_recoverable(&self) -> bool {
        match self {
            QueueBuddyError::Database(_) => false,
            QueueBuddyError::Migration(_) => false,
            QueueBuddyError::Config(_) => false,
            QueueBuddyError::EventNotFound { .. } => false,
            QueueBuddyError::TicketNotFound { .. } => false,
            QueueBuddyError::RequestNotFound { .. } => false,
            QueueBuddyError::MasterNotFound { .. } => false,
            QueueBuddyError::CounterNotSeeded { .. } => false,
            QueueBuddyError::InvalidState { .. } => true,
            QueueBuddyError::AlreadyProcessed { .. } => false,
            QueueBuddyError::QuotaExhausted { .. } => false,
            QueueBuddyError::OverRequest { .. } => true,
            QueueBuddyError::PoolInsufficient { .. } => true,
            QueueBuddyError::NoFreeSlot { .. } => true,
            QueueBuddyError::InvalidInput(_) => true,
            QueueBuddyError::Serialization(_) => false,
            QueueBuddyError::Io(_) => true,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            QueueBuddyError::Database(_) => ErrorSeverity::Critical,
            QueueBuddyError::Migration(_) => ErrorSeverity::Critical,
            QueueBuddyError::Config(_) => ErrorSeverity::Critical,
            QueueBuddyError::CounterNotSeeded { .. } => ErrorSeverity::Critical,
            QueueBuddyError::QuotaExhausted { .. } => ErrorSeverity::Warning,
            QueueBuddyError::OverRequest { .. } => ErrorSeverity::Warning,
            QueueBuddyError::PoolInsufficient { .. } => ErrorSeverity::Warning,
            QueueBuddyError::NoFreeSlot { .. } => ErrorSeverity::Info,
            QueueBuddyError::InvalidState { .. } => ErrorSeverity::Info,
            QueueBuddyError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
