//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging helpers
//! for queue operations.

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use crate::config::LoggingConfig;
use crate::models::ticket::TicketStatus;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard must be held for the lifetime of the process, dropping
/// it stops the background log writer.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "queuebuddy.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log a ticket lifecycle transition
pub fn log_ticket_transition(event_id: i64, code: &str, from: TicketStatus, to: TicketStatus, slot_no: Option<i32>) {
    info!(
        event_id = event_id,
        code = code,
        from = %from,
        to = %to,
        slot_no = slot_no,
        "Ticket transition"
    );
}

/// Log a block of issued ticket orders
pub fn log_issuance(event_id: i64, email: &str, count: i32, start_order: i32, end_order: i32) {
    info!(
        event_id = event_id,
        email = email,
        count = count,
        start_order = start_order,
        end_order = end_order,
        "Tickets issued"
    );
}

/// Log a surplus ledger mutation
pub fn log_ledger_entry(event_id: i64, entry_type: &str, amount: i32, email: &str) {
    info!(
        event_id = event_id,
        entry_type = entry_type,
        amount = amount,
        email = email,
        "Surplus ledger entry recorded"
    );
}
