//! Configuration management module

pub mod settings;
pub mod validation;

pub use settings::{Settings, DatabaseConfig, QueueConfig, LoggingConfig};
