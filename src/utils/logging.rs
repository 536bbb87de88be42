//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging
//! helpers for the registration workflow.

use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;
use crate::utils::errors::Result;

/// Initialize logging based on configuration.
///
/// The returned guard must stay alive for the process lifetime or file
/// output is lost.
pub fn init_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    let file_appender = tracing_appender::rolling::daily(&config.file_path, "muster.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.level))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(tracing_subscriber::fmt::layer().with_writer(non_blocking))
        .init();

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log registration actions with structured data
pub fn log_registration_action(event_id: i64, user_id: &str, action: &str) {
    info!(
        event_id = event_id,
        user_id = user_id,
        action = action,
        "Registration action performed"
    );
}

/// Log organizer actions with structured data
pub fn log_organizer_action(event_id: i64, organizer_id: &str, action: &str) {
    info!(
        event_id = event_id,
        organizer_id = organizer_id,
        action = action,
        "Organizer action performed"
    );
}
