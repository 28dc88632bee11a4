use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::bot_mimic::SchedulerError;

/// Failures that end a `hiretrack-api` command before or while it serves.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("auto-process could not start: {0}")]
    Scheduler(#[from] SchedulerError),
}
