// Error types for sysgauge

use thiserror::Error;

/// Result type alias using anyhow::Error
pub type Result<T> = anyhow::Result<T>;

/// Sysgauge-specific error types
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Unknown config key: {0}")]
    UnknownConfigKey(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to systemd D-Bus: {0}")]
    SystemdConnection(String),

    #[error("Failed to resolve unit '{unit}': {message}")]
    UnitResolution { unit: String, message: String },

    #[error("Failed to read {property} of unit '{unit}': {message}")]
    PropertyRead {
        unit: String,
        property: String,
        message: String,
    },

    #[error("Failed to dispatch metric: {0}")]
    Dispatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
