//! # Autopsy Telemetry
//!
//! Wiring that puts autopsy tracebacks and call logs somewhere useful.
//!
//! ## Features
//!
//! - **Subscriber setup**: console output in pretty, compact or JSON form,
//!   plus an optional non-blocking log file
//! - **Panic reporting**: a panic hook that logs a full traceback
//! - **Configurable**: TOML config file with `AUTOPSY_*` environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use autopsy_telemetry::{TelemetryConfig, TelemetrySystem};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TelemetryConfig::load(None).await?;
//!     let _guard = TelemetrySystem::init(config).await?;
//!
//!     tracing::info!("Application started");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod filters;
pub mod formatters;
pub mod hook;
pub mod system;


pub use config::{LogFormat, LogLevel, LogRotation, TelemetryConfig};
pub use hook::{install_panic_hook, log_exception, report};
pub use system::{TelemetryGuard, TelemetrySystem};

/// Result type for telemetry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Telemetry-specific errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Telemetry system error: {message}")]
    System { message: String },
}
