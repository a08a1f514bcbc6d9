//! Telemetry configuration and management

use crate::{Error, Result};
use autopsy_traceback::{ExclusionList, Exclusions, TracebackFormatter, DEFAULT_LOCALS, DEFAULT_TRACES};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::Level;

/// Main telemetry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Global enable/disable toggle
    pub enabled: bool,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Traceback rendering and panic reporting
    pub traceback: TracebackConfig,
}

/// Logging-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: LogLevel,

    /// Output format (JSON, Pretty, Compact)
    pub format: LogFormat,

    /// Enable console logging
    pub console_enabled: bool,

    /// Enable file logging
    pub file_enabled: bool,

    /// Directory for log files
    pub log_dir: PathBuf,

    /// Base filename for logs
    pub log_file_name: String,

    /// How often the log file is rolled over
    pub rotation: LogRotation,

    /// Include timestamps in logs
    pub include_timestamps: bool,

    /// Include source location in logs
    pub include_location: bool,

    /// Include thread names/IDs
    pub include_thread_info: bool,
}

/// Traceback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracebackConfig {
    /// Install the traceback-logging panic hook on init
    pub install_panic_hook: bool,

    /// Also run the previously installed panic hook
    pub chain_previous_hook: bool,

    /// Look up source lines on disk for frames that carry none
    pub source_lookup: bool,

    /// Attach the fault as a JSON `fault` field to panic reports
    pub structured_fault: bool,

    /// Markers that drop a whole frame from a traceback
    pub trace_exclusions: ExclusionList,

    /// Markers that drop a single line from a traceback
    pub local_exclusions: ExclusionList,
}

/// Log level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    /// Structured JSON format
    Json,
    /// Human-readable pretty format
    Pretty,
    /// Compact single-line format
    Compact,
}

/// Log file rollover period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRotation {
    Never,
    Hourly,
    Daily,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let default_log_dir = Self::default_log_dir().unwrap_or_else(|_| PathBuf::from("./logs"));

        Self {
            enabled: true,
            logging: LoggingConfig {
                level: LogLevel::Info,
                format: LogFormat::Pretty,
                console_enabled: true,
                file_enabled: false,
                log_dir: default_log_dir,
                log_file_name: "autopsy".to_string(),
                rotation: LogRotation::Daily,
                include_timestamps: true,
                include_location: false,
                include_thread_info: false,
            },
            traceback: TracebackConfig {
                install_panic_hook: true,
                chain_previous_hook: false,
                source_lookup: true,
                structured_fault: false,
                trace_exclusions: DEFAULT_TRACES.iter().copied().collect(),
                local_exclusions: DEFAULT_LOCALS.iter().copied().collect(),
            },
        }
    }
}

impl TelemetryConfig {
    /// Load configuration from file or create default, then apply
    /// environment overrides
    pub async fn load(config_path: Option<&Path>) -> Result<Self> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        let mut config = if config_file.exists() {
            let content = tokio::fs::read_to_string(&config_file).await?;
            toml::from_str(&content).map_err(|e| Error::Config {
                message: format!("Failed to parse telemetry config: {}", e),
            })?
        } else {
            Self::default()
        };

        config.load_env_overrides();
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: Option<&Path>) -> Result<()> {
        let config_file = match config_path {
            Some(path) => path.to_path_buf(),
            None => Self::default_config_path()?,
        };

        // Ensure parent directory exists
        if let Some(parent) = config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let content = toml::to_string_pretty(self).map_err(|e| Error::Config {
            message: format!("Failed to serialize telemetry config: {}", e),
        })?;

        tokio::fs::write(&config_file, content).await?;
        Ok(())
    }

    /// Load environment variable overrides
    pub fn load_env_overrides(&mut self) {
        // Log level
        if let Ok(level) = std::env::var("AUTOPSY_LOG_LEVEL") {
            self.logging.level = match level.to_uppercase().as_str() {
                "TRACE" => LogLevel::Trace,
                "DEBUG" => LogLevel::Debug,
                "INFO" => LogLevel::Info,
                "WARN" => LogLevel::Warn,
                "ERROR" => LogLevel::Error,
                _ => self.logging.level,
            };
        }

        // Log format
        if let Ok(format) = std::env::var("AUTOPSY_LOG_FORMAT") {
            self.logging.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                "compact" => LogFormat::Compact,
                _ => self.logging.format,
            };
        }

        // File logging
        if let Ok(enabled) = std::env::var("AUTOPSY_FILE_LOGGING") {
            self.logging.file_enabled = enabled.parse().unwrap_or(self.logging.file_enabled);
        }

        // Log directory
        if let Ok(dir) = std::env::var("AUTOPSY_LOG_DIR") {
            self.logging.log_dir = PathBuf::from(dir);
        }

        // Panic hook chaining
        if let Ok(chain) = std::env::var("AUTOPSY_CHAIN_PANIC_HOOK") {
            self.traceback.chain_previous_hook =
                chain.parse().unwrap_or(self.traceback.chain_previous_hook);
        }
    }

    /// Get default configuration file path
    fn default_config_path() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("rs", "autopsy", "autopsy").ok_or_else(|| Error::Config {
                message: "Could not determine config directory".to_string(),
            })?;

        Ok(project_dirs.config_dir().join("telemetry.toml"))
    }

    /// Get default log directory
    fn default_log_dir() -> Result<PathBuf> {
        let project_dirs =
            ProjectDirs::from("rs", "autopsy", "autopsy").ok_or_else(|| Error::Config {
                message: "Could not determine log directory".to_string(),
            })?;

        Ok(project_dirs.data_dir().join("logs"))
    }

    /// Path of the log file when rotation is disabled
    pub fn log_file_path(&self) -> PathBuf {
        self.logging
            .log_dir
            .join(format!("{}.log", self.logging.log_file_name))
    }

    /// Exclusion lists for tracebacks rendered by this configuration
    pub fn exclusions(&self) -> Exclusions {
        Exclusions::new(
            self.traceback.trace_exclusions.clone(),
            self.traceback.local_exclusions.clone(),
        )
    }

    /// A traceback formatter following this configuration
    pub fn formatter(&self) -> TracebackFormatter {
        let formatter = TracebackFormatter::new(self.exclusions());
        if self.traceback.source_lookup {
            formatter
        } else {
            formatter.without_source_lookup()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let name = &self.logging.log_file_name;
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(Error::Config {
                message: format!("log_file_name must be a bare file name, got '{}'", name),
            });
        }

        // Validate log directory is writable
        if self.enabled && self.logging.file_enabled {
            if !self.logging.log_dir.exists() {
                std::fs::create_dir_all(&self.logging.log_dir)?;
            }

            // Test write permissions
            let test_file = self.logging.log_dir.join(".autopsy_test");
            std::fs::write(&test_file, "test")?;
            std::fs::remove_file(&test_file)?;
        }

        Ok(())
    }
}
