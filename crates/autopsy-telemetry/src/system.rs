//! Main telemetry system implementation

use crate::{
    config::{LogFormat, LogRotation, TelemetryConfig},
    filters::create_dependency_filter,
    formatters::CompactFormatter,
    hook, Error, Result,
};
use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, registry::LookupSpan, util::SubscriberInitExt, EnvFilter, Layer,
    Registry,
};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Sets up the global subscriber and panic hook from a [`TelemetryConfig`]
pub struct TelemetrySystem;

/// Keeps the background log writer alive; pending lines are flushed on drop
pub struct TelemetryGuard {
    _file_guard: Option<WorkerGuard>,
}

impl TelemetrySystem {
    /// Initialize the telemetry system with the given configuration.
    ///
    /// Installs the global subscriber, so this succeeds once per process.
    pub async fn init(config: TelemetryConfig) -> Result<TelemetryGuard> {
        let (subscriber, guard) = Self::build(&config)?;

        subscriber.try_init().map_err(|e| Error::System {
            message: format!("Failed to initialize tracing subscriber: {}", e),
        })?;

        if config.enabled && config.traceback.install_panic_hook {
            hook::install(
                config.formatter(),
                config.traceback.chain_previous_hook,
                config.traceback.structured_fault,
            );
        }

        tracing::info!(
            telemetry.event = "system_initialized",
            telemetry.version = env!("CARGO_PKG_VERSION"),
            "Telemetry system initialized successfully"
        );

        Ok(guard)
    }

    /// Build the subscriber without installing it, e.g. for
    /// `tracing::subscriber::with_default`
    pub fn build(
        config: &TelemetryConfig,
    ) -> Result<(impl Subscriber + Send + Sync + for<'a> LookupSpan<'a>, TelemetryGuard)> {
        config.validate()?;

        let mut layers: Vec<BoxedLayer> = Vec::new();
        if let Some(layer) = Self::build_console_layer(config) {
            layers.push(layer);
        }

        let file_guard = match Self::build_file_layer(config)? {
            Some((layer, guard)) => {
                layers.push(layer);
                Some(guard)
            }
            None => None,
        };

        let subscriber = Registry::default()
            .with(layers)
            .with(Self::build_env_filter(config)?);

        Ok((
            subscriber,
            TelemetryGuard {
                _file_guard: file_guard,
            },
        ))
    }

    /// Build environment filter for log level filtering
    fn build_env_filter(config: &TelemetryConfig) -> Result<EnvFilter> {
        // Allow environment override
        if let Ok(directives) = std::env::var("RUST_LOG") {
            return EnvFilter::try_new(&directives).map_err(|e| Error::Config {
                message: format!("Invalid RUST_LOG '{}': {}", directives, e),
            });
        }

        let level: Level = config.logging.level.into();
        Ok(EnvFilter::new(level.to_string()))
    }

    /// Build console logging layer
    fn build_console_layer(config: &TelemetryConfig) -> Option<BoxedLayer> {
        if !config.enabled || !config.logging.console_enabled {
            return None;
        }

        Some(Self::format_layer(config, std::io::stderr, true))
    }

    /// Build file logging layer on a non-blocking appender
    fn build_file_layer(config: &TelemetryConfig) -> Result<Option<(BoxedLayer, WorkerGuard)>> {
        if !config.enabled || !config.logging.file_enabled {
            return Ok(None);
        }

        let logging = &config.logging;
        let rotation = match logging.rotation {
            LogRotation::Never => Rotation::NEVER,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
        };

        // `<name>.log` without rotation, `<name>.<date>.log` with it
        let appender = RollingFileAppender::builder()
            .rotation(rotation)
            .filename_prefix(&logging.log_file_name)
            .filename_suffix("log")
            .build(&logging.log_dir)
            .map_err(|e| Error::System {
                message: format!("Failed to create log file appender: {}", e),
            })?;

        let (writer, guard) = tracing_appender::non_blocking(appender);
        Ok(Some((Self::format_layer(config, writer, false), guard)))
    }

    fn format_layer<W>(config: &TelemetryConfig, writer: W, ansi: bool) -> BoxedLayer
    where
        W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
    {
        let logging = &config.logging;
        let layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_file(logging.include_location)
            .with_line_number(logging.include_location)
            .with_thread_ids(logging.include_thread_info)
            .with_thread_names(logging.include_thread_info);

        match logging.format {
            LogFormat::Json => layer
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_filter(create_dependency_filter())
                .boxed(),
            LogFormat::Pretty => layer
                .pretty()
                .with_filter(create_dependency_filter())
                .boxed(),
            LogFormat::Compact => layer
                .event_format(
                    CompactFormatter::new()
                        .with_timestamps(logging.include_timestamps)
                        .with_location(logging.include_location),
                )
                .with_filter(create_dependency_filter())
                .boxed(),
        }
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        // Runs before the worker guard flushes the file writer
        tracing::debug!(
            telemetry.event = "system_shutdown",
            "Telemetry system shutting down"
        );
    }
}
