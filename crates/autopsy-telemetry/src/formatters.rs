//! Custom formatters for telemetry output

use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    registry::LookupSpan,
};

/// Compact single-line formatter.
///
/// Prints `<time> <LEVEL> <target> [<span>] <message> key=value..`. Multi-line
/// messages such as tracebacks are written as they are, so a report stays
/// readable in a terminal or file.
pub struct CompactFormatter {
    include_timestamps: bool,
    include_location: bool,
}

impl CompactFormatter {
    pub fn new() -> Self {
        Self {
            include_timestamps: true,
            include_location: false,
        }
    }

    pub fn with_timestamps(mut self, include: bool) -> Self {
        self.include_timestamps = include;
        self
    }

    pub fn with_location(mut self, include: bool) -> Self {
        self.include_location = include;
        self
    }
}

impl Default for CompactFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S, N> FormatEvent<S, N> for CompactFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        // Timestamp
        if self.include_timestamps {
            write!(writer, "{} ", Utc::now().format("%H:%M:%S%.3f"))?;
        }

        // Level
        write!(writer, "{:5} ", metadata.level())?;

        // Target (truncated from the left)
        let target = metadata.target();
        let short_target = match target.char_indices().rev().nth(19) {
            Some((start, _)) => &target[start..],
            None => target,
        };
        write!(writer, "{:20} ", short_target)?;

        if self.include_location {
            if let (Some(file), Some(line)) = (metadata.file(), metadata.line()) {
                write!(writer, "{}:{} ", file, line)?;
            }
        }

        // Innermost span name
        if let Some(scope) = ctx.event_scope() {
            if let Some(span) = scope.into_iter().next() {
                write!(writer, "[{}] ", span.name())?;
            }
        }

        // Message and fields
        let mut visitor = JsonVisitor::new();
        event.record(&mut visitor);

        write!(writer, "{}", visitor.message.unwrap_or_default())?;

        for (key, value) in visitor.fields {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            write!(writer, " {}={}", key, value)?;
        }

        writeln!(writer)
    }
}

/// Visitor collecting event fields as JSON values, message kept apart
#[derive(Default)]
pub(crate) struct JsonVisitor {
    pub(crate) fields: BTreeMap<String, Value>,
    pub(crate) message: Option<String>,
}

impl JsonVisitor {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

impl Visit for JsonVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields.insert(field.name().to_string(), json!(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.fields
                .insert(field.name().to_string(), json!(format!("{:?}", value)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::SharedBuffer;

    fn capture_with(formatter: CompactFormatter, emit: impl FnOnce()) -> String {
        let buffer = SharedBuffer::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(buffer.clone())
            .with_ansi(false)
            .event_format(formatter)
            .finish();

        tracing::subscriber::with_default(subscriber, emit);
        buffer.contents()
    }

    #[test]
    fn test_compact_line_layout() {
        let output = capture_with(CompactFormatter::new().with_timestamps(false), || {
            tracing::warn!(target: "orders", attempt = 3, retry = true, "payment declined");
        });

        assert_eq!(
            output,
            format!("WARN  {:20} payment declined attempt=3 retry=true\n", "orders")
        );
    }

    #[test]
    fn test_span_name_and_long_target() {
        let output = capture_with(CompactFormatter::new().with_timestamps(false), || {
            let span = tracing::info_span!("instrumented", function = "add");
            let _entered = span.enter();
            tracing::info!(target: "autopsy_instrument::call", "add (2, 3)");
        });

        assert!(output.starts_with("INFO  "));
        assert!(output.contains(" psy_instrument::call [instrumented] add (2, 3)"));
    }

    #[test]
    fn test_multiline_message_kept() {
        let output = capture_with(CompactFormatter::new(), || {
            tracing::error!("Traceback (most recent call last):\n  File \"a.rs\"");
        });

        assert!(output.contains("Traceback (most recent call last):\n  File \"a.rs\"\n"));
    }

    #[test]
    fn test_location_and_fields() {
        let output = capture_with(CompactFormatter::new().with_location(true), || {
            tracing::info!(user = "ann", "login");
        });

        assert!(output.contains("formatters.rs:"));
        assert!(output.contains("login user=ann"));
    }
}
