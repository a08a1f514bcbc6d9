//! Capturing subscriber for asserting on instrumentation output

#![allow(dead_code)]

use std::fmt;
use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

#[derive(Debug, Clone, PartialEq)]
pub struct Captured {
    pub level: Level,
    pub message: String,
    pub call_id: Option<String>,
}

#[derive(Clone, Default)]
pub struct CaptureLayer {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl CaptureLayer {
    pub fn events(&self) -> Vec<Captured> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }
}

struct CallId(String);

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    call_id: Option<String>,
}

impl Visit for FieldVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            "message" => self.message = Some(format!("{:?}", value)),
            "call_id" => self.call_id = Some(format!("{:?}", value)),
            _ => {}
        }
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        attrs.record(&mut visitor);
        if let (Some(call_id), Some(span)) = (visitor.call_id, ctx.span(id)) {
            span.extensions_mut().insert(CallId(call_id));
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let call_id = ctx.event_scope(event).and_then(|scope| {
            scope
                .from_root()
                .find_map(|span| span.extensions().get::<CallId>().map(|id| id.0.clone()))
        });

        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            message: visitor.message.unwrap_or_default(),
            call_id,
        });
    }
}

/// A subscriber that records every event, plus a handle to read them back
pub fn capture() -> (CaptureLayer, impl Subscriber + Send + Sync) {
    let layer = CaptureLayer::default();
    let subscriber = Registry::default().with(layer.clone());
    (layer, subscriber)
}
