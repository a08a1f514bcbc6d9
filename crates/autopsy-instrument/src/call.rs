//! Instrumented invocation: one logging routine, two execution strategies

use crate::args::{self, Args};
use futures::FutureExt;
use std::any::Any;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tracing::{Instrument, Level, Span};
use uuid::Uuid;

/// Emit an event at a level only known at runtime
macro_rules! emit {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            Level::ERROR => tracing::error!($($arg)+),
            Level::WARN => tracing::warn!($($arg)+),
            Level::INFO => tracing::info!($($arg)+),
            Level::DEBUG => tracing::debug!($($arg)+),
            _ => tracing::trace!($($arg)+),
        }
    };
}

/// Logging configuration for one callable
///
/// Logs `<name> <args>` on entry and `<name> returns <value>` on success at
/// `level`. Failures (an `Err` from the fallible strategies, or a panic)
/// log `error in <name> <args>: <repr>` at the failure level, which is
/// `level` unless set, and are then passed on untouched.
#[derive(Debug, Clone)]
pub struct Instrumentation {
    name: Cow<'static, str>,
    level: Level,
    failure_level: Option<Level>,
    log_none_return: bool,
}

impl Instrumentation {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            level: Level::DEBUG,
            failure_level: None,
            log_none_return: true,
        }
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn failure_level(mut self, level: Level) -> Self {
        self.failure_level = Some(level);
        self
    }

    /// Whether a `()` or `None` result still gets a return line
    pub fn log_none_return(mut self, enabled: bool) -> Self {
        self.log_none_return = enabled;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run a synchronous callable
    pub fn call<R, F>(&self, args: Args, f: F) -> R
    where
        R: fmt::Debug,
        F: FnOnce() -> R,
    {
        let invocation = self.begin(args);
        let _entered = invocation.span.enter();
        invocation.started();

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => {
                invocation.returned(&value);
                value
            }
            Err(payload) => invocation.panicked(payload),
        }
    }

    /// Run a synchronous callable whose `Err` counts as a failure
    pub fn call_fallible<T, E, F>(&self, args: Args, f: F) -> Result<T, E>
    where
        T: fmt::Debug,
        E: fmt::Debug,
        F: FnOnce() -> Result<T, E>,
    {
        let invocation = self.begin(args);
        let _entered = invocation.span.enter();
        invocation.started();

        match panic::catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(value)) => {
                invocation.returned(&value);
                Ok(value)
            }
            Ok(Err(error)) => {
                invocation.failed(&error);
                Err(error)
            }
            Err(payload) => invocation.panicked(payload),
        }
    }

    /// Await an asynchronous callable.
    ///
    /// The entry line is written on first poll, before the callable's first
    /// await point; the exit line after it completes. Dropping the returned
    /// future cancels the call without a further line.
    pub async fn call_async<Fut>(&self, args: Args, future: Fut) -> Fut::Output
    where
        Fut: Future,
        Fut::Output: fmt::Debug,
    {
        let invocation = self.begin(args);
        let span = invocation.span.clone();

        async move {
            invocation.started();
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(value) => {
                    invocation.returned(&value);
                    value
                }
                Err(payload) => invocation.panicked(payload),
            }
        }
        .instrument(span)
        .await
    }

    /// Await an asynchronous callable whose `Err` counts as a failure
    pub async fn call_async_fallible<T, E, Fut>(&self, args: Args, future: Fut) -> Result<T, E>
    where
        T: fmt::Debug,
        E: fmt::Debug,
        Fut: Future<Output = Result<T, E>>,
    {
        let invocation = self.begin(args);
        let span = invocation.span.clone();

        async move {
            invocation.started();
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(Ok(value)) => {
                    invocation.returned(&value);
                    Ok(value)
                }
                Ok(Err(error)) => {
                    invocation.failed(&error);
                    Err(error)
                }
                Err(payload) => invocation.panicked(payload),
            }
        }
        .instrument(span)
        .await
    }

    fn begin(&self, args: Args) -> Invocation<'_> {
        let call_id = Uuid::new_v4().simple().to_string();
        let span = tracing::info_span!(
            "instrumented",
            function = %self.name,
            call_id = %call_id,
        );

        Invocation {
            instrumentation: self,
            args,
            span,
        }
    }
}

/// State of a single call; lives on that call's stack or in its future
struct Invocation<'a> {
    instrumentation: &'a Instrumentation,
    args: Args,
    span: Span,
}

impl Invocation<'_> {
    fn started(&self) {
        let name = self.instrumentation.name();
        emit!(
            self.instrumentation.level,
            function = %name,
            "{} {}",
            name,
            self.args
        );
    }

    fn returned(&self, value: &dyn fmt::Debug) {
        let rendered = args::render(value);
        if args::is_none_like(&rendered) && !self.instrumentation.log_none_return {
            return;
        }

        let name = self.instrumentation.name();
        emit!(
            self.instrumentation.level,
            function = %name,
            "{} returns {}",
            name,
            rendered
        );
    }

    fn failed(&self, error: &dyn fmt::Debug) {
        self.log_failure(&args::render(error));
    }

    fn panicked(&self, payload: Box<dyn Any + Send>) -> ! {
        self.log_failure(&args::panic_repr(&*payload));
        panic::resume_unwind(payload)
    }

    fn log_failure(&self, repr: &str) {
        let instrumentation = self.instrumentation;
        let name = instrumentation.name();
        emit!(
            instrumentation
                .failure_level
                .unwrap_or(instrumentation.level),
            function = %name,
            "error in {} {}: {}",
            name,
            self.args,
            repr
        );
    }
}
