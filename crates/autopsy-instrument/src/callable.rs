//! Instrumented closures and function values
//!
//! For items you own, prefer the [`logged`](crate::logged) attribute. These
//! wrappers cover closures and function pointers handed around at runtime,
//! e.g. handlers stored in a registry keyed by name. Arguments are passed as
//! one value, usually a tuple, and rendered with its `Debug` impl.

use crate::args::Args;
use crate::call::Instrumentation;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use tracing::Level;

/// Wrap a synchronous callable
pub fn instrument<F>(name: impl Into<Cow<'static, str>>, f: F) -> Instrumented<F> {
    Instrumented {
        instrumentation: Instrumentation::new(name),
        doc: None,
        f,
    }
}

/// Wrap a callable that returns a future
pub fn instrument_async<F>(name: impl Into<Cow<'static, str>>, f: F) -> InstrumentedAsync<F> {
    InstrumentedAsync {
        instrumentation: Instrumentation::new(name),
        doc: None,
        f,
    }
}

/// A synchronous callable with entry/exit logging
pub struct Instrumented<F> {
    instrumentation: Instrumentation,
    doc: Option<Cow<'static, str>>,
    f: F,
}

/// An asynchronous callable with entry/exit logging
pub struct InstrumentedAsync<F> {
    instrumentation: Instrumentation,
    doc: Option<Cow<'static, str>>,
    f: F,
}

macro_rules! wrapper_config {
    ($wrapper:ident) => {
        impl<F> $wrapper<F> {
            pub fn level(mut self, level: Level) -> Self {
                self.instrumentation = self.instrumentation.level(level);
                self
            }

            pub fn failure_level(mut self, level: Level) -> Self {
                self.instrumentation = self.instrumentation.failure_level(level);
                self
            }

            pub fn log_none_return(mut self, enabled: bool) -> Self {
                self.instrumentation = self.instrumentation.log_none_return(enabled);
                self
            }

            /// Documentation reported by [`Self::doc`]
            pub fn with_doc(mut self, doc: impl Into<Cow<'static, str>>) -> Self {
                self.doc = Some(doc.into());
                self
            }

            /// Name of the wrapped callable
            pub fn name(&self) -> &str {
                self.instrumentation.name()
            }

            pub fn doc(&self) -> Option<&str> {
                self.doc.as_deref()
            }

            pub fn instrumentation(&self) -> &Instrumentation {
                &self.instrumentation
            }

            /// Unwrap the original callable
            pub fn into_inner(self) -> F {
                self.f
            }
        }

        impl<F> fmt::Debug for $wrapper<F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($wrapper))
                    .field("name", &self.name())
                    .field("doc", &self.doc)
                    .finish_non_exhaustive()
            }
        }
    };
}

wrapper_config!(Instrumented);
wrapper_config!(InstrumentedAsync);

impl<F> Instrumented<F> {
    pub fn call<A, R>(&self, args: A) -> R
    where
        F: Fn(A) -> R,
        A: fmt::Debug,
        R: fmt::Debug,
    {
        self.instrumentation
            .call(Args::value(&args), || (self.f)(args))
    }

    /// Like [`Self::call`], logging an `Err` as a failure
    pub fn try_call<A, T, E>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Result<T, E>,
        A: fmt::Debug,
        T: fmt::Debug,
        E: fmt::Debug,
    {
        self.instrumentation
            .call_fallible(Args::value(&args), || (self.f)(args))
    }
}

impl<F> InstrumentedAsync<F> {
    /// Await the callable's future with entry/exit logging.
    ///
    /// `f` itself runs on first poll, after the entry line and under the
    /// same unwind guard as the future it returns.
    pub async fn call<A, Fut>(&self, args: A) -> Fut::Output
    where
        F: Fn(A) -> Fut,
        Fut: Future,
        Fut::Output: fmt::Debug,
        A: fmt::Debug,
    {
        let rendered = Args::value(&args);
        self.instrumentation
            .call_async(rendered, async move { (self.f)(args).await })
            .await
    }

    /// Like [`Self::call`], logging an `Err` as a failure
    pub async fn try_call<A, T, E, Fut>(&self, args: A) -> Result<T, E>
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        A: fmt::Debug,
        T: fmt::Debug,
        E: fmt::Debug,
    {
        let rendered = Args::value(&args);
        self.instrumentation
            .call_async_fallible(rendered, async move { (self.f)(args).await })
            .await
    }
}
