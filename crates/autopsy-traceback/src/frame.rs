//! Stack frame snapshots and local-variable capture

use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

/// Placeholder for a local whose `Debug` impl failed or panicked
pub const RENDER_FAILED: &str = "<local Debug failed>";

/// Source location of a frame
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub function: String,
}

/// A captured local variable: its name and rendered value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Local {
    pub name: String,
    pub value: String,
}

/// Snapshot of one stack frame taken while an error propagated through it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    location: Location,
    source: Option<String>,
    locals: Vec<Local>,
}

impl Frame {
    /// Create a frame with no locals. Prefer the [`frame!`](crate::frame) macro.
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            location: Location {
                file: file.into(),
                line,
                function: function.into(),
            },
            source: None,
            locals: Vec::new(),
        }
    }

    /// Attach the source text of the frame's line
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Capture a local by rendering it now; a later capture of the same name wins
    pub fn capture<T: fmt::Debug + ?Sized>(&mut self, name: &str, value: &T) {
        let value = render_value(&value);
        match self.locals.iter_mut().find(|local| local.name == name) {
            Some(local) => local.value = value,
            None => self.locals.push(Local {
                name: name.to_string(),
                value,
            }),
        }
    }

    /// Builder form of [`Frame::capture`]
    pub fn with_local<T: fmt::Debug + ?Sized>(mut self, name: &str, value: &T) -> Self {
        self.capture(name, value);
        self
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Locals in capture order
    pub fn locals(&self) -> &[Local] {
        &self.locals
    }

    /// Whether two frames point at the same file, line and function
    pub(crate) fn same_site(&self, other: &Frame) -> bool {
        self.location == other.location
    }
}

thread_local! {
    static RENDERING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as rendering a local until dropped
struct RenderingGuard;

impl RenderingGuard {
    fn enter() -> Self {
        RENDERING.with(|depth| depth.set(depth.get() + 1));
        RenderingGuard
    }
}

impl Drop for RenderingGuard {
    fn drop(&mut self) {
        RENDERING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Whether this thread is inside [`render_value`].
///
/// A panic hook sees panics from `Debug` impls before they are recovered
/// here; hooks check this to stay quiet about them.
pub fn is_rendering() -> bool {
    RENDERING.with(|depth| depth.get() > 0)
}

/// Render a value with its `Debug` impl.
///
/// A `Debug` impl that returns an error or panics yields [`RENDER_FAILED`]
/// instead of aborting the capture.
pub fn render_value(value: &dyn fmt::Debug) -> String {
    let _rendering = RenderingGuard::enter();
    let mut rendered = String::new();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        fmt::write(&mut rendered, format_args!("{:?}", value))
    }));

    match outcome {
        Ok(Ok(())) => rendered,
        _ => RENDER_FAILED.to_string(),
    }
}

/// Strip the helper item and closure segments from a `type_name` path
#[doc(hidden)]
pub fn trim_function_path(path: &'static str) -> &'static str {
    let mut path = path.strip_suffix("::__autopsy_here").unwrap_or(path);
    while let Some(outer) = path.strip_suffix("::{{closure}}") {
        path = outer;
    }
    path
}

/// Path of the enclosing function, e.g. `my_crate::handlers::create_user`
#[macro_export]
macro_rules! function_path {
    () => {{
        fn __autopsy_here() {}
        fn type_name_of<T>(_: T) -> &'static str {
            ::std::any::type_name::<T>()
        }
        $crate::frame::trim_function_path(type_name_of(__autopsy_here))
    }};
}

/// Capture a [`Frame`] at the call site.
///
/// ```rust
/// use autopsy_traceback::frame;
///
/// let user_id = 42;
/// let retries = vec![1, 2];
/// let frame = frame!(user_id, retries, attempts = retries.len());
/// assert_eq!(frame.locals().len(), 3);
/// assert_eq!(frame.locals()[2].value, "2");
/// ```
#[macro_export]
macro_rules! frame {
    () => {
        $crate::Frame::new(file!(), line!(), $crate::function_path!())
    };
    ($($name:ident $(= $value:expr)?),+ $(,)?) => {{
        let mut frame = $crate::Frame::new(file!(), line!(), $crate::function_path!());
        $( $crate::__capture_local!(frame, $name $(= $value)?); )+
        frame
    }};
}

#[doc(hidden)]
#[macro_export]
macro_rules! __capture_local {
    ($frame:ident, $name:ident) => {
        $frame.capture(stringify!($name), &$name)
    };
    ($frame:ident, $name:ident = $value:expr) => {
        $frame.capture(stringify!($name), &$value)
    };
}
