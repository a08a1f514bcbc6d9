//! Argument and value rendering for call log lines

use std::any::Any;
use std::fmt;

/// Arguments of one invocation, rendered when the call starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    rendered: Rendered,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Rendered {
    List(Vec<String>),
    Value(String),
}

impl Args {
    /// An empty argument list, to be extended with [`Args::arg`]
    pub fn new() -> Self {
        Self {
            rendered: Rendered::List(Vec::new()),
        }
    }

    /// Arguments passed as a single value, typically a tuple such as `(2, 3)`
    pub fn value<T: fmt::Debug + ?Sized>(value: &T) -> Self {
        Self {
            rendered: Rendered::Value(render(&value)),
        }
    }

    /// Append one positional argument
    pub fn arg<T: fmt::Debug + ?Sized>(mut self, value: &T) -> Self {
        let value = render(&value);
        match &mut self.rendered {
            Rendered::List(parts) => parts.push(value),
            Rendered::Value(_) => self.rendered = Rendered::List(vec![value]),
        }
        self
    }

    /// Append a placeholder for an argument that is not rendered
    pub fn skipped(self) -> Self {
        self.arg(&Placeholder)
    }
}

impl Default for Args {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuple-style rendering: `()`, `(1,)`, `(1, 2)`
impl fmt::Display for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rendered {
            Rendered::Value(value) => f.write_str(value),
            Rendered::List(parts) if parts.len() == 1 => write!(f, "({},)", parts[0]),
            Rendered::List(parts) => write!(f, "({})", parts.join(", ")),
        }
    }
}

struct Placeholder;

impl fmt::Debug for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("_")
    }
}

/// `Debug` rendering that never panics on a failing impl
pub(crate) fn render(value: &dyn fmt::Debug) -> String {
    let mut rendered = String::new();
    match fmt::write(&mut rendered, format_args!("{:?}", value)) {
        Ok(()) => rendered,
        Err(_) => "<Debug failed>".to_string(),
    }
}

/// Whether a rendered return value stands for "nothing was returned"
pub(crate) fn is_none_like(rendered: &str) -> bool {
    rendered == "()" || rendered == "None"
}

/// `panic("message")` for a panic payload
pub(crate) fn panic_repr(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Box<dyn Any>".to_string()
    };
    format!("panic({:?})", message)
}
