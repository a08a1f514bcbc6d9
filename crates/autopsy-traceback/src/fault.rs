//! Error records that carry their own traceback

use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;

/// How a prior fault relates to the one that links to it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    /// The prior fault was the direct cause
    CausedBy,
    /// The fault occurred while the prior one was being handled
    DuringHandling,
}

impl Relation {
    /// Separator printed between the prior fault and the one that follows it
    pub fn banner(self) -> &'static str {
        match self {
            Relation::CausedBy => {
                "\nThe above error was the direct cause of the following error:\n\n"
            }
            Relation::DuringHandling => {
                "\nDuring handling of the above error, another error occurred:\n\n"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Link {
    relation: Relation,
    fault: Fault,
}

/// An error record with its traceback.
///
/// Frames are attached innermost first as the fault propagates outward.
/// `Fault` deliberately does not implement [`std::error::Error`], so that
/// any error converts into it with `?`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    kind: String,
    message: String,
    frames: Vec<Frame>,
    prior: Option<Box<Link>>,
}

impl Fault {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            frames: Vec::new(),
            prior: None,
        }
    }

    /// Convert a standard error, turning its `source()` chain into caused-by links
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        Self::new(short_type_name::<E>(), error.to_string()).with_sources(error.source())
    }

    /// Convert a type-erased error such as `Box<dyn Error>` or
    /// `anyhow::Error` (via `&*error`).
    ///
    /// The concrete type is unknown, so the kind is read off the error's
    /// `Debug` rendering. The `source()` chain becomes caused-by links.
    pub fn from_dyn(error: &(dyn StdError + 'static)) -> Self {
        Self::new(kind_from_debug(error), error.to_string()).with_sources(error.source())
    }

    fn with_sources(self, first: Option<&(dyn StdError + 'static)>) -> Self {
        let mut sources = Vec::new();
        let mut source = first;
        while let Some(cause) = source {
            sources.push(Self::new(kind_from_debug(cause), cause.to_string()));
            source = cause.source();
        }

        // The deepest source is the oldest cause
        let mut prior: Option<Fault> = None;
        for cause in sources.into_iter().rev() {
            prior = Some(match prior {
                Some(older) => cause.caused_by(older),
                None => cause,
            });
        }

        match prior {
            Some(prior) => self.caused_by(prior),
            None => self,
        }
    }

    /// Record `prior` as the direct cause of this fault
    pub fn caused_by(mut self, prior: Fault) -> Self {
        self.prior = Some(Box::new(Link {
            relation: Relation::CausedBy,
            fault: prior,
        }));
        self
    }

    /// Record that this fault occurred while `prior` was being handled
    pub fn during(mut self, prior: Fault) -> Self {
        self.prior = Some(Box::new(Link {
            relation: Relation::DuringHandling,
            fault: prior,
        }));
        self
    }

    /// Attach the next frame outward
    pub fn push_frame(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.push_frame(frame);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Frames innermost first, in attachment order
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn prior(&self) -> Option<(Relation, &Fault)> {
        self.prior
            .as_deref()
            .map(|link| (link.relation, &link.fault))
    }

    /// Every fault in the chain, oldest cause first. Each entry carries the
    /// relation to the fault before it.
    pub fn chain(&self) -> Vec<(Option<Relation>, &Fault)> {
        let mut newest_first = vec![self];
        let mut relations = Vec::new();
        let mut current = self;
        while let Some((relation, prior)) = current.prior() {
            relations.push(relation);
            newest_first.push(prior);
            current = prior;
        }

        let mut chain = Vec::with_capacity(newest_first.len());
        for (index, fault) in newest_first.iter().enumerate().rev() {
            chain.push((relations.get(index).copied(), *fault));
        }
        chain
    }

    /// Machine-readable representation, e.g. `ValueError("bad input")`
    pub fn repr(&self) -> String {
        format!("{}({:?})", self.kind, self.message)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl<E> From<E> for Fault
where
    E: StdError + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::from_error(&error)
    }
}

/// Attach frames to errors as they propagate
pub trait ResultExt<T> {
    /// Convert the error into a [`Fault`] and attach the frame built by `frame`.
    /// The closure only runs on the error path.
    fn at<F>(self, frame: F) -> Result<T, Fault>
    where
        F: FnOnce() -> Frame;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Fault>,
{
    fn at<F>(self, frame: F) -> Result<T, Fault>
    where
        F: FnOnce() -> Frame,
    {
        self.map_err(|error| error.into().with_frame(frame()))
    }
}

/// Build a [`Fault`] whose kind is a literal identifier.
///
/// ```rust
/// use autopsy_traceback::fault;
///
/// let limit = 10;
/// let fault = fault!(LimitExceeded, "limit {} reached", limit);
/// assert_eq!(fault.to_string(), "LimitExceeded: limit 10 reached");
/// ```
#[macro_export]
macro_rules! fault {
    ($kind:ident, $($arg:tt)+) => {
        $crate::Fault::new(stringify!($kind), format!($($arg)+))
    };
    ($kind:ident) => {
        $crate::Fault::new(stringify!($kind), String::new())
    };
}

fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

/// Best guess at a type name for a `dyn Error`: the leading identifier of its
/// `Debug` rendering, e.g. `Custom` from `Custom { kind: Other, .. }`.
fn kind_from_debug(error: &dyn StdError) -> String {
    let rendered = format!("{:?}", error);
    let ident: String = rendered
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();

    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        "Error".to_string()
    } else {
        ident
    }
}
