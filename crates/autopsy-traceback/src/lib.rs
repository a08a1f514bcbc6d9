//! # Autopsy Traceback
//!
//! Detailed, noise-filtered error tracebacks that carry the local state of
//! every frame an error propagated through.
//!
//! Rust keeps no frame locals once a function returns, so capture is
//! explicit: attach a [`Frame`] at each `?` site with [`ResultExt::at`] and
//! the [`frame!`] macro, then render the resulting [`Fault`] with
//! [`format_traceback`] or a [`TracebackFormatter`].
//!
//! ## Features
//!
//! - **Frame locals**: `Debug` renderings captured while the error unwinds
//! - **Causal chains**: caused-by and during-handling links, oldest first
//! - **Two-stage filtering**: whole frames by trace markers, single lines by
//!   local markers
//! - **Ambient context**: format "the error currently being handled"
//!
//! ## Quick Start
//!
//! ```rust
//! use autopsy_traceback::{format_traceback, frame, Exclusions, Fault, ResultExt};
//!
//! fn parse_port(raw: &str) -> Result<u16, Fault> {
//!     let trimmed = raw.trim();
//!     trimmed.parse::<u16>().at(|| frame!(raw, trimmed))
//! }
//!
//! let fault = parse_port("http").unwrap_err();
//! let report = format_traceback(Some(&fault), &Exclusions::default()).unwrap();
//! assert!(report.contains("trimmed = \"http\""));
//! assert!(report.ends_with("ParseIntError: invalid digit found in string"));
//! ```

pub mod context;
pub mod exclusion;
pub mod fault;
pub mod filter;
pub mod formatter;
pub mod frame;
pub mod source;

pub use exclusion::{ExclusionList, Exclusions, DEFAULT_LOCALS, DEFAULT_TRACES};
pub use fault::{Fault, Relation, ResultExt};
pub use formatter::{describe, format_traceback, TracebackFormatter};
pub use frame::{Frame, Local, Location};

/// Result type for traceback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Traceback-specific errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Nothing to format: no fault was given and none is being handled.
    #[error("Invalid state: {message}")]
    InvalidState { message: String },
}
