//! # Autopsy Instrument
//!
//! Entry, return and failure logging around any callable, synchronous or
//! `async`, without changing what it returns or how it fails.
//!
//! ## Quick Start
//!
//! ```rust
//! use autopsy_instrument::logged;
//!
//! /// Adds two numbers.
//! #[logged]
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! // Logs "add (2, 3)" then "add returns 5" at DEBUG
//! assert_eq!(add(2, 3), 5);
//! ```
//!
//! `Result`-returning functions log an `Err` as a failure and hand it back
//! unchanged; a panic is logged and resumed. `async fn`s are awaited inside
//! the wrapper, so the exit line follows the real completion.
//!
//! Events go through `tracing`; each call runs inside an `instrumented`
//! span carrying `function` and a unique `call_id`.

pub mod args;
pub mod call;
pub mod callable;

pub use args::Args;
pub use autopsy_macros::logged;
pub use call::Instrumentation;
pub use callable::{instrument, instrument_async, Instrumented, InstrumentedAsync};
pub use tracing::Level;
