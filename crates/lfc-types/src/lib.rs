//! Shared types for the LFC code generator.
//!
//! This crate defines the resolved reactor model the generator consumes,
//! time values, raw target-property elements, diagnostics, and the
//! case-insensitive lookup used by every name-based table.

mod error;
mod span;
pub mod element;
pub mod lookup;
pub mod model;
pub mod time;

pub use element::{Element, KeyValuePair};
pub use error::{Diagnostic, Diagnostics, ErrorCategory, ErrorCode, Severity, MAX_ERRORS};
pub use span::Span;
pub use time::{TimeUnit, TimeValue};
