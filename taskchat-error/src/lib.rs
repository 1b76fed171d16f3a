//! # taskchat-error
//!
//! Unified error handling for taskchat.
//!
//! ## Design Philosophy
//!
//! - **ErrorKind**: Know what went wrong (e.g., InvalidTask, NetworkFailed)
//! - **ErrorStatus**: Decide how to handle it (Permanent, Temporary)
//! - **Error Context**: Key-value pairs that help locate the cause
//! - **Error Source**: Wrap underlying errors without leaking raw types
//!
//! ## Usage
//!
//! ```rust
//! use taskchat_error::{Error, ErrorKind};
//!
//! fn example() -> Result<(), Error> {
//!     Err(Error::new(ErrorKind::InvalidTask, "task must not be empty")
//!         .with_operation("runner::submit")
//!         .with_context("index", "2"))
//! }
//! ```
//!
//! ## Principles
//!
//! - All fallible functions return `Result<T, taskchat_error::Error>`
//! - External errors are wrapped with `set_source(err)`
//! - Same error handled once, callers further up only append context
//! - Don't abuse `From<OtherError>`; raw errors should not leak through

mod error;
mod kind;
mod status;

pub use error::Error;
pub use kind::ErrorKind;
pub use status::ErrorStatus;

/// Result type alias using the taskchat Error
pub type Result<T> = std::result::Result<T, Error>;
