//! Resilient call execution.
//!
//! Every backend interaction in the crate goes through a
//! [`CallExecutor`], which applies a uniform resilience contract
//! independent of what the call does: a per-attempt timeout, bounded
//! retries with linear backoff, and at-most-one-in-flight supersession so
//! stale responses can never race ahead of newer requests.

pub mod auth;
pub mod error;
pub mod executor;

pub use auth::AuthContext;
pub use error::{CallError, TerminalFailure};
pub use executor::{CallExecutor, CallOutcome, CallPolicy};
