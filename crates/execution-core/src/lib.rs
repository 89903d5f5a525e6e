//! Fault-tolerant execution of venue calls.
//!
//! - **RetryPolicy**: `critical()` (bounded) and `forever()` (unbounded)
//!   backoff policies
//! - **RetryScheduler**: runs a venue call, classifies failures, and retries
//!   the transient ones under a policy
//! - **PendingOperation / CancelHandle**: per-call retry state and
//!   cooperative cancellation
//! - **KeyedLocks**: per-key serialization for order ids and placement slots
//!
//! # Retry semantics
//!
//! A fatal classification ends the call at once, on any policy. A critical
//! policy with `max_attempts = n` makes at most `n` attempts and then
//! surfaces `RetryError::Exhausted`. A forever policy only stops on success,
//! a fatal failure, or cancellation.

mod error;
mod keyed;
mod pending;
mod policy;
mod scheduler;

pub use error::RetryError;
pub use keyed::{create_keyed_locks, KeyGuard, KeyedLocks, SharedKeyedLocks};
pub use pending::{CancelHandle, PendingOperation};
pub use policy::{PolicyKind, RetryPolicy};
pub use scheduler::RetryScheduler;
