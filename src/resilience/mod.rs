//! Resilience engine for rate-limited remote calls
//!
//! This module contains everything that decides what happens after a remote
//! call fails:
//! - A pure retry policy that classifies failures per pagination strategy
//! - Per-unit retry counters with a hard budget
//! - Interruptible sleeping for backoff and pacing
//! - A process-wide tally of failure causes

mod engine;
mod policy;
mod sleeper;
mod tally;

pub use engine::{Outcome, ResilienceEngine};
pub use policy::{AbortCause, Decision, Pagination, RetryPolicy, RetryState};
pub use sleeper::{RecordingSleeper, SleepOutcome, Sleeper, TokioSleeper};
pub use tally::{ErrorTally, FailureCode};
