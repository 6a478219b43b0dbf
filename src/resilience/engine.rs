//! Retry driver wrapping single remote calls

use crate::api::ApiError;
use crate::resilience::{
    AbortCause, Decision, ErrorTally, FailureCode, Pagination, RetryPolicy, RetryState, Sleeper,
};
use std::future::Future;
use std::time::Instant;

/// Result of one invocation through the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The call succeeded
    Success(T),

    /// The call failed, the engine has already waited; invoke it again
    RetryNow,

    /// The unit of work must be abandoned
    Abort(AbortCause),
}

/// Classifies failures, waits, and tallies causes for the whole run
///
/// One engine serves a single worker, so the tally needs no locking.
pub struct ResilienceEngine<S> {
    policy: RetryPolicy,
    sleeper: S,
    tally: ErrorTally,
}

impl<S: Sleeper> ResilienceEngine<S> {
    pub fn new(policy: RetryPolicy, sleeper: S) -> Self {
        Self {
            policy,
            sleeper,
            tally: ErrorTally::new(),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub fn tally(&self) -> &ErrorTally {
        &self.tally
    }

    /// Records a failure detected outside a remote call
    pub fn record(&mut self, code: FailureCode) {
        self.tally.record(code);
    }

    pub fn is_shutdown(&self) -> bool {
        self.sleeper.is_shutdown()
    }

    /// Invokes `op` once and applies the retry policy to its failure
    ///
    /// `pagination` names the discipline of the call, which sets the slack
    /// added to rate-limit waits. On a retry decision the wait happens here,
    /// before returning [`Outcome::RetryNow`]. An interrupted wait counts as
    /// completed.
    pub async fn execute<T, F, Fut>(
        &mut self,
        label: &str,
        pagination: Pagination,
        state: &mut RetryState,
        op: F,
    ) -> Outcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let error = match op().await {
            Ok(value) => {
                state.reset();
                return Outcome::Success(value);
            }
            Err(error) => error,
        };

        self.tally.record(error.code());

        match self.policy.decide(state, &error, pagination) {
            Decision::Retry { wait } => {
                tracing::warn!(
                    "{}: {} (attempt {}), sleeping for {} seconds",
                    label,
                    error,
                    state.consecutive_failures + state.consecutive_rate_limits,
                    wait.as_secs()
                );
                let before = Instant::now();
                self.sleeper.sleep(wait).await;
                tracing::debug!(
                    "{}: woke up after {} seconds",
                    label,
                    before.elapsed().as_secs()
                );
                Outcome::RetryNow
            }
            Decision::Abort(cause) => {
                tracing::warn!("{}: {}, giving up: {}", label, error, cause);
                Outcome::Abort(cause)
            }
        }
    }

    /// Drives one unit of work to success or abort
    ///
    /// Retry counters start fresh for every call. Returns
    /// [`AbortCause::Shutdown`] without invoking `op` again once shutdown has
    /// been requested.
    pub async fn run<T, F, Fut>(
        &mut self,
        label: &str,
        pagination: Pagination,
        mut op: F,
    ) -> Result<T, AbortCause>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut state = RetryState::new();

        loop {
            if self.sleeper.is_shutdown() {
                return Err(AbortCause::Shutdown);
            }

            match self.execute(label, pagination, &mut state, &mut op).await {
                Outcome::Success(value) => return Ok(value),
                Outcome::RetryNow => continue,
                Outcome::Abort(cause) => return Err(cause),
            }
        }
    }

    pub fn into_tally(self) -> ErrorTally {
        self.tally
    }
}
