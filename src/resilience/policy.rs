//! Retry decisions
//!
//! Classification of a failed call into "wait and retry" or "abort" is kept
//! free of clocks and sleeping so it can be exercised directly.
//!
//! | Failure | Action |
//! |---------|--------|
//! | Network error | Retry after the fixed network delay |
//! | Rate limited | Retry after advertised wait + slack, abort after budget |
//! | 404 / 403 / 401 | Abort immediately |
//! | Anything else | Retry after the fixed network delay, abort after budget |

use crate::api::ApiError;
use crate::config::RetryConfig;
use crate::resilience::FailureCode;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Pagination discipline a pipeline drives the API with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// Fixed-size pages addressed by a 1-based index
    PageIndex { page_size: u32 },

    /// Pages addressed by an opaque continuation token
    Cursor,
}

impl fmt::Display for Pagination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PageIndex { page_size } => write!(f, "page-index (size {})", page_size),
            Self::Cursor => f.write_str("cursor"),
        }
    }
}

/// Why a unit of work was abandoned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AbortCause {
    #[error("rate limit retries exhausted")]
    RateLimitExhausted,

    #[error("access denied ({0})")]
    Denied(FailureCode),

    #[error("retries exhausted ({0})")]
    RetriesExhausted(FailureCode),

    #[error("shutdown requested")]
    Shutdown,
}

impl AbortCause {
    pub fn to_db_string(&self) -> String {
        match self {
            Self::RateLimitExhausted => "rate_limit_exhausted".to_string(),
            Self::Denied(code) => format!("denied:{}", code.to_db_string()),
            Self::RetriesExhausted(code) => format!("exhausted:{}", code.to_db_string()),
            Self::Shutdown => "shutdown".to_string(),
        }
    }
}

/// Consecutive failure counters for one unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub consecutive_failures: u32,
    pub consecutive_rate_limits: u32,
    pub retryable: bool,
}

impl Default for RetryState {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            consecutive_rate_limits: 0,
            retryable: true,
        }
    }
}

impl RetryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the counters after the unit of work succeeded
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// What to do about a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Wait for `wait`, then invoke the same call again
    Retry { wait: Duration },

    /// Abandon the unit of work
    Abort(AbortCause),
}

/// Retry budget and delays shared by every pagination strategy
///
/// Only the slack added to rate-limit waits depends on the strategy of the
/// call that was throttled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum retries per unit of work
    pub retry_budget: u32,

    /// Fixed delay after a transient failure
    pub network_delay: Duration,

    /// Added to rate-limit waits of page-index calls
    pub page_index_slack: Duration,

    /// Added to rate-limit waits of cursor calls
    pub cursor_slack: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            retry_budget: config.budget,
            network_delay: Duration::from_millis(config.network_delay_ms),
            page_index_slack: Duration::from_secs(config.page_index_slack_secs),
            cursor_slack: Duration::from_secs(config.cursor_slack_secs),
        }
    }

    /// Slack added on top of a server-advertised rate-limit wait
    pub fn rate_limit_slack(&self, pagination: Pagination) -> Duration {
        match pagination {
            Pagination::PageIndex { .. } => self.page_index_slack,
            Pagination::Cursor => self.cursor_slack,
        }
    }

    /// Classifies `error` from a `pagination` call and advances the counters in `state`
    pub fn decide(&self, state: &mut RetryState, error: &ApiError, pagination: Pagination) -> Decision {
        let decision = match error {
            ApiError::RateLimited { retry_after } => {
                state.consecutive_rate_limits += 1;
                if state.consecutive_rate_limits > self.retry_budget {
                    Decision::Abort(AbortCause::RateLimitExhausted)
                } else {
                    Decision::Retry {
                        wait: *retry_after + self.rate_limit_slack(pagination),
                    }
                }
            }
            e if e.is_denied() => Decision::Abort(AbortCause::Denied(e.code())),
            e => {
                state.consecutive_failures += 1;
                if state.consecutive_failures > self.retry_budget {
                    Decision::Abort(AbortCause::RetriesExhausted(e.code()))
                } else {
                    Decision::Retry {
                        wait: self.network_delay,
                    }
                }
            }
        };

        state.retryable = matches!(decision, Decision::Retry { .. });
        decision
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(&RetryConfig::default())
    }
}
