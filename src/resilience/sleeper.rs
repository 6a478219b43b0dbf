//! Interruptible waits for backoff and pacing

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Completed,
    Interrupted,
}

/// Blocking wait used by the engine and the pipelines
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Waits for `duration` unless shutdown is requested first
    async fn sleep(&self, duration: Duration) -> SleepOutcome;

    /// True once an external shutdown has been requested
    fn is_shutdown(&self) -> bool;
}

/// Real-time sleeper racing the timer against a shutdown token
#[derive(Debug, Clone, Default)]
pub struct TokioSleeper {
    shutdown: CancellationToken,
}

impl TokioSleeper {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) -> SleepOutcome {
        tokio::select! {
            biased;

            _ = self.shutdown.cancelled() => {
                tracing::debug!("Sleep of {:?} interrupted by shutdown", duration);
                SleepOutcome::Interrupted
            }
            _ = tokio::time::sleep(duration) => SleepOutcome::Completed,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

/// Sleeper that records requested waits and returns immediately
///
/// Clones share the same record, so a test can keep a handle while the
/// engine owns another. Also usable for dry runs against local fixtures.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
    shutdown: CancellationToken,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shutdown(shutdown: CancellationToken) -> Self {
        Self {
            waits: Arc::default(),
            shutdown,
        }
    }

    /// Every wait requested so far, in order
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    /// Sum of all requested waits
    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) -> SleepOutcome {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }

        if self.shutdown.is_cancelled() {
            SleepOutcome::Interrupted
        } else {
            SleepOutcome::Completed
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
