//! Bounded retry for the upload-execute attempt body.
//!
//! A policy bounds both the number of attempts and the total wall-clock
//! budget. The budget is only consulted between attempts: an attempt in
//! flight always runs to completion.

use imageprov_shared::constants::retry as retry_const;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Attempt bounds for one upload-execute sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total budget measured from the first attempt.
    pub start_timeout: Duration,
    /// Maximum attempts; `1` disables retries.
    pub tries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            start_timeout: retry_const::DEFAULT_START_TIMEOUT,
            tries: retry_const::DEFAULT_TRIES,
            initial_backoff: retry_const::INITIAL_BACKOFF,
            max_backoff: retry_const::MAX_BACKOFF,
        }
    }
}

impl RetryPolicy {
    pub fn new(start_timeout: Duration, tries: u32) -> Self {
        Self {
            start_timeout,
            tries: tries.max(1),
            ..Default::default()
        }
    }

    /// Override the backoff bounds.
    pub fn with_backoff(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max.max(initial);
        self
    }

    /// Start tracking a new attempt sequence.
    pub fn start(&self) -> RetryBudget {
        RetryBudget {
            deadline: Instant::now() + self.start_timeout,
            tries: self.tries.max(1),
            attempts: 0,
            next_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }
}

/// Live state of one attempt sequence.
#[derive(Debug)]
pub struct RetryBudget {
    deadline: Instant,
    tries: u32,
    attempts: u32,
    next_backoff: Duration,
    max_backoff: Duration,
}

impl RetryBudget {
    /// Register the start of an attempt; returns its 1-based number.
    ///
    /// Fails with [`ProvisionError::Cancelled`] once the token fires, so no
    /// attempt starts after cancellation.
    pub fn begin(&mut self, cancel: &CancellationToken) -> ProvisionResult<u32> {
        if cancel.is_cancelled() {
            return Err(ProvisionError::Cancelled);
        }
        self.attempts += 1;
        Ok(self.attempts)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether another attempt fits in both the count and time budget.
    pub fn can_retry(&self) -> bool {
        self.attempts < self.tries && Instant::now() < self.deadline
    }

    /// Sleep before the next attempt, waking early on cancellation.
    ///
    /// The sleep never extends past the deadline.
    pub async fn backoff(&mut self, cancel: &CancellationToken) -> ProvisionResult<()> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        let delay = self.next_backoff.min(remaining);
        self.next_backoff = (self.next_backoff * 2).min(self.max_backoff);

        tokio::select! {
            _ = cancel.cancelled() => Err(ProvisionError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}
