//! Reboot coordination.
//!
//! Drives one reboot of the target through [`RebootState`]: initiate, poll
//! until the target goes down, then wait until it accepts commands again.
//!
//! Progress command exit codes:
//! - `0`: the target is still up and accepted a test reboot; cancel it
//!   (best effort) and validate
//! - `1`: stop waiting and validate
//! - anything else: a reboot is still in progress, keep polling
//!
//! A channel failure while polling means the target is going down.

mod state;

pub use state::RebootState;

use crate::config::RebootConfig;
use crate::remote::{RemoteExecutor, Reporter};
use imageprov_shared::constants::reboot as reboot_const;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use serde::Serialize;
use state::RebootTracker;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of a completed reboot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebootReport {
    /// Exit status of the successful validate command.
    pub exit_code: i32,
    /// States traversed, starting at `Idle`.
    pub path: Vec<RebootState>,
}

/// Runs reboot cycles against one executor.
pub struct RebootCoordinator {
    executor: Arc<dyn RemoteExecutor>,
    reporter: Arc<dyn Reporter>,
    config: RebootConfig,
    cancel: CancellationToken,
}

impl RebootCoordinator {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        reporter: Arc<dyn Reporter>,
        config: RebootConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            reporter,
            config,
            cancel,
        }
    }

    /// Reboot the target and wait until it is usable again.
    ///
    /// # Errors
    ///
    /// - [`ProvisionError::RebootInitiation`] if the initiate command fails
    ///   or returns non-zero; no polling happens
    /// - [`ProvisionError::Cancelled`] if cancellation fires while waiting
    pub async fn reboot(&self) -> ProvisionResult<RebootReport> {
        let mut tracker = RebootTracker::new();

        self.check_cancelled()?;
        tracker.transition_to(RebootState::Initiating)?;
        self.reporter.say(&format!(
            "Initiating machine reboot; command: {}",
            self.config.initiate_command
        ));
        self.initiate().await?;

        if self.config.progress_command.is_empty() {
            self.pause().await?;
        } else {
            tracker.transition_to(RebootState::AwaitingCompletion)?;
            self.reporter.say(&format!(
                "Waiting for machine reboot; command: {}",
                self.config.progress_command
            ));
            self.await_completion().await?;
        }

        tracker.transition_to(RebootState::Validating)?;
        self.reporter.say(&format!(
            "Validating machine reboot; command: {}",
            self.config.validate_command
        ));
        let exit_code = self.validate().await?;

        tracker.transition_to(RebootState::Complete)?;
        self.reporter.say(&format!(
            "Completed machine reboot; exit code: {}",
            exit_code
        ));

        Ok(RebootReport {
            exit_code,
            path: tracker.into_path(),
        })
    }

    async fn initiate(&self) -> ProvisionResult<()> {
        match self.executor.run(&self.config.initiate_command).await {
            Ok(0) => Ok(()),
            Ok(code) => Err(ProvisionError::RebootInitiation(format!(
                "reboot command exited with code {}",
                code
            ))),
            Err(e) => Err(ProvisionError::RebootInitiation(e.to_string())),
        }
    }

    async fn await_completion(&self) -> ProvisionResult<()> {
        loop {
            self.pause().await?;

            match self.executor.run(&self.config.progress_command).await {
                Ok(0) => {
                    self.reporter.say("Machine still up, aborting test reboot");
                    self.cancel_pending().await;
                    return Ok(());
                }
                Ok(reboot_const::EXIT_PENDING) => return Ok(()),
                Ok(code) => {
                    tracing::debug!(exit_code = code, "Reboot still in progress");
                }
                Err(e) => {
                    tracing::debug!(error = %e, "Target unreachable, reboot under way");
                    return Ok(());
                }
            }
        }
    }

    /// Run the complete command, ignoring its outcome.
    async fn cancel_pending(&self) {
        if self.config.complete_command.is_empty() {
            return;
        }
        match self.executor.run(&self.config.complete_command).await {
            Ok(code) => tracing::debug!(exit_code = code, "Reboot complete command finished"),
            Err(e) => tracing::debug!(error = %e, "Reboot complete command failed"),
        }
    }

    async fn validate(&self) -> ProvisionResult<i32> {
        loop {
            self.check_cancelled()?;
            match self.executor.run(&self.config.validate_command).await {
                Ok(0) => return Ok(0),
                Ok(code) => tracing::debug!(exit_code = code, "Target not ready yet"),
                Err(e) => tracing::debug!(error = %e, "Target not reachable yet"),
            }
            self.pause().await?;
        }
    }

    async fn pause(&self) -> ProvisionResult<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ProvisionError::Cancelled),
            _ = tokio::time::sleep(self.config.poll_interval) => Ok(()),
        }
    }

    fn check_cancelled(&self) -> ProvisionResult<()> {
        if self.cancel.is_cancelled() {
            Err(ProvisionError::Cancelled)
        } else {
            Ok(())
        }
    }
}
