//! Reboot lifecycle state and transitions.

use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};

/// Phase of one reboot cycle.
///
/// ```text
/// Idle → Initiating → AwaitingCompletion → Validating → Complete
///                   ↘──────────────────↗ (no progress command)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebootState {
    Idle,

    /// Initiate command sent.
    Initiating,

    /// Polling the progress command until the target goes down.
    AwaitingCompletion,

    /// Waiting for the target to accept commands again.
    Validating,

    Complete,
}

impl RebootState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RebootState::Complete)
    }

    /// Check if transition to target state is valid.
    pub fn can_transition_to(&self, target: RebootState) -> bool {
        use RebootState::*;
        matches!(
            (self, target),
            (Idle, Initiating)
                | (Initiating, AwaitingCompletion)
                | (Initiating, Validating)
                | (AwaitingCompletion, Validating)
                | (Validating, Complete)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RebootState::Idle => "idle",
            RebootState::Initiating => "initiating",
            RebootState::AwaitingCompletion => "awaiting_completion",
            RebootState::Validating => "validating",
            RebootState::Complete => "complete",
        }
    }
}

impl std::fmt::Display for RebootState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Current state plus the path traversed so far.
#[derive(Debug, Clone)]
pub(super) struct RebootTracker {
    path: Vec<RebootState>,
}

impl RebootTracker {
    pub(super) fn new() -> Self {
        Self {
            path: vec![RebootState::Idle],
        }
    }

    pub(super) fn current(&self) -> RebootState {
        self.path.last().copied().unwrap_or(RebootState::Idle)
    }

    /// Attempt state transition with validation.
    pub(super) fn transition_to(&mut self, next: RebootState) -> ProvisionResult<()> {
        let current = self.current();
        if !current.can_transition_to(next) {
            return Err(ProvisionError::Internal(format!(
                "Cannot transition reboot from {} to {}",
                current, next
            )));
        }
        tracing::debug!(from = %current, state = %next, "Reboot state changed");
        self.path.push(next);
        Ok(())
    }

    pub(super) fn into_path(self) -> Vec<RebootState> {
        self.path
    }
}
