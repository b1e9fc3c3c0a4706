//! Error taxonomy for provisioning runs.
//!
//! Errors are categorized by recovery path:
//! - Configuration and preparation errors surface before any remote interaction
//! - Local script I/O errors (stat, open, close, removal) are fatal and never retried
//! - Upload and transport errors are retried within the retry budget
//! - Exit code errors are fatal: the script ran, retrying would run it twice

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the workspace.
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors that can occur during a provisioning run.
///
/// ```ignore
/// match provisioner.provision(&data).await {
///     Err(e) if e.is_retryable() => { /* transport trouble */ }
///     Err(ProvisionError::ExitCode { code, .. }) => { /* script failed */ }
///     Err(ProvisionError::Config(_)) => { /* user should fix options */ }
///     _ => {}
/// }
/// ```
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Invalid or contradictory options.
    #[error("configuration: {0}")]
    Config(String),

    /// Temporary script could not be created or written.
    #[error("error preparing PowerShell script: {0}")]
    Preparation(#[source] io::Error),

    #[error("error stating PowerShell script {path}: {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error opening PowerShell script {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error closing PowerShell script {path}: {source}")]
    Close {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("error removing PowerShell script {path}: {source}")]
    Removal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Remote transfer failed (retryable).
    #[error("error uploading PowerShell script to {remote_path}: {reason}")]
    Upload { remote_path: String, reason: String },

    /// Remote channel failed while running a command (retryable).
    #[error("transport: {0}")]
    Transport(String),

    /// Template rendering failed.
    #[error("template: {0}")]
    Template(String),

    /// Elevation rewrite failed.
    #[error("elevation: {0}")]
    Elevation(String),

    /// Remote command returned a code outside the accepted set.
    #[error("script exited with code {code}; accepted exit codes: {accepted:?}")]
    ExitCode { code: i32, accepted: Vec<i32> },

    /// The target refused or failed to begin rebooting.
    #[error("failed to reboot machine: {0}")]
    RebootInitiation(String),

    /// The run was cancelled by the caller.
    #[error("provisioning cancelled")]
    Cancelled,

    #[error("internal: {0}")]
    Internal(String),
}

impl ProvisionError {
    /// Whether the upload-execute engine may re-attempt after this error.
    ///
    /// Only transfer and channel failures qualify; a script that ran and
    /// returned a disallowed code is never re-run.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProvisionError::Upload { .. } | ProvisionError::Transport(_)
        )
    }

    pub fn stat(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Stat {
            path: path.into(),
            source,
        }
    }

    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    pub fn close(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Close {
            path: path.into(),
            source,
        }
    }

    pub fn removal(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Removal {
            path: path.into(),
            source,
        }
    }

    /// Wrap any failure reported by the executor during a transfer.
    pub fn upload(remote_path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Upload {
            remote_path: remote_path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<io::Error> for ProvisionError {
    fn from(err: io::Error) -> Self {
        ProvisionError::Preparation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(ProvisionError::upload("/tmp/x.ps1", "broken pipe").is_retryable());
        assert!(ProvisionError::Transport("eof".into()).is_retryable());

        assert!(
            !ProvisionError::ExitCode {
                code: 2,
                accepted: vec![0]
            }
            .is_retryable()
        );
        assert!(!ProvisionError::Config("bad".into()).is_retryable());
        assert!(!ProvisionError::stat("/nope", io::Error::other("gone")).is_retryable());
        assert!(!ProvisionError::Cancelled.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = ProvisionError::ExitCode {
            code: 3,
            accepted: vec![0, 3010],
        };
        assert_eq!(
            err.to_string(),
            "script exited with code 3; accepted exit codes: [0, 3010]"
        );

        let err = ProvisionError::upload("C:/Windows/Temp/a.ps1", "connection reset");
        assert!(err.to_string().contains("C:/Windows/Temp/a.ps1"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_io_conversion_is_preparation() {
        let err: ProvisionError = io::Error::new(io::ErrorKind::StorageFull, "disk full").into();
        assert!(matches!(err, ProvisionError::Preparation(_)));
    }
}
