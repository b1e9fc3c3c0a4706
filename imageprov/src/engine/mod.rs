//! Upload-execute engine.
//!
//! Uploads one local script to its remote location and runs the rendered
//! command, retrying transfer and channel failures within a [`RetryPolicy`].
//! Every attempt re-reads the script from byte 0.

mod retry;

pub use retry::{RetryBudget, RetryPolicy};

use crate::remote::{RemoteExecutor, Reporter, UploadMetadata};
use crate::render::RenderedCommand;
use crate::script::{RemoteTarget, ScriptSource};
use crate::types::ExitCodes;
use imageprov_shared::constants::exit_codes;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// How the engine treats the remote exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExitCheck {
    /// Fail with [`ProvisionError::ExitCode`] outside the accepted set.
    #[default]
    Accepted,
    /// Return the status unvalidated; the caller interprets it.
    Any,
}

/// One script to upload and, unless `command` is `None`, execute.
#[derive(Debug)]
pub struct ScriptJob {
    pub source: ScriptSource,
    pub target: RemoteTarget,
    pub command: Option<RenderedCommand>,
    pub check: ExitCheck,
    /// Name used when reporting the exit code; defaults to the file name.
    pub label: Option<String>,
}

impl ScriptJob {
    pub fn new(source: ScriptSource, target: RemoteTarget, command: RenderedCommand) -> Self {
        Self {
            source,
            target,
            command: Some(command),
            check: ExitCheck::Accepted,
            label: None,
        }
    }

    /// Stage a file without running anything.
    pub fn upload_only(source: ScriptSource, target: RemoteTarget) -> Self {
        Self {
            source,
            target,
            command: None,
            check: ExitCheck::Any,
            label: None,
        }
    }

    pub fn with_check(mut self, check: ExitCheck) -> Self {
        self.check = check;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Drives upload-execute cycles against one executor.
#[derive(Clone)]
pub struct ScriptRunner {
    executor: Arc<dyn RemoteExecutor>,
    retry: RetryPolicy,
    accepted: ExitCodes,
    cancel: CancellationToken,
    reporter: Option<Arc<dyn Reporter>>,
}

impl ScriptRunner {
    pub fn new(
        executor: Arc<dyn RemoteExecutor>,
        retry: RetryPolicy,
        accepted: ExitCodes,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            executor,
            retry,
            accepted,
            cancel,
            reporter: None,
        }
    }

    /// Report every exit code through `reporter` before it is validated.
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = Some(reporter);
        self
    }

    pub fn executor(&self) -> &Arc<dyn RemoteExecutor> {
        &self.executor
    }

    /// Upload the job's script and run its command.
    ///
    /// Returns the exit status, or [`exit_codes::NOT_RUN`] for an upload-only
    /// job. The status is reported before it is checked. On success the local
    /// handle is closed and a transient source is deleted; on failure both are
    /// released on drop.
    ///
    /// # Errors
    ///
    /// - `Stat`/`Open` for local script problems (never retried)
    /// - `Upload`/`Transport` once the retry budget is spent
    /// - `ExitCode` for an unaccepted status (never retried)
    /// - `Cancelled` if cancellation fires before an attempt or during backoff
    pub async fn upload_and_execute(&self, job: ScriptJob) -> ProvisionResult<i32> {
        let ScriptJob {
            source,
            target,
            command,
            check,
            label,
        } = job;

        let path = source.path().to_path_buf();
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(|e| ProvisionError::stat(&path, e))?;

        let remote_path = target.resolve(&source);
        let upload = UploadMetadata {
            file_name: source.file_name(),
            size: metadata.len(),
        };

        let mut file = File::open(&path)
            .await
            .map_err(|e| ProvisionError::open(&path, e))?;

        let mut budget = self.retry.start();
        let code = loop {
            let attempt = budget.begin(&self.cancel)?;
            match self
                .attempt(&mut file, &path, &remote_path, &upload, command.as_ref())
                .await
            {
                Ok(code) => break code,
                Err(e) if e.is_retryable() && budget.can_retry() => {
                    tracing::warn!(
                        script = %path.display(),
                        remote_path = %remote_path,
                        attempt,
                        error = %e,
                        "Attempt failed, retrying"
                    );
                    budget.backoff(&self.cancel).await?;
                }
                Err(e) => return Err(e),
            }
        };

        tracing::debug!(
            script = %path.display(),
            remote_path = %remote_path,
            attempts = budget.attempts(),
            exit_code = code,
            "Script executed"
        );

        if let Some(reporter) = self.reporter.as_ref().filter(|_| command.is_some()) {
            let label = label.unwrap_or_else(|| source.file_name());
            reporter.say(&format!("{} exited with code {}", label, code));
        }

        if check == ExitCheck::Accepted {
            self.accepted.check(code)?;
        }

        file.shutdown()
            .await
            .map_err(|e| ProvisionError::close(&path, e))?;
        drop(file);
        source.finish()?;

        Ok(code)
    }

    async fn attempt(
        &self,
        file: &mut File,
        path: &Path,
        remote_path: &str,
        upload: &UploadMetadata,
        command: Option<&RenderedCommand>,
    ) -> ProvisionResult<i32> {
        file.seek(SeekFrom::Start(0))
            .await
            .map_err(|e| ProvisionError::open(path, e))?;

        self.executor
            .upload(remote_path, file, upload)
            .await
            .map_err(|e| match e {
                ProvisionError::Transport(reason) => ProvisionError::upload(remote_path, reason),
                other => other,
            })?;

        let Some(command) = command else {
            return Ok(exit_codes::NOT_RUN);
        };
        let command = command.finalize()?;
        self.executor.run(&command).await
    }
}
