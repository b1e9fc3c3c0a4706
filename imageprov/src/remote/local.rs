//! Executor that treats the local host as the target.

use super::{RemoteExecutor, UploadMetadata};
use async_trait::async_trait;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;

/// Runs commands through the platform shell with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }

    fn shell(command: &str) -> Command {
        #[cfg(windows)]
        {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        }
        #[cfg(not(windows))]
        {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        }
    }
}

#[async_trait]
impl RemoteExecutor for LocalExecutor {
    async fn upload(
        &self,
        remote_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
        metadata: &UploadMetadata,
    ) -> ProvisionResult<()> {
        let path = Path::new(remote_path);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ProvisionError::upload(remote_path, e))?;
        }

        let mut file = tokio::fs::File::create(path)
            .await
            .map_err(|e| ProvisionError::upload(remote_path, e))?;
        let written = tokio::io::copy(content, &mut file)
            .await
            .map_err(|e| ProvisionError::upload(remote_path, e))?;
        file.flush()
            .await
            .map_err(|e| ProvisionError::upload(remote_path, e))?;

        tracing::debug!(
            remote_path,
            file_name = %metadata.file_name,
            bytes = written,
            "Copied script"
        );
        Ok(())
    }

    async fn run(&self, command: &str) -> ProvisionResult<i32> {
        tracing::debug!(command, "Running local command");

        let status = Self::shell(command)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| ProvisionError::Transport(format!("failed to spawn shell: {}", e)))?;

        status
            .code()
            .ok_or_else(|| ProvisionError::Transport(format!("command terminated by {}", status)))
    }
}
