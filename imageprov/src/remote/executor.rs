//! Remote execution channel.

use async_trait::async_trait;
use imageprov_shared::errors::ProvisionResult;
use tokio::io::AsyncRead;

/// Describes an upload for executors that need it (permissions, progress).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadMetadata {
    /// Base name of the local file.
    pub file_name: String,
    /// Size in bytes of the content stream.
    pub size: u64,
}

/// Command and file-transfer channel to the target machine.
///
/// Implementations report channel failures as
/// [`imageprov_shared::ProvisionError::Transport`] (or `Upload` for
/// transfers) so the engine can retry them. A command that ran returns its
/// exit status, whatever it is.
#[async_trait]
pub trait RemoteExecutor: Send + Sync {
    /// Store `content` at `remote_path` on the target, replacing any file.
    async fn upload(
        &self,
        remote_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
        metadata: &UploadMetadata,
    ) -> ProvisionResult<()>;

    /// Run `command` to completion and return its exit status.
    async fn run(&self, command: &str) -> ProvisionResult<i32>;
}
