use async_trait::async_trait;
use imageprov::remote::{RemoteExecutor, UploadMetadata};
use imageprov_shared::{ProvisionError, ProvisionResult};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Scripted outcome of a `run` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Exit(i32),
    /// The channel drops while the command runs.
    Disconnect,
}

/// One interaction with the executor, in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Upload { path: String, content: String },
    Run { command: String },
}

struct Script {
    needle: String,
    replies: VecDeque<Reply>,
}

struct UploadFailure {
    remaining: usize,
    partial_bytes: usize,
}

type RunHook = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Default)]
struct State {
    calls: Vec<RemoteCall>,
    scripts: Vec<Script>,
    upload_failure: Option<UploadFailure>,
    hook: Option<RunHook>,
}

/// Executor with scripted replies.
///
/// Commands are matched against registered needles by substring, first
/// registration wins. Each needle's replies are consumed in order and the
/// last one repeats. Unmatched commands exit 0.
#[derive(Default)]
pub struct MockExecutor {
    state: Mutex<State>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script replies for commands containing `needle`.
    pub fn respond(&self, needle: &str, replies: impl IntoIterator<Item = Reply>) {
        self.state.lock().scripts.push(Script {
            needle: needle.to_string(),
            replies: replies.into_iter().collect(),
        });
    }

    /// Fail the next `count` uploads after reading `partial_bytes` of content.
    pub fn fail_uploads(&self, count: usize, partial_bytes: usize) {
        self.state.lock().upload_failure = Some(UploadFailure {
            remaining: count,
            partial_bytes,
        });
    }

    /// Invoke `hook` with every command before it is answered.
    pub fn on_run(&self, hook: impl Fn(&str) + Send + Sync + 'static) {
        self.state.lock().hook = Some(Arc::new(hook));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.state.lock().calls.clone()
    }

    pub fn run_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Run { command } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn uploaded_paths(&self) -> Vec<String> {
        self.uploads().into_iter().map(|(path, _)| path).collect()
    }

    /// Successful uploads as `(path, content)`.
    pub fn uploads(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                RemoteCall::Upload { path, content } => Some((path.clone(), content.clone())),
                _ => None,
            })
            .collect()
    }

    /// Number of commands that contained `needle`.
    pub fn count_runs(&self, needle: &str) -> usize {
        self.run_commands()
            .iter()
            .filter(|c| c.contains(needle))
            .count()
    }

    fn next_reply(&self, command: &str) -> Reply {
        let mut state = self.state.lock();
        let Some(script) = state
            .scripts
            .iter_mut()
            .find(|s| command.contains(&s.needle))
        else {
            return Reply::Exit(0);
        };

        if script.replies.len() > 1 {
            script.replies.pop_front().unwrap_or(Reply::Exit(0))
        } else {
            script.replies.front().copied().unwrap_or(Reply::Exit(0))
        }
    }

    fn take_upload_failure(&self) -> Option<usize> {
        let mut state = self.state.lock();
        let failure = state.upload_failure.as_mut()?;
        if failure.remaining == 0 {
            return None;
        }
        failure.remaining -= 1;
        Some(failure.partial_bytes)
    }
}

#[async_trait]
impl RemoteExecutor for MockExecutor {
    async fn upload(
        &self,
        remote_path: &str,
        content: &mut (dyn AsyncRead + Send + Unpin),
        _metadata: &UploadMetadata,
    ) -> ProvisionResult<()> {
        if let Some(partial) = self.take_upload_failure() {
            let mut buf = Vec::new();
            (&mut *content)
                .take(partial as u64)
                .read_to_end(&mut buf)
                .await?;
            return Err(ProvisionError::upload(remote_path, "connection reset"));
        }

        let mut buf = Vec::new();
        content.read_to_end(&mut buf).await?;
        self.state.lock().calls.push(RemoteCall::Upload {
            path: remote_path.to_string(),
            content: String::from_utf8_lossy(&buf).into_owned(),
        });
        Ok(())
    }

    async fn run(&self, command: &str) -> ProvisionResult<i32> {
        let hook = self.state.lock().hook.clone();
        if let Some(hook) = hook {
            hook(command);
        }

        self.state.lock().calls.push(RemoteCall::Run {
            command: command.to_string(),
        });

        match self.next_reply(command) {
            Reply::Exit(code) => Ok(code),
            Reply::Disconnect => Err(ProvisionError::Transport("connection lost".into())),
        }
    }
}
