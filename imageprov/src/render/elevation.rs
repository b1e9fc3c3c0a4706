//! Privilege escalation strategies.
//!
//! Every rendered command carries an [`Elevation`] that produces the final
//! command text right before each execution attempt.

use crate::types::Credentials;
use base64::Engine as _;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::fmt;
use std::sync::Arc;

/// Turns a rendered command into the text actually sent to the executor.
pub trait Elevation: Send + Sync + fmt::Debug {
    fn finalize(&self, command: &str) -> ProvisionResult<String>;
}

/// Rewrites a command so it runs under the elevated account.
pub trait CommandRewriter: Send + Sync + fmt::Debug {
    fn rewrite(&self, command: &str, credentials: &Credentials) -> ProvisionResult<String>;
}

/// No elevated user configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoElevation;

impl Elevation for NoElevation {
    fn finalize(&self, command: &str) -> ProvisionResult<String> {
        Ok(command.to_string())
    }
}

/// The elevated template already performs the escalation (`sudo`).
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateElevation;

impl Elevation for TemplateElevation {
    fn finalize(&self, command: &str) -> ProvisionResult<String> {
        Ok(command.to_string())
    }
}

/// Escalation through a [`CommandRewriter`] applied per attempt.
#[derive(Debug, Clone)]
pub struct RewriteElevation {
    rewriter: Arc<dyn CommandRewriter>,
    credentials: Credentials,
}

impl RewriteElevation {
    pub fn new(rewriter: Arc<dyn CommandRewriter>, credentials: Credentials) -> Self {
        Self {
            rewriter,
            credentials,
        }
    }
}

impl Elevation for RewriteElevation {
    fn finalize(&self, command: &str) -> ProvisionResult<String> {
        self.rewriter.rewrite(command, &self.credentials)
    }
}

/// Runs the command as a one-shot Windows scheduled task under the elevated
/// account and exits with the task's result.
///
/// The wrapper script is passed to PowerShell as `-EncodedCommand`
/// (base64 of UTF-16LE), so the command needs no further quoting.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScheduledTaskRewriter;

impl ScheduledTaskRewriter {
    /// The PowerShell wrapper before encoding.
    pub fn wrapper_script(&self, command: &str, credentials: &Credentials) -> String {
        let task = format!("imageprov-elevated-{}", ulid::Ulid::new());
        format!(
            concat!(
                "$ErrorActionPreference = 'Stop'; ",
                "$name = '{task}'; ",
                "$action = New-ScheduledTaskAction -Execute 'cmd.exe' -Argument '/C {command}'; ",
                "Register-ScheduledTask -TaskName $name -Action $action -User '{user}' -Password '{password}' -RunLevel Highest -Force | Out-Null; ",
                "Start-ScheduledTask -TaskName $name; ",
                "while ((Get-ScheduledTask -TaskName $name).State -ne 'Ready') {{ Start-Sleep -Seconds 1; }} ",
                "$result = (Get-ScheduledTaskInfo -TaskName $name).LastTaskResult; ",
                "Unregister-ScheduledTask -TaskName $name -Confirm:$false; ",
                "exit $result;"
            ),
            task = task,
            command = quote_single(command),
            user = quote_single(&credentials.user),
            password = quote_single(&credentials.password),
        )
    }
}

impl CommandRewriter for ScheduledTaskRewriter {
    fn rewrite(&self, command: &str, credentials: &Credentials) -> ProvisionResult<String> {
        if credentials.user.is_empty() {
            return Err(ProvisionError::Elevation(
                "scheduled task elevation requires a user".into(),
            ));
        }
        let script = self.wrapper_script(command, credentials);
        Ok(format!(
            "powershell -NoProfile -NonInteractive -ExecutionPolicy Bypass -EncodedCommand {}",
            encode_command(&script)
        ))
    }
}

/// Base64 of the UTF-16LE bytes, as PowerShell's `-EncodedCommand` expects.
pub fn encode_command(script: &str) -> String {
    let bytes: Vec<u8> = script.encode_utf16().flat_map(u16::to_le_bytes).collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// A PowerShell single-quoted string literal for `value`.
pub fn quote_powershell(value: &str) -> String {
    format!("'{}'", quote_single(value))
}

/// Content of a PowerShell single-quoted string.
fn quote_single(value: &str) -> String {
    value.replace('\'', "''")
}

/// A POSIX shell word that expands to exactly `value`.
pub fn quote_posix(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}
