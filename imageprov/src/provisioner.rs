//! Provisioning orchestrator.
//!
//! One run: interpreter update, environment file staging, then every script
//! in order with optional reboot checks, then an optional final reboot. The
//! first fatal error aborts the run.

use crate::autoupdate::AutoUpdater;
use crate::config::{ElevationStrategy, ProvisionConfig};
use crate::engine::{ExitCheck, ScriptJob, ScriptRunner};
use crate::reboot::{RebootCoordinator, RebootReport};
use crate::remote::{RemoteExecutor, Reporter};
use crate::render::{
    CommandRenderer, CommandRewriter, Elevation, RewriteElevation, ScheduledTaskRewriter,
    TemplateElevation,
};
use crate::script::{self, RemoteTarget, ScriptSource, envvars};
use crate::types::GeneratedData;
use imageprov_shared::constants::reboot as reboot_const;
use imageprov_shared::errors::ProvisionResult;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one executed script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScriptOutcome {
    pub path: PathBuf,
    pub remote_path: String,
    pub exit_code: i32,
}

/// Summary of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Exit code of the interpreter update, when it ran.
    pub auto_update_exit_code: Option<i32>,
    pub scripts: Vec<ScriptOutcome>,
    pub reboots: Vec<RebootReport>,
}

/// Runs provisioning against one target.
pub struct Provisioner {
    config: ProvisionConfig,
    executor: Arc<dyn RemoteExecutor>,
    reporter: Arc<dyn Reporter>,
    rewriter: Arc<dyn CommandRewriter>,
    cancel: CancellationToken,
}

impl Provisioner {
    pub fn new(
        config: ProvisionConfig,
        executor: Arc<dyn RemoteExecutor>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            config,
            executor,
            reporter,
            rewriter: Arc::new(ScheduledTaskRewriter),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Replace the rewriter used by rewrite-based elevation.
    pub fn with_command_rewriter(mut self, rewriter: Arc<dyn CommandRewriter>) -> Self {
        self.rewriter = rewriter;
        self
    }

    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run every configured step against the target.
    pub async fn provision(&self, data: &GeneratedData) -> ProvisionResult<ProvisionReport> {
        let mut report = ProvisionReport::default();

        let runner = ScriptRunner::new(
            self.executor.clone(),
            self.config.retry,
            self.config.accepted_exit_codes.clone(),
            self.cancel.clone(),
        )
        .with_reporter(self.reporter.clone());

        let env_file = self.prepare_env_file()?;
        let vars_target = RemoteTarget::new(self.config.remote_env_var_path.as_str());
        let vars_path = match &env_file {
            Some(source) => vars_target.resolve(source),
            None => vars_target.as_str().to_string(),
        };
        let renderer = self.renderer(data, vars_path.clone());

        report.auto_update_exit_code = AutoUpdater::new(
            &self.config.auto_update,
            &runner,
            &renderer,
            self.reporter.as_ref(),
        )
        .run()
        .await?;

        if let Some(source) = env_file {
            tracing::info!(remote_path = %vars_path, "Staging environment variables");
            runner
                .upload_and_execute(ScriptJob::upload_only(source, vars_target))
                .await?;
        }

        let sources = script::resolve_sources(&self.config.inline, &self.config.scripts)?;
        let target = RemoteTarget::new(self.config.remote_path.as_str());

        for source in sources {
            let local_path = source.path().to_path_buf();
            let remote_path = target.resolve(&source);
            let label = if source.is_transient() {
                "<inline script>".to_string()
            } else {
                local_path.display().to_string()
            };
            self.reporter.say(&format!(
                "Provisioning with pwsh: {}; command: {}",
                label, self.config.execute_command
            ));

            let command = renderer.render(&self.config.execute_command, &remote_path)?;
            let exit_code = runner
                .upload_and_execute(
                    ScriptJob::new(source, target.clone(), command).with_label(label),
                )
                .await?;

            tracing::info!(
                script = %local_path.display(),
                remote_path = %remote_path,
                exit_code,
                "Script finished"
            );
            report.scripts.push(ScriptOutcome {
                path: local_path,
                remote_path,
                exit_code,
            });

            if self.config.reboot.post_script_check
                && self.reboot_pending(&runner, &renderer).await?
            {
                report.reboots.push(self.coordinator().reboot().await?);
            }
        }

        if self.config.reboot.post_provision {
            report.reboots.push(self.coordinator().reboot().await?);
        }

        Ok(report)
    }

    fn prepare_env_file(&self) -> ProvisionResult<Option<ScriptSource>> {
        if self.config.environment_vars.is_empty() {
            return Ok(None);
        }
        let temp = envvars::write_env_file(
            self.config.effective_env_var_format(),
            &self.config.environment_vars,
        )?;
        Ok(Some(ScriptSource::transient(temp, 0)))
    }

    fn renderer(&self, data: &GeneratedData, vars_path: String) -> CommandRenderer {
        let renderer = CommandRenderer::new(data, vars_path);
        let Some(credentials) = self.config.credentials.clone() else {
            return renderer;
        };

        let elevation: Arc<dyn Elevation> = match self.config.elevation {
            ElevationStrategy::Template => Arc::new(TemplateElevation),
            ElevationStrategy::Rewrite => Arc::new(RewriteElevation::new(
                self.rewriter.clone(),
                credentials.clone(),
            )),
        };
        renderer.with_elevation(
            self.config.elevated_execute_command.as_str(),
            credentials,
            elevation,
        )
    }

    /// Upload and run the pending-reboot check; `true` when it exits `1`.
    async fn reboot_pending(
        &self,
        runner: &ScriptRunner,
        renderer: &CommandRenderer,
    ) -> ProvisionResult<bool> {
        self.reporter.say("Checking for pending reboot...");
        let lines: Vec<&str> = self.config.reboot.pending_script.lines().collect();
        let source = ScriptSource::transient(script::write_inline_script(&lines)?, 0);
        let target = RemoteTarget::new(self.config.remote_path.as_str());
        let remote_path = target.resolve(&source);

        let command = renderer.render(&self.config.execute_command, &remote_path)?;
        let code = runner
            .upload_and_execute(
                ScriptJob::new(source, target, command)
                    .with_check(ExitCheck::Any)
                    .with_label("Pending reboot check"),
            )
            .await?;

        tracing::debug!(exit_code = code, "Reboot pending check finished");
        Ok(code == reboot_const::EXIT_PENDING)
    }

    fn coordinator(&self) -> RebootCoordinator {
        RebootCoordinator::new(
            self.executor.clone(),
            self.reporter.clone(),
            self.config.reboot.clone(),
            self.cancel.clone(),
        )
    }
}
