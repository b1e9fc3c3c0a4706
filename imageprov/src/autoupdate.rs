//! Interpreter installation and update.
//!
//! Runs once before any user script when enabled explicitly or when an
//! installer location is configured.

use crate::config::AutoUpdateConfig;
use crate::engine::{ScriptJob, ScriptRunner};
use crate::remote::Reporter;
use crate::render::{self, CommandRenderer, TemplateContext};
use crate::script::{RemoteTarget, ScriptSource, write_inline_script};
use imageprov_shared::constants::template_keys;
use imageprov_shared::errors::ProvisionResult;

/// Uploads and runs the interpreter update script.
pub struct AutoUpdater<'a> {
    config: &'a AutoUpdateConfig,
    runner: &'a ScriptRunner,
    renderer: &'a CommandRenderer,
    reporter: &'a dyn Reporter,
}

impl<'a> AutoUpdater<'a> {
    pub fn new(
        config: &'a AutoUpdateConfig,
        runner: &'a ScriptRunner,
        renderer: &'a CommandRenderer,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            config,
            runner,
            renderer,
            reporter,
        }
    }

    /// Install or update the interpreter.
    ///
    /// Returns `None` when auto-update is inactive, otherwise the exit code
    /// of the update script.
    pub async fn run(&self) -> ProvisionResult<Option<i32>> {
        if !self.config.is_active() {
            return Ok(None);
        }
        let Some(template) = self.config.script.as_deref() else {
            return Ok(None);
        };

        let script = self.render_script(template)?;
        let lines: Vec<&str> = script.lines().collect();
        let source = ScriptSource::transient(write_inline_script(&lines)?, 0);

        let target = RemoteTarget::new(self.config.remote_path.as_str());
        let remote_path = target.resolve(&source);
        let command = self
            .renderer
            .render(&self.config.execute_command, &remote_path)?;

        self.reporter.say(&format!(
            "Installing or updating PowerShell ({})",
            self.config.installer_uri.as_deref().unwrap_or("default source")
        ));
        tracing::info!(remote_path = %remote_path, "Running interpreter update");

        let code = self
            .runner
            .upload_and_execute(ScriptJob::new(source, target, command).with_label("PowerShell update"))
            .await?;

        Ok(Some(code))
    }

    fn render_script(&self, template: &str) -> ProvisionResult<String> {
        let uri = self.config.installer_uri.clone().unwrap_or_default();
        let mut context = TemplateContext::new();
        context.insert(
            template_keys::QUOTED_INSTALLER_URI.to_string(),
            self.config.quoting.quote(&uri),
        );
        context.insert(template_keys::INSTALLER_URI.to_string(), uri);
        render::render(template, &context)
    }
}
