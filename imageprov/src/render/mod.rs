//! Command rendering
//!
//! - `template`: `{{.Name}}` interpolation with undefined-placeholder checks
//! - `elevation`: escalation strategies applied at execution time

mod elevation;
mod template;

pub use elevation::{
    CommandRewriter, Elevation, NoElevation, RewriteElevation, ScheduledTaskRewriter,
    TemplateElevation, encode_command, quote_posix, quote_powershell,
};
pub use template::{TemplateContext, render};

use crate::types::{Credentials, GeneratedData};
use imageprov_shared::constants::template_keys;
use imageprov_shared::errors::ProvisionResult;
use std::sync::Arc;

/// A rendered command plus the elevation applied before each run.
#[derive(Debug, Clone)]
pub struct RenderedCommand {
    text: String,
    elevation: Arc<dyn Elevation>,
}

impl RenderedCommand {
    /// A command run as-is.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            elevation: Arc::new(NoElevation),
        }
    }

    pub fn new(text: impl Into<String>, elevation: Arc<dyn Elevation>) -> Self {
        Self {
            text: text.into(),
            elevation,
        }
    }

    /// The rendered template, before elevation.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The command sent to the executor for one attempt.
    pub fn finalize(&self) -> ProvisionResult<String> {
        self.elevation.finalize(&self.text)
    }
}

#[derive(Debug, Clone)]
struct ElevatedTemplate {
    template: String,
    credentials: Credentials,
}

/// Renders execute templates against build data and remote locations.
#[derive(Debug, Clone)]
pub struct CommandRenderer {
    base: TemplateContext,
    elevated: Option<ElevatedTemplate>,
    elevation: Arc<dyn Elevation>,
}

impl CommandRenderer {
    /// Context is `data` plus `Vars` = `vars_path`.
    pub fn new(data: &GeneratedData, vars_path: impl Into<String>) -> Self {
        let mut base = data.clone();
        base.insert(template_keys::VARS.to_string(), vars_path.into());
        Self {
            base,
            elevated: None,
            elevation: Arc::new(NoElevation),
        }
    }

    /// Wrap every rendered command into `elevated_template` and attach the
    /// elevation strategy.
    pub fn with_elevation(
        mut self,
        elevated_template: impl Into<String>,
        credentials: Credentials,
        elevation: Arc<dyn Elevation>,
    ) -> Self {
        self.elevated = Some(ElevatedTemplate {
            template: elevated_template.into(),
            credentials,
        });
        self.elevation = elevation;
        self
    }

    pub fn is_elevated(&self) -> bool {
        self.elevated.is_some()
    }

    /// Render `template` for the script at `remote_path`.
    ///
    /// # Errors
    ///
    /// [`imageprov_shared::ProvisionError::Template`] when either template
    /// references an undefined placeholder or is malformed.
    pub fn render(&self, template: &str, remote_path: &str) -> ProvisionResult<RenderedCommand> {
        let mut context = self.base.clone();
        context.insert(template_keys::PATH.to_string(), remote_path.to_string());

        let command = render(template, &context)?;

        let Some(elevated) = &self.elevated else {
            return Ok(RenderedCommand::new(command, self.elevation.clone()));
        };

        context.insert(template_keys::QUOTED_COMMAND.to_string(), quote_posix(&command));
        context.insert(template_keys::COMMAND.to_string(), command);
        context.insert(
            template_keys::ELEVATED_USER.to_string(),
            elevated.credentials.user.clone(),
        );
        context.insert(
            template_keys::QUOTED_PASSWORD.to_string(),
            quote_posix(&elevated.credentials.password),
        );
        context.insert(
            template_keys::ELEVATED_PASSWORD.to_string(),
            elevated.credentials.password.clone(),
        );

        let text = render(&elevated.template, &context)?;
        Ok(RenderedCommand::new(text, self.elevation.clone()))
    }
}
