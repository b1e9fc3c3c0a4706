//! Provisioning configuration.
//!
//! [`ProvisionOptions`] is the raw, user-facing record (every field optional,
//! decoded from YAML or JSON). [`ProvisionConfig::resolve`] applies the
//! platform defaults for the target OS, validates every invariant and
//! produces the immutable configuration a run is driven by.

pub mod platform;
pub mod templates;

pub use platform::{ElevationStrategy, OsType, PlatformProfile, ShellQuoting};

use crate::engine::RetryPolicy;
use crate::types::{Credentials, EnvVar, ExitCodes};
use imageprov_shared::constants::{naming, reboot as reboot_const, retry as retry_const};
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Raw Options
// ============================================================================

/// User-supplied provisioning options.
///
/// Empty strings are treated the same as absent values.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisionOptions {
    /// Inline PowerShell lines, materialized into one temporary script.
    pub inline: Vec<String>,

    /// Local script files, executed in order.
    pub scripts: Vec<PathBuf>,

    pub execute_command: Option<String>,
    pub elevated_execute_command: Option<String>,
    pub elevated_user: Option<String>,
    pub elevated_password: Option<String>,

    /// Format of one environment variable line; two `%s` slots (key, value).
    pub env_var_format: Option<String>,
    pub elevated_env_var_format: Option<String>,

    /// `KEY=VALUE` assignments staged on the target before the first script.
    pub environment_vars: Vec<String>,

    /// Remote script location. A trailing separator marks a directory.
    pub remote_path: Option<String>,
    pub remote_env_var_path: Option<String>,
    pub remote_pwsh_autoupdate_path: Option<String>,

    /// Accepted exit codes. Default: `[0]`.
    pub valid_exit_codes: Option<Vec<i32>>,

    /// Target OS tag: linux, debian, ubuntu or windows.
    pub os_type: Option<String>,

    pub pwsh_autoupdate_is_enabled: bool,
    pub pwsh_installer_uri: Option<String>,
    /// Content of the auto-update script. Default: built-in script for the OS.
    pub pwsh_autoupdate_command: Option<String>,
    pub pwsh_autoupdate_execute_command: Option<String>,

    /// Check for a pending reboot after every script.
    pub post_script_execution_reboot_is_enabled: bool,
    /// Reboot once after all scripts completed.
    pub post_provision_reboot_is_enabled: bool,

    pub reboot_initiate_command: Option<String>,
    pub reboot_progress_command: Option<String>,
    pub reboot_complete_command: Option<String>,
    /// Content of the pending-reboot check script (exit 1 = pending).
    pub reboot_pending_command: Option<String>,
    pub reboot_validate_command: Option<String>,

    pub start_retry_timeout_secs: Option<u64>,
    pub max_tries: Option<u32>,
    pub reboot_poll_interval_secs: Option<u64>,
}

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Reboot commands and switches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RebootConfig {
    pub post_script_check: bool,
    pub post_provision: bool,
    pub initiate_command: String,
    pub progress_command: String,
    pub complete_command: String,
    /// Script content of the pending-reboot check.
    pub pending_script: String,
    pub validate_command: String,
    pub poll_interval: Duration,
}

impl RebootConfig {
    pub fn is_enabled(&self) -> bool {
        self.post_script_check || self.post_provision
    }
}

/// Interpreter auto-update settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutoUpdateConfig {
    pub enabled: bool,
    pub installer_uri: Option<String>,
    /// Script template, rendered with `InstallerUri` and `QuotedInstallerUri`
    /// before upload.
    pub script: Option<String>,
    pub execute_command: String,
    pub remote_path: String,
    /// Quoting applied to `QuotedInstallerUri`.
    pub quoting: ShellQuoting,
}

impl AutoUpdateConfig {
    /// Runs when explicitly enabled or when an installer location is given.
    pub fn is_active(&self) -> bool {
        self.enabled || self.installer_uri.is_some()
    }
}

/// Fully resolved, validated configuration of one provisioning run.
#[derive(Clone, Debug)]
pub struct ProvisionConfig {
    pub os_type: OsType,
    pub inline: Vec<String>,
    pub scripts: Vec<PathBuf>,
    pub execute_command: String,
    pub elevated_execute_command: String,
    /// Present when an elevated user is configured.
    pub credentials: Option<Credentials>,
    pub elevation: ElevationStrategy,
    pub env_var_format: String,
    pub elevated_env_var_format: String,
    pub environment_vars: Vec<EnvVar>,
    pub remote_path: String,
    pub remote_env_var_path: String,
    pub accepted_exit_codes: ExitCodes,
    pub auto_update: AutoUpdateConfig,
    pub reboot: RebootConfig,
    pub retry: RetryPolicy,
}

impl ProvisionConfig {
    /// Apply platform defaults and validate.
    ///
    /// All violations are collected and reported together as one
    /// [`ProvisionError::Config`].
    pub fn resolve(options: ProvisionOptions) -> ProvisionResult<Self> {
        let mut problems: Vec<String> = Vec::new();

        let os_tag = non_empty(options.os_type).unwrap_or_default();
        let (os_type, known) = OsType::parse_lenient(&os_tag);
        if !known {
            tracing::warn!(os_type = %os_tag, "Unknown os_type, using linux defaults");
        }
        let profile = os_type.profile();

        let inline: Vec<String> = options.inline;
        let scripts: Vec<PathBuf> = options.scripts;
        if inline.is_empty() && scripts.is_empty() {
            problems.push("Either a script file or an inline script must be specified.".into());
        } else if !inline.is_empty() && !scripts.is_empty() {
            problems
                .push("Only a script file or an inline script can be specified, not both.".into());
        }

        let elevated_user = non_empty(options.elevated_user);
        let elevated_password = non_empty(options.elevated_password);
        if elevated_password.is_some() && elevated_user.is_none() {
            problems.push(
                "Must supply the 'elevated_user' parameter if 'elevated_password' is provided."
                    .into(),
            );
        }
        let credentials =
            elevated_user.map(|user| Credentials::new(user, elevated_password.unwrap_or_default()));

        let mut environment_vars = Vec::with_capacity(options.environment_vars.len());
        for raw in &options.environment_vars {
            match raw.parse::<EnvVar>() {
                Ok(var) => environment_vars.push(var),
                Err(e) => problems.push(e),
            }
        }
        environment_vars.sort();

        let installer_uri = non_empty(options.pwsh_installer_uri);
        let auto_update = AutoUpdateConfig {
            enabled: options.pwsh_autoupdate_is_enabled,
            installer_uri,
            script: non_empty(options.pwsh_autoupdate_command)
                .or_else(|| profile.autoupdate_script.map(templates::normalize_newlines)),
            execute_command: non_empty(options.pwsh_autoupdate_execute_command)
                .unwrap_or_else(|| profile.autoupdate_execute_command.to_string()),
            remote_path: non_empty(options.remote_pwsh_autoupdate_path).unwrap_or_else(|| {
                default_remote_path(
                    profile.remote_directory,
                    naming::ROLE_INSTALLER,
                    profile.autoupdate_script_extension,
                )
            }),
            quoting: profile.autoupdate_quoting,
        };
        if auto_update.is_active() && auto_update.script.is_none() {
            problems.push(format!(
                "Interpreter auto-update is enabled but no 'pwsh_autoupdate_command' is set and os_type '{}' has no built-in update script.",
                os_type
            ));
        }

        let reboot = RebootConfig {
            post_script_check: options.post_script_execution_reboot_is_enabled,
            post_provision: options.post_provision_reboot_is_enabled,
            initiate_command: non_empty(options.reboot_initiate_command)
                .unwrap_or_else(|| profile.reboot_initiate_command.to_string()),
            progress_command: non_empty(options.reboot_progress_command)
                .unwrap_or_else(|| profile.reboot_progress_command.to_string()),
            complete_command: non_empty(options.reboot_complete_command)
                .unwrap_or_else(|| profile.reboot_complete_command.to_string()),
            pending_script: non_empty(options.reboot_pending_command)
                .or_else(|| profile.reboot_pending_script.map(templates::normalize_newlines))
                .unwrap_or_default(),
            validate_command: non_empty(options.reboot_validate_command)
                .unwrap_or_else(|| profile.reboot_validate_command.to_string()),
            poll_interval: options
                .reboot_poll_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(reboot_const::POLL_INTERVAL),
        };
        if reboot.is_enabled() && reboot.initiate_command.is_empty() {
            problems.push(format!(
                "Reboots are enabled but no 'reboot_initiate_command' is set and os_type '{}' has no default.",
                os_type
            ));
        }
        if reboot.post_script_check && reboot.pending_script.is_empty() {
            problems.push(format!(
                "Post-script reboot checks are enabled but no 'reboot_pending_command' is set and os_type '{}' has no default.",
                os_type
            ));
        }

        let retry = RetryPolicy::new(
            options
                .start_retry_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(retry_const::DEFAULT_START_TIMEOUT),
            options.max_tries.unwrap_or(retry_const::DEFAULT_TRIES),
        );

        if !problems.is_empty() {
            return Err(ProvisionError::Config(problems.join(" ")));
        }

        Ok(Self {
            os_type,
            inline,
            scripts,
            execute_command: non_empty(options.execute_command)
                .unwrap_or_else(|| profile.execute_command.to_string()),
            elevated_execute_command: non_empty(options.elevated_execute_command)
                .unwrap_or_else(|| profile.elevated_execute_command.to_string()),
            credentials,
            elevation: profile.elevation,
            env_var_format: non_empty(options.env_var_format)
                .unwrap_or_else(|| profile.env_var_format.to_string()),
            elevated_env_var_format: non_empty(options.elevated_env_var_format)
                .unwrap_or_else(|| profile.elevated_env_var_format.to_string()),
            environment_vars,
            remote_path: non_empty(options.remote_path).unwrap_or_else(|| {
                default_remote_path(profile.remote_directory, naming::ROLE_SCRIPT, "ps1")
            }),
            remote_env_var_path: non_empty(options.remote_env_var_path).unwrap_or_else(|| {
                default_remote_path(profile.remote_directory, naming::ROLE_VARIABLES, "ps1")
            }),
            accepted_exit_codes: ExitCodes::new(options.valid_exit_codes.unwrap_or_default()),
            auto_update,
            reboot,
            retry,
        })
    }

    /// Whether commands run under an elevated user.
    pub fn is_elevated(&self) -> bool {
        self.credentials.is_some()
    }

    /// Env-var line format matching the elevation mode.
    pub fn effective_env_var_format(&self) -> &str {
        if self.is_elevated() {
            &self.elevated_env_var_format
        } else {
            &self.env_var_format
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

/// `<dir>/imageprov-pwsh-<role>-<ULID>.<ext>`; the ULID is time-ordered so
/// concurrent builds sharing a temp directory never collide.
fn default_remote_path(directory: &str, role: &str, extension: &str) -> String {
    format!(
        "{}/{}-{}-{}.{}",
        directory,
        naming::REMOTE_FILE_PREFIX,
        role,
        ulid::Ulid::new(),
        extension
    )
}
