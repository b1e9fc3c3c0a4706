//! Per-operating-system provisioning policy.
//!
//! Every OS-dependent default lives in one [`PlatformProfile`] record,
//! looked up from the [`OsType`] tag once during configuration resolution.

use crate::render::{quote_posix, quote_powershell};
use serde::{Deserialize, Serialize};

use super::templates;

// ============================================================================
// OS TAG
// ============================================================================

/// Operating system family of the target machine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsType {
    /// Any POSIX target without a dedicated profile.
    #[default]
    Linux,
    Debian,
    Ubuntu,
    Windows,
}

impl OsType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OsType::Linux => "linux",
            OsType::Debian => "debian",
            OsType::Ubuntu => "ubuntu",
            OsType::Windows => "windows",
        }
    }

    /// Parse a user-supplied tag.
    ///
    /// Matching is case-insensitive. Unrecognized tags map to [`OsType::Linux`]
    /// and are reported as `false` so the caller can warn about them.
    pub fn parse_lenient(tag: &str) -> (Self, bool) {
        match tag.trim().to_ascii_lowercase().as_str() {
            "" | "linux" => (OsType::Linux, true),
            "debian" => (OsType::Debian, true),
            "ubuntu" => (OsType::Ubuntu, true),
            "windows" => (OsType::Windows, true),
            _ => (OsType::Linux, false),
        }
    }

    /// Platform policy for this OS.
    pub fn profile(&self) -> PlatformProfile {
        match self {
            OsType::Linux => LINUX_PROFILE,
            OsType::Debian => PlatformProfile {
                autoupdate_script: Some(templates::DEBIAN_AUTOUPDATE),
                ..LINUX_PROFILE
            },
            OsType::Ubuntu => PlatformProfile {
                autoupdate_script: Some(templates::UBUNTU_AUTOUPDATE),
                ..LINUX_PROFILE
            },
            OsType::Windows => WINDOWS_PROFILE,
        }
    }
}

impl std::str::FromStr for OsType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match OsType::parse_lenient(s) {
            (os, true) => Ok(os),
            (_, false) => Err(format!(
                "unknown os type '{}': expected linux, debian, ubuntu or windows",
                s
            )),
        }
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ELEVATION STRATEGY
// ============================================================================

/// How privilege escalation is achieved on a platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElevationStrategy {
    /// The elevated execute template alone performs escalation (sudo).
    Template,
    /// The final command is rewritten at execution time (scheduled task).
    Rewrite,
}

// ============================================================================
// PROFILE
// ============================================================================

/// Default command templates and locations for one OS family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub execute_command: &'static str,
    pub elevated_execute_command: &'static str,
    pub elevation: ElevationStrategy,
    pub env_var_format: &'static str,
    pub elevated_env_var_format: &'static str,
    pub autoupdate_execute_command: &'static str,
    pub autoupdate_script_extension: &'static str,
    pub autoupdate_quoting: ShellQuoting,
    #[serde(skip)]
    pub autoupdate_script: Option<&'static str>,
    #[serde(skip)]
    pub reboot_pending_script: Option<&'static str>,
    pub reboot_initiate_command: &'static str,
    pub reboot_progress_command: &'static str,
    pub reboot_complete_command: &'static str,
    pub reboot_validate_command: &'static str,
    pub remote_directory: &'static str,
}

const LINUX_PROFILE: PlatformProfile = PlatformProfile {
    execute_command: concat!(
        r#"chmod +x {{.Path}} && pwsh -ExecutionPolicy "Bypass" -NoLogo -NonInteractive -NoProfile -Command ""#,
        r#"\$ErrorActionPreference = 'Stop'; \$ProgressPreference = 'SilentlyContinue'; if (Test-Path '{{.Vars}}') { . '{{.Vars}}'; } "#,
        r#"& '{{.Path}}'; exit \$LASTEXITCODE;""#
    ),
    elevated_execute_command: r#"echo {{.QuotedPassword}} | sudo -S -p '' sh -e -c {{.QuotedCommand}}"#,
    elevation: ElevationStrategy::Template,
    env_var_format: r#"$env:%s="%s";"#,
    elevated_env_var_format: r#"$env:%s="%s";"#,
    autoupdate_execute_command: "chmod +x {{.Path}} && {{.Path}}",
    autoupdate_script_extension: "sh",
    autoupdate_quoting: ShellQuoting::Posix,
    autoupdate_script: None,
    reboot_pending_script: None,
    reboot_initiate_command: "",
    reboot_progress_command: "",
    reboot_complete_command: "",
    reboot_validate_command: r#"pwsh -ExecutionPolicy "Bypass" -NoLogo -NonInteractive -NoProfile -Command "exit 0;""#,
    remote_directory: "/tmp",
};

const WINDOWS_PROFILE: PlatformProfile = PlatformProfile {
    execute_command: concat!(
        r#"FOR /F "tokens=* USEBACKQ" %F IN (`where pwsh /R "%PROGRAMFILES%\PowerShell" ^2^>nul ^|^| where powershell`) DO ("%F" -ExecutionPolicy "Bypass" -NoLogo -NonInteractive -NoProfile -Command ""#,
        r#"$ErrorActionPreference = 'Stop'; $ProgressPreference = 'SilentlyContinue'; if (Test-Path '{{.Vars}}') { . '{{.Vars}}'; } "#,
        r#"&'{{.Path}}'; exit $LastExitCode;")"#
    ),
    elevated_execute_command: "{{.Command}}",
    elevation: ElevationStrategy::Rewrite,
    env_var_format: r#"$env:%s="%s";"#,
    elevated_env_var_format: r#"$env:%s="%s";"#,
    autoupdate_execute_command: concat!(
        r#"FOR /F "tokens=* USEBACKQ" %F IN (`where pwsh /R "%PROGRAMFILES%\PowerShell" ^2^>nul ^|^| where powershell`) DO ("%F" -ExecutionPolicy "Bypass" -NoLogo -NonInteractive -NoProfile -Command ""#,
        r#"&'{{.Path}}'; exit $LastExitCode;")"#
    ),
    autoupdate_script_extension: "ps1",
    autoupdate_quoting: ShellQuoting::PowerShell,
    autoupdate_script: Some(templates::WINDOWS_AUTOUPDATE),
    reboot_pending_script: Some(templates::WINDOWS_REBOOT_PENDING),
    reboot_initiate_command: r#"shutdown /r /f /t 0 /c "imageprov reboot""#,
    reboot_progress_command: r#"shutdown /r /f /t 60 /c "imageprov reboot test""#,
    reboot_complete_command: "shutdown /a",
    reboot_validate_command: r#"powershell -ExecutionPolicy "Bypass" -NoLogo -NonInteractive -NoProfile -Command "exit 0;""#,
    remote_directory: "C:/Windows/Temp",
};

// ============================================================================
// SHELL QUOTING
// ============================================================================

/// Literal quoting rules of the shell that runs the update script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellQuoting {
    Posix,
    PowerShell,
}

impl ShellQuoting {
    /// A single-quoted literal that evaluates to exactly `value`.
    pub fn quote(&self, value: &str) -> String {
        match self {
            ShellQuoting::Posix => quote_posix(value),
            ShellQuoting::PowerShell => quote_powershell(value),
        }
    }
}
