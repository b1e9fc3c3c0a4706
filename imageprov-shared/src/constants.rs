//! Shared constants
//!
//! Timing defaults and naming patterns used by the orchestrator and its
//! collaborators.

/// Retry policy defaults for the upload-execute cycle.
pub mod retry {
    use std::time::Duration;

    /// Total wall-clock budget for one upload-execute attempt sequence.
    pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(7 * 60);

    /// Attempts per call site. Retries are opt-in.
    pub const DEFAULT_TRIES: u32 = 1;

    /// First backoff between attempts; doubles up to [`MAX_BACKOFF`].
    pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

    pub const MAX_BACKOFF: Duration = Duration::from_secs(30);
}

/// Reboot lifecycle timing.
pub mod reboot {
    use std::time::Duration;

    /// Sleep between progress and validation polls.
    pub const POLL_INTERVAL: Duration = Duration::from_secs(13);

    /// Exit code of a progress or pending-reboot check meaning "reboot pending" /
    /// "stop waiting".
    pub const EXIT_PENDING: i32 = 1;
}

/// Exit code handling.
pub mod exit_codes {
    /// Sentinel for a script that has not executed yet.
    pub const NOT_RUN: i32 = -1;

    /// Accepted set when none is configured.
    pub const DEFAULT_ACCEPTED: &[i32] = &[0];
}

/// Naming of generated local and remote artifacts.
pub mod naming {
    /// Prefix of temporary local scripts materialized from inline content.
    pub const TEMP_SCRIPT_PREFIX: &str = "imageprov-";

    /// Extension of temporary local scripts.
    pub const TEMP_SCRIPT_SUFFIX: &str = ".ps1";

    /// Prefix of default remote file names: `<dir>/imageprov-pwsh-<role>-<id>.<ext>`.
    pub const REMOTE_FILE_PREFIX: &str = "imageprov-pwsh";

    /// Remote path role of user scripts.
    pub const ROLE_SCRIPT: &str = "script";

    /// Remote path role of the environment variable file.
    pub const ROLE_VARIABLES: &str = "variables";

    /// Remote path role of the interpreter installer.
    pub const ROLE_INSTALLER: &str = "installer";
}

/// Interpolation context keys available to command templates.
pub mod template_keys {
    /// Remote location of the script being executed.
    pub const PATH: &str = "Path";

    /// Remote location of the environment variable file.
    pub const VARS: &str = "Vars";

    /// Rendered plain command, available to elevated templates.
    pub const COMMAND: &str = "Command";

    /// [`COMMAND`] as a single POSIX shell word.
    pub const QUOTED_COMMAND: &str = "QuotedCommand";

    pub const ELEVATED_USER: &str = "ElevatedUser";

    pub const ELEVATED_PASSWORD: &str = "ElevatedPassword";

    /// [`ELEVATED_PASSWORD`] as a single POSIX shell word.
    pub const QUOTED_PASSWORD: &str = "QuotedPassword";

    /// Installer location, available to built-in auto-update scripts.
    pub const INSTALLER_URI: &str = "InstallerUri";

    /// [`INSTALLER_URI`] as a single-quoted literal of the update script's shell.
    pub const QUOTED_INSTALLER_URI: &str = "QuotedInstallerUri";
}
