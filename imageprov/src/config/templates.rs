//! Built-in scripts embedded at compile time.
//!
//! Auto-update scripts are rendered with `QuotedInstallerUri` before upload. The
//! reboot-pending check exits `1` when the target has a reboot queued.

pub const DEBIAN_AUTOUPDATE: &str = include_str!("scripts/autoupdate_debian.sh");

pub const UBUNTU_AUTOUPDATE: &str = include_str!("scripts/autoupdate_ubuntu.sh");

pub const WINDOWS_AUTOUPDATE: &str = include_str!("scripts/autoupdate_windows.ps1");

pub const WINDOWS_REBOOT_PENDING: &str = include_str!("scripts/reboot_pending_windows.ps1");

/// Normalize line endings to `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_newlines() {
        assert_eq!(normalize_newlines("a\r\nb\rc\n"), "a\nb\nc\n");
        assert_eq!(normalize_newlines("plain"), "plain");
    }

    #[test]
    fn test_autoupdate_scripts_take_installer_uri() {
        for script in [DEBIAN_AUTOUPDATE, UBUNTU_AUTOUPDATE, WINDOWS_AUTOUPDATE] {
            assert!(script.contains("{{.QuotedInstallerUri}}"));
        }
    }

    #[test]
    fn test_reboot_pending_signals_with_exit_one() {
        assert!(WINDOWS_REBOOT_PENDING.contains("exit 1"));
        assert!(!WINDOWS_REBOOT_PENDING.contains("{{"));
    }
}
