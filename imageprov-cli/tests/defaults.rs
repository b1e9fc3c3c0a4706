use predicates::prelude::*;
use rstest::rstest;

mod common;

#[rstest]
#[case("linux", "remote_directory: /tmp")]
#[case("ubuntu", "autoupdate_script_extension: sh")]
#[case("windows", "reboot_complete_command: shutdown /a")]
#[case("windows", "autoupdate_quoting: powershell")]
fn test_defaults_per_os(#[case] os_type: &str, #[case] expected: &str) {
    let mut ctx = common::imageprov();

    ctx.cmd
        .args(["defaults", "--os-type", os_type])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));
}

#[test]
fn test_defaults_windows_uses_rewrite_elevation() {
    let mut ctx = common::imageprov();

    ctx.cmd
        .args(["defaults", "--os-type", "windows"])
        .assert()
        .success()
        .stdout(predicate::str::contains("elevation: rewrite"));
}

#[test]
fn test_defaults_unknown_os_rejected() {
    let mut ctx = common::imageprov();

    ctx.cmd
        .args(["defaults", "--os-type", "plan9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown os type"));
}
