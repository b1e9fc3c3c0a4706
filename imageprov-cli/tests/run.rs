#![cfg(unix)]

use predicates::prelude::*;

mod common;

fn inline_config(ctx: &common::TestContext, lines: &[&str], execute: &str) -> std::path::PathBuf {
    let inline: String = lines.iter().map(|l| format!("  - '{}'\n", l)).collect();
    ctx.write(
        "build.yaml",
        &format!(
            "inline:\n{}execute_command: '{}'\nremote_path: '{}'\n",
            inline,
            execute,
            ctx.remote_dir()
        ),
    )
}

#[test]
fn test_run_inline_script() {
    let mut ctx = common::imageprov();
    let config = inline_config(&ctx, &["echo hello-from-script"], "sh {{.Path}}");

    ctx.cmd
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("hello-from-script"))
        .stdout(predicate::str::contains("Provisioned 1 script(s), 0 reboot(s)"));
}

#[test]
fn test_run_passes_build_data() {
    let mut ctx = common::imageprov();
    let config = inline_config(&ctx, &["echo \"hi $1\""], "sh {{.Path}} {{.Who}}");

    ctx.cmd
        .arg("run")
        .arg("--config")
        .arg(&config)
        .args(["--data", "Who=there"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hi there"));
}

#[test]
fn test_run_script_files_relative_to_config() {
    let mut ctx = common::imageprov();
    ctx.write("first.sh", "echo first-ran\n");
    ctx.write("second.sh", "echo second-ran\n");
    let config = ctx.write(
        "build.yaml",
        &format!(
            "scripts: [first.sh, second.sh]\nexecute_command: 'sh {{{{.Path}}}}'\nremote_path: '{}'\n",
            ctx.remote_dir()
        ),
    );

    ctx.cmd
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("first-ran"))
        .stdout(predicate::str::contains("second-ran"));

    assert!(ctx.path().join("remote/first.sh").exists());
    assert!(ctx.path().join("first.sh").exists());
}

#[test]
fn test_run_json_report() {
    let mut ctx = common::imageprov();
    let config = ctx.write(
        "build.json",
        &format!(
            r#"{{"inline": ["exit 0"], "execute_command": "sh {{{{.Path}}}}", "remote_path": "{}"}}"#,
            ctx.remote_dir()
        ),
    );

    ctx.cmd
        .args(["--quiet", "run", "--json", "--config"])
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("\"exit_code\": 0"));
}

#[test]
fn test_run_failing_script() {
    let mut ctx = common::imageprov();
    let config = inline_config(&ctx, &["exit 3"], "sh {{.Path}}");

    ctx.cmd
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stdout(predicate::str::contains("<inline script> exited with code 3"))
        .stderr(predicate::str::contains("exited with code 3"));
}

#[test]
fn test_run_invalid_options() {
    let mut ctx = common::imageprov();
    let config = ctx.write("build.yaml", "elevated_password: secret\n");

    ctx.cmd
        .arg("run")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Either a script file or an inline script"))
        .stderr(predicate::str::contains("elevated_user"));
}

#[test]
fn test_run_missing_config() {
    let mut ctx = common::imageprov();

    ctx.cmd
        .args(["run", "--config", "/nonexistent/build.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}
