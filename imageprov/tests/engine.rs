//! Integration tests for the upload-execute engine.

use imageprov::engine::{ExitCheck, RetryPolicy, ScriptJob, ScriptRunner};
use imageprov::render::RenderedCommand;
use imageprov::script::{RemoteTarget, ScriptSource, write_inline_script};
use imageprov::{ExitCodes, ProvisionError};
use imageprov_test_utils::fixtures::ScriptDir;
use imageprov_test_utils::{MockExecutor, RecordingReporter, Reply};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct TestContext {
    executor: Arc<MockExecutor>,
    cancel: CancellationToken,
    scripts: ScriptDir,
}

impl TestContext {
    fn new(content: &str) -> Self {
        Self {
            executor: Arc::new(MockExecutor::new()),
            cancel: CancellationToken::new(),
            scripts: ScriptDir::with_name("install.ps1", content),
        }
    }

    fn runner(&self, tries: u32) -> ScriptRunner {
        self.runner_with(tries, ExitCodes::default(), Duration::from_millis(1))
    }

    fn runner_with(&self, tries: u32, accepted: ExitCodes, backoff: Duration) -> ScriptRunner {
        ScriptRunner::new(
            self.executor.clone(),
            RetryPolicy::new(Duration::from_secs(60), tries).with_backoff(backoff, backoff),
            accepted,
            self.cancel.clone(),
        )
    }

    fn job(&self, command: &str) -> ScriptJob {
        ScriptJob::new(
            ScriptSource::file(&self.scripts.paths[0], 0),
            RemoteTarget::new("/tmp/imageprov-pwsh-script.ps1"),
            RenderedCommand::plain(command),
        )
    }
}

// ============================================================================
// RETRY TESTS
// ============================================================================

#[tokio::test]
async fn upload_retry_rereads_script_from_start() {
    let ctx = TestContext::new("Write-Host 'hello world'\n");
    ctx.executor.fail_uploads(2, 6);

    let code = ctx.runner(3).upload_and_execute(ctx.job("run")).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(
        ctx.executor.uploads(),
        vec![(
            "/tmp/imageprov-pwsh-script.ps1".to_string(),
            "Write-Host 'hello world'\n".to_string()
        )]
    );
    assert_eq!(ctx.executor.count_runs("run"), 1);
}

#[tokio::test]
async fn upload_failure_beyond_budget_is_upload_error() {
    let ctx = TestContext::new("exit 0");
    ctx.executor.fail_uploads(5, 0);

    let err = ctx.runner(2).upload_and_execute(ctx.job("run")).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Upload { .. }));
    assert!(ctx.executor.run_commands().is_empty());
}

#[tokio::test]
async fn transport_failure_during_run_is_retried() {
    let ctx = TestContext::new("exit 0");
    ctx.executor
        .respond("run", [Reply::Disconnect, Reply::Exit(0)]);

    let code = ctx.runner(2).upload_and_execute(ctx.job("run")).await.unwrap();

    assert_eq!(code, 0);
    assert_eq!(ctx.executor.count_runs("run"), 2);
    assert_eq!(ctx.executor.uploads().len(), 2);
}

#[tokio::test]
async fn unaccepted_exit_code_is_never_retried() {
    let ctx = TestContext::new("exit 2");
    ctx.executor.respond("run", [Reply::Exit(2)]);

    let err = ctx.runner(5).upload_and_execute(ctx.job("run")).await.unwrap_err();

    match err {
        ProvisionError::ExitCode { code, accepted } => {
            assert_eq!(code, 2);
            assert_eq!(accepted, vec![0]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.executor.count_runs("run"), 1);
}

#[tokio::test]
async fn rejected_exit_code_is_reported_first() {
    let ctx = TestContext::new("exit 2");
    ctx.executor.respond("run", [Reply::Exit(2)]);
    let reporter = Arc::new(RecordingReporter::new());

    let runner = ctx.runner(1).with_reporter(reporter.clone());
    let err = runner
        .upload_and_execute(ctx.job("run").with_label("setup"))
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::ExitCode { code: 2, .. }));
    assert_eq!(reporter.messages(), vec!["setup exited with code 2"]);
}

#[tokio::test]
async fn upload_only_job_reports_nothing() {
    let ctx = TestContext::new("$env:A=\"1\";\n");
    let reporter = Arc::new(RecordingReporter::new());

    ctx.runner(1)
        .with_reporter(reporter.clone())
        .upload_and_execute(ScriptJob::upload_only(
            ScriptSource::file(&ctx.scripts.paths[0], 0),
            RemoteTarget::new("/tmp/vars.ps1"),
        ))
        .await
        .unwrap();

    assert!(reporter.messages().is_empty());
}

#[tokio::test]
async fn custom_accepted_codes() {
    let ctx = TestContext::new("exit 3010");
    ctx.executor.respond("run", [Reply::Exit(3010)]);

    let runner = ctx.runner_with(1, ExitCodes::new(vec![0, 3010]), Duration::from_millis(1));
    assert_eq!(runner.upload_and_execute(ctx.job("run")).await.unwrap(), 3010);
}

#[tokio::test]
async fn cancellation_interrupts_backoff() {
    let ctx = TestContext::new("exit 0");
    ctx.executor.fail_uploads(5, 0);

    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
    });

    let started = Instant::now();
    let runner = ctx.runner_with(5, ExitCodes::default(), Duration::from_secs(30));
    let err = runner.upload_and_execute(ctx.job("run")).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn cancelled_before_first_attempt_touches_nothing() {
    let ctx = TestContext::new("exit 0");
    ctx.cancel.cancel();

    let err = ctx.runner(1).upload_and_execute(ctx.job("run")).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Cancelled));
    assert!(ctx.executor.calls().is_empty());
}

// ============================================================================
// SOURCE HANDLING TESTS
// ============================================================================

#[tokio::test]
async fn missing_script_is_stat_error() {
    let ctx = TestContext::new("exit 0");
    let job = ScriptJob::new(
        ScriptSource::file(ctx.scripts.dir.path().join("missing.ps1"), 0),
        RemoteTarget::new("/tmp/x.ps1"),
        RenderedCommand::plain("run"),
    );

    let err = ctx.runner(3).upload_and_execute(job).await.unwrap_err();

    assert!(matches!(err, ProvisionError::Stat { .. }));
    assert!(ctx.executor.calls().is_empty());
}

#[tokio::test]
async fn directory_target_gets_file_name() {
    let ctx = TestContext::new("exit 0");
    let job = ScriptJob::new(
        ScriptSource::file(&ctx.scripts.paths[0], 0),
        RemoteTarget::new("/tmp/"),
        RenderedCommand::plain("run"),
    );

    ctx.runner(1).upload_and_execute(job).await.unwrap();

    assert_eq!(ctx.executor.uploaded_paths(), vec!["/tmp/install.ps1"]);
}

#[tokio::test]
async fn transient_source_removed_after_success() {
    let ctx = TestContext::new("exit 0");
    let temp = write_inline_script(&["exit 0"]).unwrap();
    let path = temp.to_path_buf();
    let job = ScriptJob::new(
        ScriptSource::transient(temp, 0),
        RemoteTarget::new("/tmp/inline.ps1"),
        RenderedCommand::plain("run"),
    );

    ctx.runner(1).upload_and_execute(job).await.unwrap();

    assert!(!path.exists());
}

#[tokio::test]
async fn transient_source_removed_after_failure() {
    let ctx = TestContext::new("exit 0");
    ctx.executor.respond("run", [Reply::Exit(9)]);
    let temp = write_inline_script(&["exit 9"]).unwrap();
    let path = temp.to_path_buf();
    let job = ScriptJob::new(
        ScriptSource::transient(temp, 0),
        RemoteTarget::new("/tmp/inline.ps1"),
        RenderedCommand::plain("run"),
    );

    assert!(ctx.runner(1).upload_and_execute(job).await.is_err());
    assert!(!path.exists());
}

#[tokio::test]
async fn user_script_is_kept() {
    let ctx = TestContext::new("exit 0");
    ctx.runner(1).upload_and_execute(ctx.job("run")).await.unwrap();
    assert!(ctx.scripts.paths[0].exists());
}

#[tokio::test]
async fn any_check_returns_raw_code() {
    let ctx = TestContext::new("exit 1");
    ctx.executor.respond("check-pending", [Reply::Exit(1)]);

    let job = ctx.job("check-pending").with_check(ExitCheck::Any);
    assert_eq!(ctx.runner(1).upload_and_execute(job).await.unwrap(), 1);
}

#[tokio::test]
async fn upload_only_job_runs_nothing() {
    let ctx = TestContext::new("$env:A=\"1\";\n");
    let job = ScriptJob::upload_only(
        ScriptSource::file(&ctx.scripts.paths[0], 0),
        RemoteTarget::new("/tmp/vars.ps1"),
    );

    let code = ctx.runner(1).upload_and_execute(job).await.unwrap();

    assert_eq!(code, -1);
    assert_eq!(ctx.executor.uploaded_paths(), vec!["/tmp/vars.ps1"]);
    assert!(ctx.executor.run_commands().is_empty());
}
