//! Integration tests for the reboot coordinator.

use imageprov::config::RebootConfig;
use imageprov::{ProvisionError, RebootCoordinator, RebootState};
use imageprov_test_utils::{MockExecutor, RecordingReporter, Reply};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use RebootState::*;

// ============================================================================
// TEST FIXTURES
// ============================================================================

struct TestContext {
    executor: Arc<MockExecutor>,
    reporter: Arc<RecordingReporter>,
    cancel: CancellationToken,
}

impl TestContext {
    fn new() -> Self {
        Self {
            executor: Arc::new(MockExecutor::new()),
            reporter: Arc::new(RecordingReporter::new()),
            cancel: CancellationToken::new(),
        }
    }

    fn coordinator(&self, config: RebootConfig) -> RebootCoordinator {
        RebootCoordinator::new(
            self.executor.clone(),
            self.reporter.clone(),
            config,
            self.cancel.clone(),
        )
    }
}

fn config() -> RebootConfig {
    RebootConfig {
        post_script_check: false,
        post_provision: true,
        initiate_command: "initiate".into(),
        progress_command: "progress".into(),
        complete_command: "complete".into(),
        pending_script: String::new(),
        validate_command: "validate".into(),
        poll_interval: Duration::from_millis(1),
    }
}

// ============================================================================
// INITIATION TESTS
// ============================================================================

#[tokio::test]
async fn initiate_nonzero_fails_without_polling() {
    let ctx = TestContext::new();
    ctx.executor.respond("initiate", [Reply::Exit(5)]);

    let err = ctx.coordinator(config()).reboot().await.unwrap_err();

    assert!(matches!(err, ProvisionError::RebootInitiation(_)));
    assert_eq!(ctx.executor.run_commands(), vec!["initiate"]);
}

#[tokio::test]
async fn initiate_transport_error_fails() {
    let ctx = TestContext::new();
    ctx.executor.respond("initiate", [Reply::Disconnect]);

    let err = ctx.coordinator(config()).reboot().await.unwrap_err();

    assert!(matches!(err, ProvisionError::RebootInitiation(_)));
    assert_eq!(ctx.executor.count_runs("progress"), 0);
}

// ============================================================================
// PROGRESS POLLING TESTS
// ============================================================================

#[tokio::test]
async fn progress_zero_cancels_test_reboot_once() {
    let ctx = TestContext::new();

    let report = ctx.coordinator(config()).reboot().await.unwrap();

    assert_eq!(
        ctx.executor.run_commands(),
        vec!["initiate", "progress", "complete", "validate"]
    );
    assert_eq!(ctx.executor.count_runs("complete"), 1);
    assert_eq!(report.exit_code, 0);
    assert_eq!(
        report.path,
        vec![Idle, Initiating, AwaitingCompletion, Validating, Complete]
    );
}

#[tokio::test]
async fn progress_keeps_polling_until_pending_code() {
    let ctx = TestContext::new();
    ctx.executor
        .respond("progress", [Reply::Exit(1115), Reply::Exit(1190), Reply::Exit(1)]);

    ctx.coordinator(config()).reboot().await.unwrap();

    assert_eq!(ctx.executor.count_runs("progress"), 3);
    assert_eq!(ctx.executor.count_runs("complete"), 0);
    assert_eq!(ctx.executor.count_runs("validate"), 1);
}

#[tokio::test]
async fn progress_transport_error_moves_to_validation() {
    let ctx = TestContext::new();
    ctx.executor.respond("progress", [Reply::Disconnect]);

    let report = ctx.coordinator(config()).reboot().await.unwrap();

    assert_eq!(ctx.executor.count_runs("progress"), 1);
    assert_eq!(ctx.executor.count_runs("complete"), 0);
    assert_eq!(report.path.last(), Some(&Complete));
}

#[tokio::test]
async fn empty_progress_command_skips_polling() {
    let ctx = TestContext::new();
    let config = RebootConfig {
        progress_command: String::new(),
        ..config()
    };

    let report = ctx.coordinator(config).reboot().await.unwrap();

    assert_eq!(ctx.executor.run_commands(), vec!["initiate", "validate"]);
    assert_eq!(report.path, vec![Idle, Initiating, Validating, Complete]);
}

// ============================================================================
// VALIDATION TESTS
// ============================================================================

#[tokio::test]
async fn validate_retries_until_success() {
    let ctx = TestContext::new();
    ctx.executor.respond(
        "validate",
        [Reply::Disconnect, Reply::Exit(1), Reply::Exit(0)],
    );

    let report = ctx.coordinator(config()).reboot().await.unwrap();

    assert_eq!(ctx.executor.count_runs("validate"), 3);
    assert_eq!(report.exit_code, 0);
    assert!(ctx.reporter.said("Completed machine reboot; exit code: 0"));
}

#[tokio::test]
async fn every_reboot_command_is_reported() {
    let ctx = TestContext::new();

    ctx.coordinator(config()).reboot().await.unwrap();

    assert_eq!(
        ctx.reporter.messages(),
        vec![
            "Initiating machine reboot; command: initiate",
            "Waiting for machine reboot; command: progress",
            "Machine still up, aborting test reboot",
            "Validating machine reboot; command: validate",
            "Completed machine reboot; exit code: 0",
        ]
    );
}

// ============================================================================
// CANCELLATION TESTS
// ============================================================================

#[tokio::test]
async fn cancellation_stops_polling() {
    let ctx = TestContext::new();
    ctx.executor.respond("progress", [Reply::Exit(1115)]);

    let polls = Arc::new(AtomicUsize::new(0));
    let cancel = ctx.cancel.clone();
    let counter = polls.clone();
    ctx.executor.on_run(move |command| {
        if command == "progress" && counter.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            cancel.cancel();
        }
    });

    let config = RebootConfig {
        poll_interval: Duration::from_millis(20),
        ..config()
    };
    let err = ctx.coordinator(config).reboot().await.unwrap_err();

    assert!(matches!(err, ProvisionError::Cancelled));
    assert_eq!(ctx.executor.count_runs("progress"), 2);
    assert_eq!(ctx.executor.count_runs("validate"), 0);
}
