//! Logging setup for binaries embedding the orchestrator.
//!
//! The library itself never installs a subscriber.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// File name of the daily-rolling log.
pub const LOG_FILE_NAME: &str = "imageprov.log";

/// Install a global subscriber writing through `non_blocking`.
///
/// A second call is a no-op.
pub fn register_to_tracing(non_blocking: NonBlocking, env_filter: EnvFilter, ansi: bool) {
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .with_ansi(ansi),
        )
        .try_init();
}

/// Filter from `RUST_LOG`, falling back to `default`.
pub fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Initialize logging to stderr, or to a daily-rolling file under `log_dir`.
///
/// Keep the returned guard alive until exit so buffered lines are flushed.
pub fn init_logging(log_dir: Option<&Path>) -> std::io::Result<WorkerGuard> {
    let filter = env_filter("info");

    let guard = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            register_to_tracing(non_blocking, filter, false);
            guard
        }
        None => {
            let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stderr());
            register_to_tracing(non_blocking, filter, true);
            guard
        }
    };

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let logs = dir.path().join("logs");
        let guard = init_logging(Some(&logs)).unwrap();
        tracing::info!("logging initialized");
        drop(guard);
        assert!(logs.is_dir());
    }
}
