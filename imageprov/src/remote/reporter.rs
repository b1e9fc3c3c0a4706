//! Progress reporting.

/// Receives human-readable progress lines.
pub trait Reporter: Send + Sync {
    fn say(&self, message: &str);
}

/// Forwards messages to `tracing` at info level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn say(&self, message: &str) {
        tracing::info!(target: "imageprov::report", "{}", message);
    }
}
