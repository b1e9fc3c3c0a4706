//! Test doubles for provisioning runs.
//!
//! - [`MockExecutor`]: scripted executor recording every upload and command
//! - [`RecordingReporter`]: captures progress messages
//! - [`fixtures`]: script files on disk

pub mod fixtures;
mod executor;
mod reporter;

pub use executor::{MockExecutor, RemoteCall, Reply};
pub use reporter::RecordingReporter;
