//! Remote target interfaces
//!
//! - `executor`: the command/file-transfer channel to the target
//! - `reporter`: user-facing progress messages
//! - `local`: executor backed by the local host

mod executor;
mod local;
mod reporter;

pub use executor::{RemoteExecutor, UploadMetadata};
pub use local::LocalExecutor;
pub use reporter::{Reporter, TracingReporter};
