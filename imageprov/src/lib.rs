//! imageprov - build-time PowerShell provisioning for machine images.
//!
//! Stages scripts, uploads them through a [`RemoteExecutor`], runs them
//! with optional elevation and coordinates target reboots between scripts.
//!
//! ```ignore
//! let options: ProvisionOptions = serde_yaml::from_str(&yaml)?;
//! let config = ProvisionConfig::resolve(options)?;
//! let provisioner = Provisioner::new(config, executor, Arc::new(TracingReporter));
//! let report = provisioner.provision(&GeneratedData::new()).await?;
//! ```

pub mod autoupdate;
pub mod config;
pub mod engine;
pub mod provisioner;
pub mod reboot;
pub mod remote;
pub mod render;
pub mod script;
pub mod types;
pub mod util;

pub use config::{OsType, ProvisionConfig, ProvisionOptions};
pub use engine::{ExitCheck, RetryPolicy, ScriptJob, ScriptRunner};
pub use imageprov_shared::{ProvisionError, ProvisionResult};
pub use provisioner::{ProvisionReport, Provisioner, ScriptOutcome};
pub use reboot::{RebootCoordinator, RebootReport, RebootState};
pub use remote::{LocalExecutor, RemoteExecutor, Reporter, TracingReporter, UploadMetadata};
pub use render::{CommandRenderer, RenderedCommand};
pub use types::{Credentials, ExitCodes, GeneratedData};
