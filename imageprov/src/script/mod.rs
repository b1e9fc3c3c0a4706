//! Script staging
//!
//! - `source`: inline/file script resolution and transient temp scripts
//! - `remote`: remote target paths and directory expansion
//! - `envvars`: the environment variable file uploaded before the first script

pub mod envvars;
mod remote;
mod source;

pub use remote::RemoteTarget;
pub use source::{ScriptSource, resolve_sources, write_inline_script};
