//! imageprov shared - Common types for the provisioning library, CLI and test utilities
//!
//! This crate holds the error taxonomy every crate in the workspace speaks,
//! plus the timing and naming constants that must agree between them.

pub mod constants;
pub mod errors;

pub use errors::{ProvisionError, ProvisionResult};
