//! Core data types shared by the orchestrator components.

use imageprov_shared::constants::exit_codes;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Build metadata supplied by the caller.
///
/// Forms the base of the interpolation context for every command template.
pub type GeneratedData = BTreeMap<String, String>;

// ============================================================================
// EXIT CODES
// ============================================================================

/// Set of remote exit statuses considered successful.
///
/// Acceptance is exact-set membership.
///
/// # Example
///
/// ```
/// use imageprov::types::ExitCodes;
///
/// let codes = ExitCodes::new(vec![0, 3010]);
/// assert!(codes.accepts(3010));
/// assert!(!codes.accepts(1));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExitCodes(Vec<i32>);

impl ExitCodes {
    /// Create from a list. An empty list falls back to the default `{0}`.
    pub fn new(codes: Vec<i32>) -> Self {
        if codes.is_empty() {
            Self::default()
        } else {
            Self(codes)
        }
    }

    pub fn accepts(&self, code: i32) -> bool {
        self.0.contains(&code)
    }

    /// Return `code` if accepted, otherwise an [`ProvisionError::ExitCode`].
    pub fn check(&self, code: i32) -> ProvisionResult<i32> {
        if self.accepts(code) {
            Ok(code)
        } else {
            Err(ProvisionError::ExitCode {
                code,
                accepted: self.0.clone(),
            })
        }
    }

    pub fn as_slice(&self) -> &[i32] {
        &self.0
    }
}

impl Default for ExitCodes {
    fn default() -> Self {
        Self(exit_codes::DEFAULT_ACCEPTED.to_vec())
    }
}

// ============================================================================
// CREDENTIALS
// ============================================================================

/// Elevation credentials. The password never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// ENVIRONMENT VARIABLES
// ============================================================================

/// One `KEY=VALUE` assignment staged on the target.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for EnvVar {
    type Err = String;

    /// Split at the first `=`. The value may be empty or contain further `=`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key, value) = s
            .split_once('=')
            .ok_or_else(|| format!("environment variable '{}' is not in KEY=VALUE form", s))?;

        if key.trim().is_empty() {
            return Err(format!("environment variable '{}' has an empty key", s));
        }

        Ok(Self {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_default_is_zero() {
        let codes = ExitCodes::default();
        assert!(codes.accepts(0));
        assert!(!codes.accepts(1));
        assert!(!codes.accepts(-1));
        assert_eq!(ExitCodes::new(vec![]), codes);
    }

    #[test]
    fn test_exit_codes_check() {
        let codes = ExitCodes::new(vec![0, 3010]);
        assert_eq!(codes.check(3010).unwrap(), 3010);

        match codes.check(5) {
            Err(ProvisionError::ExitCode { code, accepted }) => {
                assert_eq!(code, 5);
                assert_eq!(accepted, vec![0, 3010]);
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("Administrator", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("Administrator"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_env_var_parsing() {
        let var: EnvVar = "GREETING=hello=world".parse().unwrap();
        assert_eq!(var.key, "GREETING");
        assert_eq!(var.value, "hello=world");

        let empty: EnvVar = "EMPTY=".parse().unwrap();
        assert_eq!(empty.value, "");

        assert!("NOEQUALS".parse::<EnvVar>().is_err());
        assert!("=value".parse::<EnvVar>().is_err());
    }
}
