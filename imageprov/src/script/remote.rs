//! Remote script locations.

use super::ScriptSource;

/// Configured remote location for one path role.
///
/// A value ending in `/` or `\` denotes a directory: the script's base file
/// name is appended to obtain the effective remote file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTarget(String);

impl RemoteTarget {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_directory(&self) -> bool {
        self.0.ends_with('/') || self.0.ends_with('\\')
    }

    /// Effective remote file path for a script.
    pub fn resolve(&self, source: &ScriptSource) -> String {
        self.resolve_name(&source.file_name())
    }

    /// Effective remote file path for a local file name.
    pub fn resolve_name(&self, file_name: &str) -> String {
        if self.is_directory() {
            format!("{}{}", self.0, file_name)
        } else {
            self.0.clone()
        }
    }
}

impl std::fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
