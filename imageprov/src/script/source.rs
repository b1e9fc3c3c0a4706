//! Script source resolution.
//!
//! Turns inline command lines or explicit script paths into an ordered list
//! of [`ScriptSource`]s. Inline content is materialized as a transient
//! temporary file that deletes itself when dropped.

use imageprov_shared::constants::naming;
use imageprov_shared::errors::{ProvisionError, ProvisionResult};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// One resolved script to run.
#[derive(Debug)]
pub struct ScriptSource {
    path: PathBuf,
    /// Owned temporary file for transient sources; removed on drop.
    transient: Option<TempPath>,
    ordinal: usize,
}

impl ScriptSource {
    /// A user-owned script file. Never deleted.
    pub fn file(path: impl Into<PathBuf>, ordinal: usize) -> Self {
        Self {
            path: path.into(),
            transient: None,
            ordinal,
        }
    }

    /// A temporary script owned by the run.
    pub fn transient(temp: TempPath, ordinal: usize) -> Self {
        Self {
            path: temp.to_path_buf(),
            transient: Some(temp),
            ordinal,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_transient(&self) -> bool {
        self.transient.is_some()
    }

    /// Position in the run, starting at 0.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Base file name, used when the remote target is a directory.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Release the source after successful execution.
    ///
    /// Transient sources are deleted; removal failures are reported.
    pub fn finish(self) -> ProvisionResult<()> {
        if let Some(temp) = self.transient {
            let path = temp.to_path_buf();
            temp.close()
                .map_err(|e| ProvisionError::removal(path, e))?;
        }
        Ok(())
    }
}

/// Write `lines` into a new temporary script, each followed by `\n`.
///
/// # Errors
///
/// [`ProvisionError::Preparation`] if the file cannot be created or written.
pub fn write_inline_script<S: AsRef<str>>(lines: &[S]) -> ProvisionResult<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(naming::TEMP_SCRIPT_PREFIX)
        .suffix(naming::TEMP_SCRIPT_SUFFIX)
        .tempfile()
        .map_err(ProvisionError::Preparation)?;

    {
        let mut writer = std::io::BufWriter::new(file.as_file_mut());
        for line in lines {
            writer
                .write_all(line.as_ref().as_bytes())
                .and_then(|_| writer.write_all(b"\n"))
                .map_err(ProvisionError::Preparation)?;
        }
        writer.flush().map_err(ProvisionError::Preparation)?;
    }

    tracing::debug!(path = %file.path().display(), lines = lines.len(), "Prepared inline script");
    Ok(file.into_temp_path())
}

/// Resolve the configured script sources, preserving order.
///
/// Inline lines, when present, become a single transient script at the front
/// of the list. Otherwise the script paths are returned verbatim.
///
/// # Errors
///
/// - [`ProvisionError::Config`] if both or neither of `inline` / `scripts` are given
/// - [`ProvisionError::Preparation`] if the inline script cannot be written
pub fn resolve_sources(inline: &[String], scripts: &[PathBuf]) -> ProvisionResult<Vec<ScriptSource>> {
    match (inline.is_empty(), scripts.is_empty()) {
        (true, true) => Err(ProvisionError::Config(
            "Either a script file or an inline script must be specified.".into(),
        )),
        (false, false) => Err(ProvisionError::Config(
            "Only a script file or an inline script can be specified, not both.".into(),
        )),
        (false, true) => Ok(vec![ScriptSource::transient(write_inline_script(inline)?, 0)]),
        (true, false) => Ok(scripts
            .iter()
            .enumerate()
            .map(|(ordinal, path)| ScriptSource::file(path, ordinal))
            .collect()),
    }
}
