//! Script files on disk.

use std::path::PathBuf;
use tempfile::TempDir;

/// A temporary directory holding numbered scripts.
pub struct ScriptDir {
    pub dir: TempDir,
    pub paths: Vec<PathBuf>,
}

impl ScriptDir {
    /// Write each content as `script-<n>.ps1`, in order.
    pub fn new(contents: &[&str]) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let paths = contents
            .iter()
            .enumerate()
            .map(|(i, content)| {
                let path = dir.path().join(format!("script-{}.ps1", i));
                std::fs::write(&path, content).expect("write script");
                path
            })
            .collect();
        Self { dir, paths }
    }

    /// Write a single named script.
    pub fn with_name(name: &str, content: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let path = dir.path().join(name);
        std::fs::write(&path, content).expect("write script");
        Self {
            dir,
            paths: vec![path],
        }
    }
}
