#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

pub struct TestContext {
    pub cmd: Command,
    pub dir: TempDir,
}

impl TestContext {
    /// Write a file into the test directory and return its path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, content).expect("Failed to write test file");
        path
    }

    /// Remote directory for uploaded scripts, with a trailing separator.
    pub fn remote_dir(&self) -> String {
        let remote = self.dir.path().join("remote");
        format!("{}/", remote.display())
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

fn command() -> Command {
    let bin_path: &str = env!("CARGO_BIN_EXE_imageprov");
    let mut cmd = Command::new(bin_path);
    cmd.timeout(Duration::from_secs(60));
    cmd.env_remove("IMAGEPROV_LOG_DIR");
    cmd
}

pub fn imageprov() -> TestContext {
    let dir = TempDir::new().expect("Failed to create temp dir");
    TestContext {
        cmd: command(),
        dir,
    }
}
