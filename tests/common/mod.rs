//! Shared test infrastructure for integration tests.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Environment variables the viewer reads; cleared so the host cannot leak in.
const VIEWER_ENV: [&str; 4] = [
    "VERIF_DATA_PATH",
    "VERIF_VAR_NAMES",
    "VERIF_PROFILES",
    "VERIF_LEGACY_TOP_LEVEL",
];

/// A throwaway base directory holding a `data/` tree.
pub struct DataTree {
    pub temp: TempDir,
}

/// Result of one viewer invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl RunResult {
    /// Parse stdout as JSON, panicking with stderr context on failure.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.stdout).unwrap_or_else(|err| {
            panic!(
                "stdout is not JSON ({err}); stdout={:?} stderr={}",
                String::from_utf8_lossy(&self.stdout),
                self.stderr
            )
        })
    }
}

impl DataTree {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create tempdir");
        fs::create_dir_all(temp.path().join("data")).expect("create data root");
        Self { temp }
    }

    pub fn base(&self) -> &Path {
        self.temp.path()
    }

    pub fn data(&self) -> PathBuf {
        self.temp.path().join("data")
    }

    /// Write a placeholder plot (or any file) under the data root.
    pub fn plot(&self, rel: &str) -> &Self {
        self.write(rel, b"\x89PNG\r\n");
        self
    }

    pub fn write(&self, rel: &str, contents: &[u8]) {
        let path = self.data().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent directory");
        }
        fs::write(&path, contents).expect("write fixture file");
    }

    /// Write a file relative to the base directory (labels, profiles).
    #[allow(dead_code)]
    pub fn write_base(&self, rel: &str, contents: &str) {
        fs::write(self.base().join(rel), contents).expect("write base file");
    }

    /// Run the viewer with `--base-dir` pointed at this tree and the data
    /// root left at `data` unless `args` override it.
    pub fn run(&self, args: &[&str]) -> RunResult {
        self.run_with_env(args, &[("VERIF_DATA_PATH", "data")])
    }

    pub fn run_with_env(&self, args: &[&str], env: &[(&str, &str)]) -> RunResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_verif-viewer"));
        for key in VIEWER_ENV {
            cmd.env_remove(key);
        }
        cmd.env("RUST_LOG", "warn");
        for (key, value) in env {
            cmd.env(key, value);
        }
        cmd.arg("--base-dir").arg(self.base());
        cmd.args(args);
        let output: Output = cmd.output().expect("run verif-viewer");
        RunResult {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}
