#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_redact::error::OracleError;
use csv_redact::loader::{SourceFormat, TabularSource};
use csv_redact::oracle::TextOracle;
use tempfile::{TempDir, tempdir};

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        self.write_bytes(name, contents.as_bytes())
    }

    pub fn write_bytes(&self, name: &str, contents: &[u8]) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        let mut file = File::create(&path).expect("create temp file");
        file.write_all(contents).expect("write temp file contents");
        path
    }

    /// Writes a CSV file and returns a source for it.
    pub fn csv_source(&self, name: &str, contents: &str) -> TabularSource {
        TabularSource::new(self.write(name, contents), SourceFormat::Csv)
    }
}

/// Path to a checked-in file under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// Oracle stub that answers every prompt with the same text and keeps the
/// prompts it saw.
pub struct ScriptedOracle {
    reply: String,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }
}

impl TextOracle for ScriptedOracle {
    fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        self.prompts.borrow_mut().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Oracle stub that is never reachable.
pub struct UnreachableOracle;

impl TextOracle for UnreachableOracle {
    fn generate(&self, _prompt: &str) -> Result<String, OracleError> {
        Err(OracleError::Unavailable("connection refused".into()))
    }
}
