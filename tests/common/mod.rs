//! Common test utilities for integration tests
//!
//! This module contains shared test fixtures and helper functions used across
//! integration tests. These utilities are not compiled into the library.

use anyhow::Result;
use lite_notebooks::{NotebookProcessor, ProcessConfig, RunSummary};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated test fixture with automatic cleanup
///
/// Creates a temporary copy of a test fixture book plus an empty output
/// directory, allowing tests to run in parallel without interfering with
/// each other.
pub struct TestFixture {
    _dir: TempDir,
    book_path: PathBuf,
    output_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture from a directory under tests/fixtures
    pub fn new(name: &str) -> Result<Self> {
        let dir = TempDir::new()?;
        let book_path = dir.path().join("book");
        let output_path = dir.path().join("lite");

        copy_dir_all(Path::new("tests/fixtures").join(name), &book_path)?;

        Ok(Self {
            book_path,
            output_path,
            _dir: dir,
        })
    }

    /// Get the path to the book directory
    pub fn book_path(&self) -> &Path {
        &self.book_path
    }

    /// Get the path notebooks are written to
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Load the fixture's `_config.yml` and build a processor for it
    pub fn processor(&self) -> Result<NotebookProcessor> {
        let config = ProcessConfig::load(&self.book_path)?;
        Ok(NotebookProcessor::new(config).with_jobs(2))
    }

    /// Run a processor over the fixture
    pub fn run(&self, processor: &NotebookProcessor) -> Result<RunSummary> {
        processor.run(&self.output_path)
    }

    /// Read a written notebook (path relative to the output directory)
    pub fn notebook(&self, rel_path: &str) -> Result<Value> {
        let contents = std::fs::read_to_string(self.output_path.join(rel_path))?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Joins a cell's `source` line list back into one string
pub fn cell_source(cell: &Value) -> String {
    cell["source"]
        .as_array()
        .map(|lines| lines.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

/// Recursively copy all files and directories from src to dst
fn copy_dir_all(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> Result<()> {
    std::fs::create_dir_all(&dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        if ty.is_dir() {
            copy_dir_all(entry.path(), dst.as_ref().join(entry.file_name()))?;
        } else {
            std::fs::copy(entry.path(), dst.as_ref().join(entry.file_name()))?;
        }
    }
    Ok(())
}
