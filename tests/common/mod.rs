#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv_query::engine::{QueryResult, SqlEngine};
use csv_query::error::EngineError;
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
}

/// Engine double that records every statement and accepts all of them.
#[derive(Default)]
pub struct RecordingEngine {
    pub statements: Vec<String>,
    pub queries: Vec<String>,
}

impl SqlEngine for RecordingEngine {
    fn execute(&mut self, sql: &str) -> Result<(), EngineError> {
        self.statements.push(sql.to_string());
        Ok(())
    }

    fn query(&mut self, sql: &str) -> Result<QueryResult, EngineError> {
        self.queries.push(sql.to_string());
        Ok(QueryResult::default())
    }
}

pub fn cells(row: &[&str]) -> Vec<Option<String>> {
    row.iter()
        .map(|cell| {
            if *cell == "NULL" {
                None
            } else {
                Some(cell.to_string())
            }
        })
        .collect()
}
