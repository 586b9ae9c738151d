//! Shared test utilities for the orgsite test suite.
//!
//! [`Workspace`] wraps a temp directory with helpers for laying out source
//! trees. Files written through it are backdated one minute so freshly
//! written outputs always read as strictly newer — the up-to-date gate
//! compares mtimes, and same-second writes would otherwise make incremental
//! tests flaky.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

/// A throwaway workspace directory for publish tests.
pub struct Workspace {
    tmp: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            tmp: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.tmp.path()
    }

    /// Write a file (creating parents) and backdate it.
    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.tmp.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        backdate(&path, 60);
        path
    }

    /// Write an org document with `#+TITLE` and a body.
    pub fn org(&self, rel: &str, title: &str, body: &str) -> PathBuf {
        self.write(rel, &format!("#+TITLE: {}\n\n{}\n", title, body))
    }

    /// Read a file relative to the workspace root. Panics with the path on
    /// a miss so failing tests name the file they expected.
    pub fn read(&self, rel: &str) -> String {
        let path = self.tmp.path().join(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e))
    }
}

/// Push a file's mtime into the past.
pub fn backdate(path: &Path, seconds: u64) {
    let time = SystemTime::now() - Duration::from_secs(seconds);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}
