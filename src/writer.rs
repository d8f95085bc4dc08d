//! File writer seam between the pipeline and the host file system.
//!
//! The core decides what to write and when; [`ProjectWriter`] decides how.
//! [`FsWriter`] roots all writes under the project directory; [`MemWriter`]
//! is the in-memory double used by tests.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Errors from writing a generated file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("path escapes project root: {0}")]
    OutsideRoot(String),
}

/// Accepts `(relative_path, contents)` and performs the actual write.
pub trait ProjectWriter: Send + Sync {
    fn write(&self, relative_path: &str, contents: &[u8]) -> Result<(), WriteError>;
}

/// Writer backed by the real file system, rooted at the project directory.
pub struct FsWriter {
    root: PathBuf,
}

impl FsWriter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, relative_path: &str) -> Result<PathBuf, WriteError> {
        let rel = Path::new(relative_path);
        let escapes = rel.is_absolute()
            || rel
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::RootDir));
        if escapes {
            return Err(WriteError::OutsideRoot(relative_path.to_string()));
        }
        Ok(self.root.join(rel))
    }
}

impl ProjectWriter for FsWriter {
    fn write(&self, relative_path: &str, contents: &[u8]) -> Result<(), WriteError> {
        let target = self.resolve(relative_path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| WriteError::Io {
                path: relative_path.to_string(),
                source,
            })?;
        }
        fs::write(&target, contents).map_err(|source| WriteError::Io {
            path: relative_path.to_string(),
            source,
        })?;
        tracing::debug!(path = relative_path, bytes = contents.len(), "file written");
        Ok(())
    }
}

/// In-memory writer for tests.
#[derive(Default)]
pub struct MemWriter {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a written file's contents as UTF-8, if present.
    pub fn get(&self, relative_path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(relative_path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All written paths, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }
}

impl ProjectWriter for MemWriter {
    fn write(&self, relative_path: &str, contents: &[u8]) -> Result<(), WriteError> {
        self.files
            .lock()
            .unwrap()
            .insert(relative_path.to_string(), contents.to_vec());
        Ok(())
    }
}
