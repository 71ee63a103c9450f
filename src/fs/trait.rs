//! FileSystem trait definition

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    /// Distinguished so callers can turn a missing file into `None`
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FsError::NotFound(_))
    }
}

/// Read-only view of a codebase. Relative paths resolve against [`FileSystem::root`].
pub trait FileSystem: Send + Sync {
    /// Directory the codebase lives in
    fn root(&self) -> &Path;

    /// Check if a path exists. Never fails.
    fn exists(&self, path: &Path) -> bool;

    /// Read file contents as string
    fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Read file contents, mapping a missing file to `None`
    fn read_optional(&self, path: &Path) -> Result<Option<String>, FsError> {
        match self.read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(FsError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
