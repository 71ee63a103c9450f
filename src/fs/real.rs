use super::{FileSystem, FsError};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Disk-backed file system rooted at a codebase directory
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }
}

impl FileSystem for RealFileSystem {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.resolve(path).exists()
    }

    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let full = self.resolve(path);
        fs::read_to_string(&full).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                FsError::NotFound(full)
            } else {
                FsError::Io { path: full, source }
            }
        })
    }
}
