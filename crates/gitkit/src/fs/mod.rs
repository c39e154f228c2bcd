//! Virtual filesystem
//!
//! The command layer never touches the host filesystem. Everything goes
//! through the async [`FileSystem`] trait; [`InMemoryFs`] is the default
//! implementation. The surface is the small primitive set the repository
//! code needs: read, write, mkdir, remove, stat, read_dir, exists.

mod memory;

pub use memory::InMemoryFs;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use crate::error::Result;

/// Async filesystem trait.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Read a file's contents.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write contents to a file, replacing any previous contents.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory.
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Remove a file or directory.
    async fn remove(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Get file metadata.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Read directory entries.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> Result<bool>;
}

/// File metadata.
#[derive(Debug, Clone)]
pub struct Metadata {
    /// File type
    pub file_type: FileType,
    /// File size in bytes
    pub size: u64,
    /// File permissions (Unix mode)
    pub mode: u32,
    /// Last modification time
    pub modified: SystemTime,
}

/// File type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Regular file
    File,
    /// Directory
    Directory,
}

impl FileType {
    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// Directory entry.
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Entry name (not full path)
    pub name: String,
    /// Entry metadata
    pub metadata: Metadata,
}

/// Resolve a path relative to a working directory.
///
/// Absolute paths pass through; relative paths are joined with the cwd.
/// `.` and `..` components are resolved so filesystem implementations
/// always receive clean absolute paths.
pub fn resolve_path(cwd: &Path, path_str: &str) -> PathBuf {
    let path = Path::new(path_str);
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    };
    normalize_path(&joined)
}

/// Normalize a path by resolving `.` and `..` components.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::RootDir => {
                result.push("/");
            }
            Component::Normal(name) => {
                result.push(name);
            }
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            Component::Prefix(_) => {}
        }
    }

    if result.as_os_str().is_empty() {
        result.push("/");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path_absolute() {
        let cwd = PathBuf::from("/repo");
        assert_eq!(resolve_path(&cwd, "/other/file"), PathBuf::from("/other/file"));
    }

    #[test]
    fn test_resolve_path_relative() {
        let cwd = PathBuf::from("/repo");
        assert_eq!(resolve_path(&cwd, "src/main.rs"), PathBuf::from("/repo/src/main.rs"));
    }

    #[test]
    fn test_resolve_path_dotdot() {
        let cwd = PathBuf::from("/repo/src");
        assert_eq!(resolve_path(&cwd, "../README"), PathBuf::from("/repo/README"));
    }

    #[test]
    fn test_normalize_root_parent() {
        assert_eq!(normalize_path(Path::new("/..")), PathBuf::from("/"));
    }
}
