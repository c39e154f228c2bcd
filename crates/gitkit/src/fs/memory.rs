//! In-memory filesystem implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::SystemTime;

use super::{normalize_path, DirEntry, FileSystem, FileType, Metadata};
use crate::error::Result;

/// In-memory filesystem.
///
/// Stores all files and directories in a HashMap keyed by normalized
/// absolute path. The root directory always exists.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File { content: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
}

impl FsEntry {
    fn metadata(&self) -> &Metadata {
        match self {
            FsEntry::File { metadata, .. } => metadata,
            FsEntry::Directory { metadata } => metadata,
        }
    }
}

fn dir_metadata() -> Metadata {
    Metadata {
        file_type: FileType::Directory,
        size: 0,
        mode: 0o755,
        modified: SystemTime::now(),
    }
}

fn file_metadata(size: u64) -> Metadata {
    Metadata {
        file_type: FileType::File,
        size,
        mode: 0o644,
        modified: SystemTime::now(),
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a new in-memory filesystem containing only the root directory.
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), FsEntry::Directory { metadata: dir_metadata() });
        Self { entries: RwLock::new(entries) }
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        let entries = self.entries.read().unwrap();

        match entries.get(&path) {
            Some(FsEntry::File { content, .. }) => Ok(content.clone()),
            Some(FsEntry::Directory { .. }) => Err(IoError::other("is a directory").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "file not found").into()),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.entries.write().unwrap();

        if let Some(parent) = path.parent() {
            match entries.get(parent) {
                Some(FsEntry::Directory { .. }) => {}
                Some(FsEntry::File { .. }) => {
                    return Err(IoError::other("parent is not a directory").into());
                }
                None => {
                    return Err(
                        IoError::new(ErrorKind::NotFound, "parent directory not found").into()
                    );
                }
            }
        }
        if matches!(entries.get(&path), Some(FsEntry::Directory { .. })) {
            return Err(IoError::other("is a directory").into());
        }

        entries.insert(
            path,
            FsEntry::File {
                metadata: file_metadata(content.len() as u64),
                content: content.to_vec(),
            },
        );
        Ok(())
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.entries.write().unwrap();

        if entries.contains_key(&path) {
            if recursive {
                return Ok(());
            }
            return Err(IoError::new(ErrorKind::AlreadyExists, "path exists").into());
        }

        if recursive {
            let mut ancestors: Vec<PathBuf> =
                path.ancestors().map(Path::to_path_buf).collect();
            ancestors.reverse();
            for dir in ancestors {
                match entries.get(&dir) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(FsEntry::File { .. }) => {
                        return Err(IoError::other("path component is a file").into());
                    }
                    None => {
                        entries.insert(dir, FsEntry::Directory { metadata: dir_metadata() });
                    }
                }
            }
        } else {
            match path.parent().map(|p| entries.get(p)) {
                Some(Some(FsEntry::Directory { .. })) => {}
                _ => {
                    return Err(
                        IoError::new(ErrorKind::NotFound, "parent directory not found").into()
                    );
                }
            }
            entries.insert(path, FsEntry::Directory { metadata: dir_metadata() });
        }
        Ok(())
    }

    async fn remove(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.entries.write().unwrap();

        match entries.get(&path) {
            Some(FsEntry::File { .. }) => {
                entries.remove(&path);
                Ok(())
            }
            Some(FsEntry::Directory { .. }) => {
                let children: Vec<PathBuf> = entries
                    .keys()
                    .filter(|p| p.starts_with(&path) && **p != path)
                    .cloned()
                    .collect();
                if !children.is_empty() && !recursive {
                    return Err(IoError::other("directory not empty").into());
                }
                for child in children {
                    entries.remove(&child);
                }
                entries.remove(&path);
                Ok(())
            }
            None => Err(IoError::new(ErrorKind::NotFound, "path not found").into()),
        }
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let path = normalize_path(path);
        let entries = self.entries.read().unwrap();
        entries
            .get(&path)
            .map(|e| e.metadata().clone())
            .ok_or_else(|| IoError::new(ErrorKind::NotFound, "path not found").into())
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize_path(path);
        let entries = self.entries.read().unwrap();

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {}
            Some(FsEntry::File { .. }) => {
                return Err(IoError::other("not a directory").into());
            }
            None => {
                return Err(IoError::new(ErrorKind::NotFound, "path not found").into());
            }
        }

        let mut result: Vec<DirEntry> = entries
            .iter()
            .filter(|(p, _)| p.parent() == Some(path.as_path()) && **p != path)
            .filter_map(|(p, e)| {
                p.file_name().map(|name| DirEntry {
                    name: name.to_string_lossy().to_string(),
                    metadata: e.metadata().clone(),
                })
            })
            .collect();
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path);
        Ok(self.entries.read().unwrap().contains_key(&path))
    }
}
