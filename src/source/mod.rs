//! Where imported files come from: either a hierarchical directory handle
//! exposing async enumeration, or a flat list of files carrying relative
//! paths (the shape a browser's directory `<input>` produces).

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source I/O error for {1}: {0}")]
    Io(#[source] std::io::Error, String),

    #[error("Unsupported source: {0}")]
    Unsupported(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEntryKind {
    File,
    Directory,
}

/// One named child of a source directory.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub name: String,
    pub kind: SourceEntryKind,
    /// File size in bytes; 0 for directories.
    pub size: u64,
}

/// A hierarchical selection. Paths handed to `list` and `read` are
/// relative to the selection root, slash-separated, with `""` naming the
/// root itself.
#[async_trait]
pub trait DirectorySource: Send + Sync {
    async fn list(&self, rel_dir: &str) -> Result<Vec<SourceEntry>, SourceError>;

    async fn read(&self, rel_path: &str) -> Result<Vec<u8>, SourceError>;
}

/// One element of a flat selection. `relative_path` is slash-separated
/// and relative to the project root (hosts strip the wrapping folder name
/// a directory input prepends).
#[derive(Debug, Clone)]
pub struct FlatFile {
    pub relative_path: String,
    pub bytes: Vec<u8>,
}

impl FlatFile {
    pub fn new(relative_path: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes: bytes.into(),
        }
    }
}

/// `DirectorySource` over a real directory on the host filesystem.
pub struct HostDirectorySource {
    root: PathBuf,
}

impl HostDirectorySource {
    /// Fails with `Unsupported` when `root` is not a readable directory,
    /// which the pipeline reports as an unsupported environment.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, SourceError> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SourceError::Unsupported(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    fn resolve(&self, rel: &str) -> PathBuf {
        if rel.is_empty() {
            self.root.clone()
        } else {
            rel.split('/').fold(self.root.clone(), |p, seg| p.join(seg))
        }
    }

    fn io_err(e: std::io::Error, path: &Path) -> SourceError {
        SourceError::Io(e, path.display().to_string())
    }
}

#[async_trait]
impl DirectorySource for HostDirectorySource {
    async fn list(&self, rel_dir: &str) -> Result<Vec<SourceEntry>, SourceError> {
        let dir = self.resolve(rel_dir);
        let mut read_dir = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| Self::io_err(e, &dir))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::io_err(e, &dir))?
        {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!("Skipping non-UTF-8 entry name {:?} in {:?}", raw, dir);
                    continue;
                }
            };
            let metadata = match entry.metadata().await {
                Ok(md) => md,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                    continue;
                }
            };
            let kind = if metadata.is_dir() {
                SourceEntryKind::Directory
            } else {
                SourceEntryKind::File
            };
            entries.push(SourceEntry {
                name,
                kind,
                size: if metadata.is_dir() { 0 } else { metadata.len() },
            });
        }
        // Deterministic walk order regardless of the host's readdir order.
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    async fn read(&self, rel_path: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(rel_path);
        tokio::fs::read(&path).await.map_err(|e| Self::io_err(e, &path))
    }
}
