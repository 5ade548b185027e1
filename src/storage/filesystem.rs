//! File system storage backend
//!
//! Implements StorageBackend on top of `tokio::fs`, rooted at a base
//! directory. Input trees are read through it and documentation is written
//! through it.
//!
//! ## Security
//!
//! Paths containing ".." are rejected and existing paths are canonicalized
//! and must stay within the base directory.

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// File system storage backend
pub struct FileSystemStorageBackend {
    base_path: PathBuf,
}

fn io_error(operation: &str, path: &str, e: std::io::Error) -> StorageError {
    StorageError::IoError(format!("Failed to {} {}: {}", operation, path, e))
}

impl FileSystemStorageBackend {
    /// Create a backend rooted at `base_path`
    ///
    /// ```rust
    /// use domain_schema_docs::storage::filesystem::FileSystemStorageBackend;
    ///
    /// let backend = FileSystemStorageBackend::new("/workspace/model");
    /// assert_eq!(backend.base_path().to_str(), Some("/workspace/model"));
    /// ```
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn canonical_base(&self) -> PathBuf {
        self.base_path
            .canonicalize()
            .unwrap_or_else(|_| self.base_path.clone())
    }

    fn ensure_contained(&self, path: &Path) -> Result<(), StorageError> {
        let canonical = path
            .canonicalize()
            .map_err(|e| StorageError::IoError(format!("Failed to resolve path: {}", e)))?;
        if canonical.starts_with(self.canonical_base()) {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied(
                "Path escapes base directory".to_string(),
            ))
        }
    }

    /// Map a storage path to a file system path below the base directory
    fn resolve_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = path.trim_start_matches('/');
        if relative.contains("..") {
            return Err(StorageError::PermissionDenied(
                "Path traversal (..) not allowed".to_string(),
            ));
        }

        // the root itself may not exist yet (first run, after a clean)
        if relative.is_empty() {
            return Ok(self.base_path.clone());
        }

        let full = self.base_path.join(relative);
        if full.components().any(|c| matches!(c, Component::ParentDir)) {
            return Err(StorageError::PermissionDenied(
                "Path traversal not allowed".to_string(),
            ));
        }

        if full.exists() {
            self.ensure_contained(&full)?;
        } else if let Some(parent) = full.parent()
            && parent.exists()
        {
            self.ensure_contained(parent)?;
        }
        Ok(full)
    }

    async fn entries(&self, dir: &str, want_dirs: bool) -> Result<Vec<String>, StorageError> {
        let full_path = self.resolve_path(dir)?;
        let mut read_dir = fs::read_dir(&full_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::DirectoryNotFound(dir.to_string())
            } else {
                io_error("read directory", dir, e)
            }
        })?;

        let mut names = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| io_error("read entry of", dir, e))?
        {
            if let Ok(file_type) = entry.file_type().await
                && file_type.is_dir() == want_dirs
                && (want_dirs || file_type.is_file())
                && let Some(name) = entry.file_name().to_str()
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn exists_as(&self, path: &str, dir: bool) -> Result<bool, StorageError> {
        let full_path = self.resolve_path(path)?;
        match fs::metadata(&full_path).await {
            Ok(metadata) => Ok(if dir { metadata.is_dir() } else { metadata.is_file() }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(io_error("check", path, e)),
        }
    }
}

#[async_trait(?Send)]
impl StorageBackend for FileSystemStorageBackend {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let full_path = self.resolve_path(path)?;
        fs::read(&full_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::FileNotFound(path.to_string())
            } else {
                io_error("read file", path, e)
            }
        })
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error("create directory for", path, e))?;
        }
        debug!(path = %path, bytes = content.len(), "Writing file");
        fs::write(&full_path, content)
            .await
            .map_err(|e| io_error("write file", path, e))
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        self.entries(dir, false).await
    }

    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        self.entries(dir, true).await
    }

    async fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        self.exists_as(path, false).await
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;
        fs::remove_file(&full_path).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::FileNotFound(path.to_string())
            } else {
                io_error("delete file", path, e)
            }
        })
    }

    async fn create_dir(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| io_error("create directory", path, e))
    }

    async fn dir_exists(&self, path: &str) -> Result<bool, StorageError> {
        self.exists_as(path, true).await
    }

    async fn delete_dir(&self, path: &str) -> Result<(), StorageError> {
        let full_path = self.resolve_path(path)?;
        match fs::remove_dir_all(&full_path).await {
            Ok(()) => {
                debug!(path = %path, "Deleted directory");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete directory", path, e)),
        }
    }
}
