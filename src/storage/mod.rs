//! Storage backend abstraction
//!
//! Defines the StorageBackend trait used to read the input tree and write
//! generated output:
//! - FileSystemStorageBackend: native file system (`native-fs` feature)
//! - MemoryStorageBackend: shared in-memory tree (tests, embedding)
//!
//! Paths are `/`-separated and relative to the backend root.

use async_trait::async_trait;

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    FileNotFound(String),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 in {0}")]
    InvalidUtf8(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
}

/// Trait for storage backends
#[async_trait(?Send)]
pub trait StorageBackend: Send + Sync {
    /// Read a file from storage
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Write a file, creating parent directories as needed
    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError>;

    /// Names of the files directly in a directory
    async fn list_files(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    /// Names of the sub-directories directly in a directory
    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StorageError>;

    /// Check if a file exists
    async fn file_exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a file
    async fn delete_file(&self, path: &str) -> Result<(), StorageError>;

    /// Create a directory and its parents
    async fn create_dir(&self, path: &str) -> Result<(), StorageError>;

    /// Check if a directory exists
    async fn dir_exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Delete a directory and everything below it; a missing directory is not an error
    async fn delete_dir(&self, path: &str) -> Result<(), StorageError>;

    /// Read a file as UTF-8 text
    async fn read_to_string(&self, path: &str) -> Result<String, StorageError> {
        let bytes = self.read_file(path).await?;
        String::from_utf8(bytes).map_err(|_| StorageError::InvalidUtf8(path.to_string()))
    }
}

/// Join a directory and a name with a single `/`
pub fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    let name = name.trim_start_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else if name.is_empty() {
        dir.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

// Storage backend implementations
#[cfg(feature = "native-fs")]
pub mod filesystem;

pub mod memory;
