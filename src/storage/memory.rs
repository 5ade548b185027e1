//! In-memory storage backend
//!
//! Files live in a shared sorted map keyed by normalized path. Clones share
//! the same tree, so a test can hand one clone to a reader or writer and
//! inspect the output through another.

use super::{StorageBackend, StorageError};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory storage backend
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageBackend {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    dirs: Arc<Mutex<BTreeSet<String>>>,
}

fn normalize(path: &str) -> String {
    path.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}

fn prefix(dir: &str) -> String {
    if dir.is_empty() {
        String::new()
    } else {
        format!("{}/", dir)
    }
}

impl MemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-filled with text files
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let backend = Self::new();
        if let Ok(mut map) = backend.files.lock() {
            for (path, content) in files {
                map.insert(normalize(path), content.as_bytes().to_vec());
            }
        }
        backend
    }

    fn files(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<u8>>>, StorageError> {
        self.files
            .lock()
            .map_err(|_| StorageError::IoError("Memory storage lock poisoned".to_string()))
    }

    fn dirs(&self) -> Result<MutexGuard<'_, BTreeSet<String>>, StorageError> {
        self.dirs
            .lock()
            .map_err(|_| StorageError::IoError("Memory storage lock poisoned".to_string()))
    }

    /// Paths of all files, sorted
    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Content of a file as text, if it exists and is UTF-8
    pub fn get(&self, path: &str) -> Option<String> {
        let files = self.files.lock().ok()?;
        let bytes = files.get(&normalize(path))?;
        String::from_utf8(bytes.clone()).ok()
    }

    fn is_dir(&self, dir: &str) -> Result<bool, StorageError> {
        if dir.is_empty() || self.dirs()?.contains(dir) {
            return Ok(true);
        }
        let prefix = prefix(dir);
        Ok(self.files()?.keys().any(|k| k.starts_with(&prefix)))
    }

    /// Direct children of a directory: (files, sub-directories)
    fn children(&self, dir: &str) -> Result<(BTreeSet<String>, BTreeSet<String>), StorageError> {
        let dir = normalize(dir);
        if !self.is_dir(&dir)? {
            return Err(StorageError::DirectoryNotFound(dir));
        }
        let prefix = prefix(&dir);
        let mut files = BTreeSet::new();
        let mut dirs = BTreeSet::new();

        let nested = self
            .files()?
            .keys()
            .cloned()
            .chain(self.dirs()?.iter().map(|d| format!("{}/", d)))
            .collect::<Vec<_>>();
        for path in nested {
            let Some(rest) = path.strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) if !child.is_empty() => {
                    dirs.insert(child.to_string());
                }
                None if !rest.is_empty() => {
                    files.insert(rest.to_string());
                }
                _ => {}
            }
        }
        Ok((files, dirs))
    }
}

#[async_trait(?Send)]
impl StorageBackend for MemoryStorageBackend {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files()?
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(path.to_string()))
    }

    async fn write_file(&self, path: &str, content: &[u8]) -> Result<(), StorageError> {
        self.files()?.insert(normalize(path), content.to_vec());
        Ok(())
    }

    async fn list_files(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.children(dir)?.0.into_iter().collect())
    }

    async fn list_dirs(&self, dir: &str) -> Result<Vec<String>, StorageError> {
        Ok(self.children(dir)?.1.into_iter().collect())
    }

    async fn file_exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.files()?.contains_key(&normalize(path)))
    }

    async fn delete_file(&self, path: &str) -> Result<(), StorageError> {
        self.files()?
            .remove(&normalize(path))
            .map(|_| ())
            .ok_or_else(|| StorageError::FileNotFound(path.to_string()))
    }

    async fn create_dir(&self, path: &str) -> Result<(), StorageError> {
        let path = normalize(path);
        if !path.is_empty() {
            self.dirs()?.insert(path);
        }
        Ok(())
    }

    async fn dir_exists(&self, path: &str) -> Result<bool, StorageError> {
        self.is_dir(&normalize(path))
    }

    async fn delete_dir(&self, path: &str) -> Result<(), StorageError> {
        let path = normalize(path);
        let prefix = prefix(&path);
        self.files()?.retain(|k, _| !k.starts_with(&prefix));
        self.dirs()?
            .retain(|d| *d != path && !d.starts_with(&prefix));
        Ok(())
    }
}
