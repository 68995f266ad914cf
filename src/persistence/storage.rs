//! Key-value storage backends

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use rustc_hash::FxHashMap;
use tempfile::NamedTempFile;
use thiserror::Error;

/// Errors raised by a storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing store failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// The write would exceed the storage quota.
    #[error("storage quota exceeded: {requested} bytes requested, quota is {quota} bytes")]
    QuotaExceeded {
        /// Bytes the store would hold after the write
        requested: usize,

        /// Maximum bytes the store may hold
        quota: usize,
    },

    /// The key can't be used by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// Durable string key-value storage, in the shape of the browser's `localStorage`.
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`, or `None` when the key is absent.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be read.
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be written.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backend can't be written.
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process storage, optionally limited to a byte quota like browser storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<FxHashMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Create unbounded in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create in-memory storage that rejects writes once keys and values exceed `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(quota),
        }
    }

    fn entries(&self) -> MutexGuard<'_, FxHashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries();

        if let Some(quota) = self.quota {
            let requested = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum::<usize>()
                + key.len()
                + value.len();

            if requested > quota {
                return Err(StorageError::QuotaExceeded { requested, quota });
            }
        }

        entries.insert(key.to_string(), value.to_string());

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);

        Ok(())
    }
}

/// Directory-backed storage: each key is a `<key>.json` file.
///
/// Writes go to a uniquely named temporary file in the same directory that is renamed over the
/// target, so a crash mid-write leaves the previous value intact. A failed rename removes the
/// temporary file.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Store records under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory records are stored in.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');

        if valid {
            Ok(self.dir.join(format!("{key}.json")))
        } else {
            Err(StorageError::InvalidKey(key.to_string()))
        }
    }
}

impl KeyValueStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(contents) => Ok(Some(contents)),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;

        fs::create_dir_all(&self.dir)?;

        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(value.as_bytes())?;
        tmp.persist(&path).map_err(io::Error::from)?;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Err(error) if error.kind() != io::ErrorKind::NotFound => Err(error.into()),
            _ => Ok(()),
        }
    }
}
