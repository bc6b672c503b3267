//! Small JSON-file store for allow-lists and the verified member list.
//!
//! Each key maps to `<dir>/<key>.json` holding one JSON array.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::debug;

use crate::model::{AuthorDirectory, AuthorRecord};

/// Well-known store keys.
pub mod keys {
    pub const ALLOWED_CHANNELS: &str = "allowed_channels";
    pub const ALLOWED_ROLES: &str = "allowed_roles";
    pub const VERIFIED_MEMBERS: &str = "verified_members";
    pub const VERIFIED_ROLES: &str = "verified_roles";
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store key {0:?}")]
    InvalidKey(String),

    #[error("failed to access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Directory of JSON arrays, one file per key.
#[derive(Debug, Clone)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidKey`] for keys that are empty or could
    /// escape the store directory.
    pub fn path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Read the list stored under `key`; a missing file is an empty list.
    ///
    /// # Errors
    /// Fails when the file cannot be read or does not hold a JSON array of `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StoreError> {
        let path = self.path(key)?;
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "store file missing, using empty list");
                return Ok(Vec::new());
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        serde_json::from_str(&content).map_err(|source| StoreError::Json { path, source })
    }

    /// Replace the list stored under `key`.
    ///
    /// The file is written beside its destination and renamed into place.
    ///
    /// # Errors
    /// Fails when the directory or file cannot be written.
    pub fn set<T: Serialize>(&self, key: &str, items: &[T]) -> Result<(), StoreError> {
        let path = self.path(key)?;
        let io_err = |source: io::Error| StoreError::Io {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        let json = serde_json::to_string_pretty(items).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)?;
        debug!(path = %path.display(), count = items.len(), "store updated");
        Ok(())
    }

    /// Append `item` unless it is already present. Returns whether it was added.
    ///
    /// # Errors
    /// Propagates read and write failures.
    pub fn add<T>(&self, key: &str, item: T) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned + PartialEq,
    {
        let mut items: Vec<T> = self.get(key)?;
        if items.contains(&item) {
            return Ok(false);
        }
        items.push(item);
        self.set(key, &items)?;
        Ok(true)
    }

    /// Remove every copy of `item`. Returns whether anything was removed.
    ///
    /// # Errors
    /// Propagates read and write failures.
    pub fn remove<T>(&self, key: &str, item: &T) -> Result<bool, StoreError>
    where
        T: Serialize + DeserializeOwned + PartialEq,
    {
        let mut items: Vec<T> = self.get(key)?;
        let before = items.len();
        items.retain(|existing| existing != item);
        if items.len() == before {
            return Ok(false);
        }
        self.set(key, &items)?;
        Ok(true)
    }

    /// The verified member list as an author directory.
    ///
    /// # Errors
    /// Propagates read failures.
    pub fn authors(&self) -> Result<AuthorDirectory, StoreError> {
        let records: Vec<AuthorRecord> = self.get(keys::VERIFIED_MEMBERS)?;
        Ok(AuthorDirectory::new(records))
    }
}
