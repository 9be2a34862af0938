//! Local key-value store for guest state.
//!
//! Holds the guest cart, wishlist, addresses and the bearer token between
//! runs. Values are JSON strings under well-known [`keys`]. Each call is
//! atomic on its own; concurrent writers are not coordinated and the last
//! write wins.

mod file;
pub mod keys;
mod memory;

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::warn;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors that can occur when reading or writing the local store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serializing a value failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}

/// Raw string storage, the equivalent of browser local storage.
pub trait LocalStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

/// Shared handle to a [`LocalStore`] with typed JSON helpers.
#[derive(Clone)]
pub struct Storage {
    inner: Arc<dyn LocalStore>,
}

impl Storage {
    /// Wrap a store implementation.
    #[must_use]
    pub fn new(store: impl LocalStore + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    /// An empty in-memory store.
    #[must_use]
    pub fn memory() -> Self {
        Self::new(MemoryStore::default())
    }

    /// Read the raw string under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    pub fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    /// Store a raw string under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    pub fn set_raw(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set(key, value)
    }

    /// Remove `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key)
    }

    /// Load and decode the JSON value under `key`.
    ///
    /// A value that no longer decodes is logged and treated as absent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be read.
    pub fn load_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let Some(raw) = self.inner.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key, error = %e, "Discarding unreadable local store value");
                Ok(None)
            }
        }
    }

    /// Load the JSON value under `key`, or `T::default()` when absent.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backing storage cannot be read.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> Result<T, StoreError> {
        Ok(self.load_json(key)?.unwrap_or_default())
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or writing fails.
    pub fn save_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.inner.set(key, &raw)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").finish_non_exhaustive()
    }
}
