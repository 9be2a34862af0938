//! Client state shared by every service.

use std::sync::Arc;

use thiserror::Error;

use crate::api::{ApiClient, ApiError};
use crate::config::StorefrontConfig;
use crate::services::pincode::{PincodeClient, PincodeError};
use crate::store::{FileStore, StoreError, Storage};

/// Error creating the storefront state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("api client: {0}")]
    Api(#[from] ApiError),
    #[error("pincode client: {0}")]
    Pincode(#[from] PincodeError),
    #[error("local store: {0}")]
    Store(#[from] StoreError),
}

/// Storefront client state.
///
/// This struct is cheaply cloneable via `Arc` and gives the services access
/// to configuration, the backend client and the local store.
#[derive(Clone, Debug)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

#[derive(Debug)]
struct StorefrontInner {
    config: StorefrontConfig,
    api: ApiClient,
    storage: Storage,
    pincode: PincodeClient,
}

impl Storefront {
    /// Create state backed by the file store under `config.state_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built or the state
    /// directory cannot be created.
    pub fn open(config: StorefrontConfig) -> Result<Self, StateError> {
        let storage = Storage::new(FileStore::open(config.store_path())?);
        Self::with_storage(config, storage)
    }

    /// Create state over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP clients cannot be built.
    pub fn with_storage(config: StorefrontConfig, storage: Storage) -> Result<Self, StateError> {
        let api = ApiClient::new(&config)?;
        let pincode = PincodeClient::new(&config)?;

        Ok(Self {
            inner: Arc::new(StorefrontInner {
                config,
                api,
                storage,
                pincode,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the backend client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the local store.
    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.inner.storage
    }

    /// Get a reference to the pincode lookup client.
    #[must_use]
    pub fn pincode(&self) -> &PincodeClient {
        &self.inner.pincode
    }

    /// Whether a bearer token is loaded.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.api.has_token()
    }
}
