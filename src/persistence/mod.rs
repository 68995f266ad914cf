//! Persistence
//!
//! Saves a [`CartState`] to key-value storage after every mutation and restores it at start-up.
//! The record is a JSON envelope holding the state and a format version:
//!
//! ```json
//! { "state": { "items": [], "isOpen": false }, "version": 0 }
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::{cart::CartState, products::ProductId};

pub mod storage;

use storage::{KeyValueStorage, StorageError};

/// Key the cart record is stored under.
pub const CART_STORAGE_KEY: &str = "cart-storage";

/// Version written into new records.
pub const CURRENT_VERSION: u32 = 0;

/// Errors raised while saving or restoring a cart.
#[derive(Debug, Error)]
pub enum PersistError {
    /// The storage backend failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The cart could not be encoded.
    #[error("failed to encode cart: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored record could not be decoded.
    #[error("failed to decode stored cart: {0}")]
    Decode(#[source] serde_json::Error),

    /// The stored record was written by a newer format.
    #[error("stored cart has version {found}, newest supported is {supported}")]
    UnsupportedVersion {
        /// Version found in storage
        found: u32,

        /// Newest version this build reads
        supported: u32,
    },

    /// The stored record has two lines for the same product.
    #[error("stored cart has more than one line for product {0}")]
    DuplicateProduct(ProductId),
}

/// The stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCart {
    /// Cart contents
    pub state: CartState,

    /// Record format version
    #[serde(default)]
    pub version: u32,
}

impl PersistedCart {
    /// Wrap a state at the current version.
    #[must_use]
    pub fn new(state: CartState) -> Self {
        Self {
            state,
            version: CURRENT_VERSION,
        }
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Encode`] if serialisation fails.
    pub fn encode(&self) -> Result<String, PersistError> {
        serde_json::to_string(self).map_err(PersistError::Encode)
    }

    /// Decode and validate a stored record.
    ///
    /// # Errors
    ///
    /// - [`PersistError::Decode`]: the JSON is malformed or a line has a zero quantity.
    /// - [`PersistError::UnsupportedVersion`]: the record is from a newer format.
    /// - [`PersistError::DuplicateProduct`]: two lines share a product.
    pub fn decode(raw: &str) -> Result<Self, PersistError> {
        let record: Self = serde_json::from_str(raw).map_err(PersistError::Decode)?;

        if record.version > CURRENT_VERSION {
            return Err(PersistError::UnsupportedVersion {
                found: record.version,
                supported: CURRENT_VERSION,
            });
        }

        if let Some(product) = record.state.duplicate_product() {
            return Err(PersistError::DuplicateProduct(product.clone()));
        }

        Ok(record)
    }
}

/// Adapter between a [`CartState`] and a storage backend.
#[derive(Debug)]
pub struct CartPersistence<S: KeyValueStorage> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> CartPersistence<S> {
    /// Persist under [`CART_STORAGE_KEY`].
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, CART_STORAGE_KEY)
    }

    /// Persist under a custom key.
    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// Key the record is stored under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Underlying storage backend.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Load the stored cart, or an empty cart when nothing has been stored yet.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the backend fails or the record is invalid.
    pub fn rehydrate(&self) -> Result<CartState, PersistError> {
        let Some(raw) = self.storage.get_item(&self.key)? else {
            debug!(key = %self.key, "no stored cart, starting empty");

            return Ok(CartState::default());
        };

        Ok(PersistedCart::decode(&raw)?.state)
    }

    /// Write a cart to storage.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if encoding or the write fails.
    pub fn persist(&self, state: &CartState) -> Result<(), PersistError> {
        let raw = PersistedCart::new(state.clone()).encode()?;

        self.storage.set_item(&self.key, &raw)?;

        debug!(key = %self.key, bytes = raw.len(), "persisted cart");

        Ok(())
    }

    /// Delete the stored record.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the backend fails.
    pub fn reset(&self) -> Result<(), PersistError> {
        self.storage.remove_item(&self.key)?;

        Ok(())
    }
}
