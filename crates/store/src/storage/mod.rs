//! Key-value storage port used to persist the cart.
//!
//! The store only ever needs three operations on opaque string values, so
//! the port is intentionally narrow. Two adapters ship with the crate:
//!
//! - [`MemoryStore`] - process-local map, for tests and ephemeral sessions
//! - [`FileStore`] - one JSON file per key under a base directory

use async_trait::async_trait;
use thiserror::Error;

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors returned by storage adapters.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying I/O failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be stored by this adapter.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// The backend is unavailable.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Async key-value store holding string values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value for `key`, or `None` if nothing is stored.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set(&self, key: &str, value: String) -> Result<(), StorageError>;

    /// Delete the value for `key`. Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}
