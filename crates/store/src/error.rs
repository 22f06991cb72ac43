//! Error types for the cart store.
//!
//! Only startup can fail. Mutations never return an error: unknown ids are
//! reported as [`Outcome::Unchanged`](pocket_cart_core::Outcome::Unchanged)
//! and persistence failures are logged and sent to Sentry by the
//! persistence worker.

use thiserror::Error;

use crate::codec::CodecError;
use crate::storage::StorageError;

/// Errors opening a [`CartStore`](crate::CartStore).
#[derive(Debug, Error)]
pub enum CartError {
    /// Persisted data exists but is not a valid cart.
    ///
    /// The stored value is left untouched.
    #[error("failed to hydrate cart from {key:?}: {source}")]
    Hydration {
        key: String,
        #[source]
        source: CodecError,
    },

    /// Reading the persisted cart failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hydration_error_display_names_key() {
        let source = crate::codec::decode("oops").err();
        let Some(source) = source else {
            panic!("decode should fail");
        };
        let err = CartError::Hydration {
            key: "cart:products".to_string(),
            source,
        };
        let message = err.to_string();
        assert!(message.starts_with("failed to hydrate cart from \"cart:products\""));
    }

    #[test]
    fn test_storage_error_converts() {
        let err: CartError = StorageError::Unavailable("down".to_string()).into();
        assert_eq!(err.to_string(), "storage error: storage unavailable: down");
    }
}
