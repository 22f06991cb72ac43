//! Pocket Cart Store - Stateful, persisted cart.
//!
//! This crate owns the cart at runtime:
//! - [`CartStore`] - the single source of truth, shared by handle
//! - [`storage`] - async key-value port plus memory and file adapters
//! - [`codec`] - the persisted JSON format
//! - [`config`] - environment-driven configuration
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use pocket_cart_core::{ItemId, NewItem};
//! use pocket_cart_store::{CartConfig, CartStore, storage::FileStore};
//! use rust_decimal::Decimal;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CartConfig::from_env()?;
//! let storage = Arc::new(FileStore::new(&config.data_dir));
//! let store = CartStore::open(storage, &config).await?;
//!
//! store.add_to_cart(NewItem::new("42", "Mug", "https://img/mug.png", Decimal::new(1990, 2)));
//! store.increment(&ItemId::new("42"));
//! println!("{} items", store.totals().item_count);
//!
//! store.flush().await;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

mod cart_store;
pub mod codec;
pub mod config;
pub mod error;
mod persistence;
pub mod storage;

pub use cart_store::{CartStore, CartWatcher};
pub use config::{CartConfig, ConfigError};
pub use error::{CartError, Result};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
