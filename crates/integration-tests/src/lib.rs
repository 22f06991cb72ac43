//! Integration tests for Pocket Cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p pocket-cart-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_scenarios` - End-to-end cart flows against in-memory storage
//! - `persistence` - Ordering, failure and file-backed persistence
//!
//! Shared helpers live here so every test file builds carts the same way.

use std::path::PathBuf;

use pocket_cart_core::NewItem;
use rust_decimal::Decimal;

/// A catalog product priced in whole units.
#[must_use]
pub fn product(id: &str, price: i64) -> NewItem {
    NewItem::new(
        id,
        format!("Product {id}"),
        format!("https://cdn.example/{id}.jpg"),
        Decimal::from(price),
    )
}

/// A fresh, not-yet-created directory under the system temp dir.
#[must_use]
pub fn temp_data_dir() -> PathBuf {
    std::env::temp_dir().join(format!("pocket-cart-it-{}", uuid::Uuid::new_v4()))
}
