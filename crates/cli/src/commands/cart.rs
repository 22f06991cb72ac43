//! Cart commands.
//!
//! # Usage
//!
//! ```bash
//! # Add a product (or bump its quantity if already present)
//! pocket-cart add --id 1 --title "Cadeira Rivatti" --image-url https://img/1.jpg --price 400
//!
//! # Change quantities
//! pocket-cart increment 1
//! pocket-cart decrement 1
//!
//! # Print the cart and totals
//! pocket-cart show
//! ```
//!
//! Every command opens a file-backed store under `CART_DATA_DIR` (or
//! `--data-dir`), applies the change, waits for it to be written, and
//! renders the resulting cart.

use std::fmt::Write as _;
use std::sync::Arc;

use pocket_cart_core::{CartState, CurrencyCode, ItemId, NewItem, Outcome, Price};
use pocket_cart_store::{CartConfig, CartError, CartStore, FileStore};
use rust_decimal::Decimal;
use tracing::info;

/// A change to apply before rendering.
#[derive(Debug, Clone)]
pub enum CartAction {
    Show,
    Add(NewItem),
    Increment(ItemId),
    Decrement(ItemId),
}

/// Open the store, apply `action`, persist, and render the cart.
///
/// # Errors
///
/// Returns [`CartError`] if the persisted cart cannot be loaded.
pub async fn run(config: &CartConfig, action: CartAction) -> Result<String, CartError> {
    let storage = Arc::new(FileStore::new(&config.data_dir));
    let store = CartStore::open(storage, config).await?;

    let outcome = match action {
        CartAction::Show => None,
        CartAction::Add(item) => Some(store.add_to_cart(item)),
        CartAction::Increment(id) => Some(store.increment(&id)),
        CartAction::Decrement(id) => Some(store.decrement(&id)),
    };

    if let Some(outcome) = outcome {
        info!(?outcome, revision = store.revision(), "Cart updated");
        store.flush().await;
    }

    let mut out = String::new();
    if let Some(note) = outcome.and_then(describe) {
        out.push_str(note);
        out.push('\n');
    }
    out.push_str(&render(&store.snapshot(), config.currency));
    Ok(out)
}

const fn describe(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::Unchanged => Some("No item with that id in the cart."),
        Outcome::Removed => Some("Item removed."),
        _ => None,
    }
}

/// Render the cart as a plain-text table followed by its totals.
#[must_use]
pub fn render(state: &CartState, currency: CurrencyCode) -> String {
    let money = |amount: Decimal| Price::new(amount, currency).display();

    let mut out = String::new();
    if state.is_empty() {
        out.push_str("Cart is empty.\n");
    }
    for item in state.items() {
        let _ = writeln!(
            out,
            "{:<12} {:<30} {:>4} x {:>12} = {:>12}",
            item.id.as_str(),
            item.title,
            item.quantity,
            money(item.price),
            money(item.line_total()),
        );
    }

    let totals = state.totals();
    let _ = writeln!(
        out,
        "{} items, total {}",
        totals.item_count,
        money(totals.price)
    );
    out
}
