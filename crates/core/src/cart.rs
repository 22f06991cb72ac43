//! Cart state and its pure transition function.
//!
//! A [`CartState`] is an immutable, ordered list of [`CartItem`]s keyed by
//! [`ItemId`]. Every change goes through [`CartState::apply`], which returns
//! a brand-new state together with an [`Outcome`] describing what happened.
//! Nothing in this module performs I/O.
//!
//! # Invariants
//!
//! - No two items share an id.
//! - Every item present has `quantity >= 1`. Decrementing an item at
//!   quantity 1 removes it instead of keeping it at zero.
//! - Existing items keep their position; new items are appended.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::ItemId;

/// Errors raised when building a [`CartState`] from untrusted items.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartStateError {
    /// Two items share the same id.
    #[error("duplicate cart item id: {0}")]
    DuplicateId(ItemId),
    /// An item is present with a quantity of zero.
    #[error("cart item {0} has zero quantity")]
    ZeroQuantity(ItemId),
}

/// A line in the cart.
///
/// Serialized with the field names `id`, `title`, `imageUrl`, `price` and
/// `quantity`. `image_url` is accepted on read for data written by older
/// clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ItemId,
    pub title: String,
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
    pub quantity: u32,
}

impl CartItem {
    /// `price * quantity` for this line, saturating at the `Decimal` bounds.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A product offered to the cart, before it has a quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub id: ItemId,
    pub title: String,
    #[serde(rename = "imageUrl", alias = "image_url")]
    pub image_url: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub price: Decimal,
}

impl NewItem {
    /// Build a candidate item.
    #[must_use]
    pub fn new(
        id: impl Into<ItemId>,
        title: impl Into<String>,
        image_url: impl Into<String>,
        price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            image_url: image_url.into(),
            price,
        }
    }

    fn into_line(self) -> CartItem {
        CartItem {
            id: self.id,
            title: self.title,
            image_url: self.image_url,
            price: self.price,
            quantity: 1,
        }
    }
}

/// A request to change the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartCommand {
    /// Add the item, or bump its quantity if the id is already present.
    AddOrIncrement(NewItem),
    /// Bump the quantity of an existing item.
    Increment(ItemId),
    /// Lower the quantity of an existing item, removing it at zero.
    Decrement(ItemId),
}

impl CartCommand {
    /// The id the command targets.
    #[must_use]
    pub const fn item_id(&self) -> &ItemId {
        match self {
            Self::AddOrIncrement(item) => &item.id,
            Self::Increment(id) | Self::Decrement(id) => id,
        }
    }
}

/// What a transition did to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new line was appended with quantity 1.
    Added,
    /// An add hit an existing line; its quantity is now `quantity`.
    Merged { quantity: u32 },
    /// The line's quantity is now `quantity`.
    Incremented { quantity: u32 },
    /// The line's quantity is now `quantity` (at least 1).
    Decremented { quantity: u32 },
    /// The line was at quantity 1 and has been dropped.
    Removed,
    /// The id was not in the cart; nothing changed.
    Unchanged,
}

impl Outcome {
    /// Whether the transition produced a different state.
    #[must_use]
    pub const fn is_change(&self) -> bool {
        !matches!(self, Self::Unchanged)
    }
}

/// Result of [`CartState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: CartState,
    pub outcome: Outcome,
}

/// Derived cart totals. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Totals {
    /// Sum of all quantities.
    pub item_count: u64,
    /// Sum of `price * quantity` over all lines. Clamped to
    /// [`Decimal::MAX`] / [`Decimal::MIN`] instead of overflowing.
    pub price: Decimal,
}

/// The ordered contents of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct CartState {
    items: Vec<CartItem>,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub const fn empty() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from persisted or otherwise untrusted items.
    ///
    /// # Errors
    ///
    /// Returns [`CartStateError`] if two items share an id or an item has
    /// zero quantity.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, CartStateError> {
        let mut seen = std::collections::HashSet::with_capacity(items.len());
        for item in &items {
            if item.quantity == 0 {
                return Err(CartStateError::ZeroQuantity(item.id.clone()));
            }
            if !seen.insert(&item.id) {
                return Err(CartStateError::DuplicateId(item.id.clone()));
            }
        }
        Ok(Self { items })
    }

    /// Items in cart order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Look up a line by id.
    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of `price * quantity` over all lines, starting from zero.
    #[must_use]
    pub fn total_price(&self) -> Decimal {
        total_price(&self.items)
    }

    /// Sum of quantities over all lines, starting from zero.
    #[must_use]
    pub fn total_item_count(&self) -> u64 {
        total_item_count(&self.items)
    }

    /// Both totals at once.
    #[must_use]
    pub fn totals(&self) -> Totals {
        Totals {
            item_count: self.total_item_count(),
            price: self.total_price(),
        }
    }

    /// Apply a command, producing the next state.
    ///
    /// `self` is left untouched. When the outcome is [`Outcome::Unchanged`]
    /// the returned state equals `self`.
    #[must_use]
    pub fn apply(&self, command: CartCommand) -> Transition {
        match command {
            CartCommand::AddOrIncrement(candidate) => self.add_or_increment(candidate),
            CartCommand::Increment(id) => self.increment(&id),
            CartCommand::Decrement(id) => self.decrement(&id),
        }
    }

    fn position(&self, id: &ItemId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn add_or_increment(&self, candidate: NewItem) -> Transition {
        if self.position(&candidate.id).is_some() {
            let (state, quantity) = self.with_quantity_change(&candidate.id, u32::saturating_add);
            return Transition {
                state,
                outcome: Outcome::Merged { quantity },
            };
        }

        let mut items = Vec::with_capacity(self.items.len() + 1);
        items.extend(self.items.iter().cloned());
        items.push(candidate.into_line());
        Transition {
            state: Self { items },
            outcome: Outcome::Added,
        }
    }

    fn increment(&self, id: &ItemId) -> Transition {
        if self.position(id).is_none() {
            return self.unchanged();
        }
        let (state, quantity) = self.with_quantity_change(id, u32::saturating_add);
        Transition {
            state,
            outcome: Outcome::Incremented { quantity },
        }
    }

    fn decrement(&self, id: &ItemId) -> Transition {
        match self.get(id).map(|item| item.quantity) {
            None => self.unchanged(),
            Some(quantity) if quantity > 1 => {
                let (state, quantity) = self.with_quantity_change(id, u32::saturating_sub);
                Transition {
                    state,
                    outcome: Outcome::Decremented { quantity },
                }
            }
            Some(_) => Transition {
                state: Self {
                    items: self
                        .items
                        .iter()
                        .filter(|item| &item.id != id)
                        .cloned()
                        .collect(),
                },
                outcome: Outcome::Removed,
            },
        }
    }

    /// Copy the cart, applying `op(quantity, 1)` to the matching line.
    fn with_quantity_change(&self, id: &ItemId, op: fn(u32, u32) -> u32) -> (Self, u32) {
        let mut updated = 0;
        let items = self
            .items
            .iter()
            .map(|item| {
                if &item.id == id {
                    updated = op(item.quantity, 1);
                    CartItem {
                        quantity: updated,
                        ..item.clone()
                    }
                } else {
                    item.clone()
                }
            })
            .collect();
        (Self { items }, updated)
    }

    fn unchanged(&self) -> Transition {
        Transition {
            state: self.clone(),
            outcome: Outcome::Unchanged,
        }
    }
}

impl<'de> Deserialize<'de> for CartState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let items = Vec::<CartItem>::deserialize(deserializer)?;
        Self::from_items(items).map_err(serde::de::Error::custom)
    }
}

/// Sum of `price * quantity`, folding from zero.
///
/// Saturates at the `Decimal` bounds.
#[must_use]
pub fn total_price(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .fold(Decimal::ZERO, |acc, item| acc.saturating_add(item.line_total()))
}

/// Sum of quantities, folding from zero.
#[must_use]
pub fn total_item_count(items: &[CartItem]) -> u64 {
    items
        .iter()
        .fold(0_u64, |acc, item| acc + u64::from(item.quantity))
}
