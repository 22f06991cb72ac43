//! Pocket Cart Core - Cart state and shared types.
//!
//! This crate provides the pure cart model shared across:
//! - `store` - Owns a `CartState` and persists it
//! - `cli` - Drives a file-backed store from the command line
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! storage, no async runtime. Every cart change is a value-to-value
//! transition that can be tested in isolation.
//!
//! # Modules
//!
//! - [`cart`] - Cart items, commands, the transition function and totals
//! - [`ledger`] - In-memory transaction ledger with a derived balance
//! - [`types`] - Newtype IDs and price formatting

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod ledger;
pub mod types;

pub use cart::{
    CartCommand, CartItem, CartState, CartStateError, NewItem, Outcome, Totals, Transition,
};
pub use ledger::{Balance, NewTransaction, Transaction, TransactionKind, TransactionLedger};
pub use types::*;
