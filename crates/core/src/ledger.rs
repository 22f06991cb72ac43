//! In-memory transaction ledger with a derived balance.
//!
//! Same shape as the cart: an append-only list owned by one component and an
//! aggregate recomputed from it on every read.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::TransactionId;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Income,
    Outcome,
}

/// A recorded transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub title: String,
    pub kind: TransactionKind,
    pub value: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Input for [`TransactionLedger::create`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewTransaction {
    pub title: String,
    pub kind: TransactionKind,
    pub value: Decimal,
}

/// Income, outcome and their difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Balance {
    pub income: Decimal,
    pub outcome: Decimal,
    pub total: Decimal,
}

/// Append-only list of transactions.
#[derive(Debug, Clone, Default)]
pub struct TransactionLedger {
    transactions: Vec<Transaction>,
}

impl TransactionLedger {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            transactions: Vec::new(),
        }
    }

    /// All transactions in the order they were created.
    #[must_use]
    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Record a transaction and return it.
    pub fn create(&mut self, input: NewTransaction) -> Transaction {
        let transaction = Transaction {
            id: TransactionId::generate(),
            title: input.title,
            kind: input.kind,
            value: input.value,
            created_at: Utc::now(),
        };
        self.transactions.push(transaction.clone());
        transaction
    }

    /// Fold every transaction into a [`Balance`].
    #[must_use]
    pub fn balance(&self) -> Balance {
        self.transactions
            .iter()
            .fold(Balance::default(), |mut acc, tx| {
                match tx.kind {
                    TransactionKind::Income => {
                        acc.income += tx.value;
                        acc.total += tx.value;
                    }
                    TransactionKind::Outcome => {
                        acc.outcome += tx.value;
                        acc.total -= tx.value;
                    }
                }
                acc
            })
    }
}
