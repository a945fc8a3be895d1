//! The unified transaction model shared by income and expense rows.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, ledger::TransactionKind};

/// The row ID of an income or expense record, unique within its table.
pub type RecordId = i64;

/// The label used when a row has no source or category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Identifies a transaction across both tables, e.g. "income-3" or "expense-3".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TransactionKey {
    /// The table the row lives in.
    pub kind: TransactionKind,
    /// The row ID within that table.
    pub id: RecordId,
}

impl Display for TransactionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.kind, self.id)
    }
}

impl FromStr for TransactionKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once('-')
            .ok_or_else(|| Error::InvalidTransactionKey(s.to_owned()))?;
        let kind = kind
            .parse()
            .map_err(|_| Error::InvalidTransactionKey(s.to_owned()))?;
        let id = id
            .parse()
            .map_err(|_| Error::InvalidTransactionKey(s.to_owned()))?;

        Ok(Self { kind, id })
    }
}

impl TryFrom<String> for TransactionKey {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TransactionKey> for String {
    fn from(value: TransactionKey) -> Self {
        value.to_string()
    }
}

/// An income or expense row normalized to a common shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The row ID within the source table.
    pub id: RecordId,
    /// Which table the row came from.
    pub kind: TransactionKind,
    /// When the money moved.
    pub date: Date,
    /// The funding source for income or the spending category for expenses.
    pub category_label: String,
    /// The non-negative amount of money.
    pub amount: f64,
    /// Optional free text.
    pub notes: Option<String>,
}

impl Transaction {
    /// The composite key that identifies this transaction across both tables.
    pub fn key(&self) -> TransactionKey {
        TransactionKey {
            kind: self.kind,
            id: self.id,
        }
    }
}

/// Replace a missing or blank category label with [UNCATEGORIZED].
pub fn normalize_category_label(raw_label: Option<String>) -> String {
    match raw_label {
        Some(label) if !label.trim().is_empty() => label,
        _ => UNCATEGORIZED.to_owned(),
    }
}

/// Turn blank notes into `None`.
pub fn normalize_notes(raw_notes: Option<String>) -> Option<String> {
    raw_notes.filter(|notes| !notes.trim().is_empty())
}

/// Ledger totals for a user.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Summary {
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all expenses.
    pub total_expenses: f64,
    /// Income minus expenses.
    pub balance: f64,
}

impl Summary {
    /// Build a summary from the two totals, deriving the balance.
    pub fn from_totals(total_income: f64, total_expenses: f64) -> Self {
        Self {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
        }
    }
}
