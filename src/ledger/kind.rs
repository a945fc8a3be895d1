//! The two kinds of transaction and the table/column each is stored in.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Whether a transaction is money coming in or going out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received, labelled by its funding source.
    #[default]
    Income,
    /// Money spent, labelled by its spending category.
    Expense,
}

/// Where the rows of one transaction kind live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionSource {
    /// The table holding the rows.
    pub table: &'static str,
    /// The column holding the category label.
    pub label_column: &'static str,
}

const INCOME_SOURCE: TransactionSource = TransactionSource {
    table: "income",
    label_column: "source",
};

const EXPENSE_SOURCE: TransactionSource = TransactionSource {
    table: "expenses",
    label_column: "category",
};

impl TransactionKind {
    /// Both kinds, income first.
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Income, TransactionKind::Expense];

    /// The table and label column for this kind.
    pub const fn source(self) -> TransactionSource {
        match self {
            TransactionKind::Income => INCOME_SOURCE,
            TransactionKind::Expense => EXPENSE_SOURCE,
        }
    }

    /// Find the kind stored in `table`, if any.
    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.source().table == table)
    }

    /// The lowercase name used in URLs and forms.
    pub const fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    /// The human readable name, e.g. for headings.
    pub const fn title(self) -> &'static str {
        match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
        }
    }

    /// The name of the category label field shown to the user.
    pub const fn label_name(self) -> &'static str {
        match self {
            TransactionKind::Income => "Source",
            TransactionKind::Expense => "Category",
        }
    }

    /// Example text for the category label input.
    pub const fn label_placeholder(self) -> &'static str {
        match self {
            TransactionKind::Income => "Source (eg Donation)",
            TransactionKind::Expense => "Category (eg Maintenance)",
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}
