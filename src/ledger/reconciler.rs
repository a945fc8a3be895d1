//! Reconciles the income and expense tables into one transaction feed.
//!
//! The aggregation views are tried first. When they are disabled, fail, or
//! return nothing, both tables are fetched and merged here instead. Nothing
//! is cached: every call is a fresh projection of the record store.

use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        Aggregation, Summary, Transaction, TransactionKey, TransactionKind,
        records::{RecordOrder, delete_record, select_records},
    },
};

/// How many transactions the dashboard shows.
pub const RECENT_TRANSACTIONS_LIMIT: u32 = 8;

/// How many rows per table the recent-transactions fallback fetches before
/// merging and truncating.
pub const RECENT_FALLBACK_FETCH_LIMIT: u32 = 50;

fn log_fallback(operation: &str, error: Error) {
    match error {
        Error::AggregationUnavailable => {
            tracing::debug!("Aggregation disabled, computing {operation} from the record tables")
        }
        error => tracing::warn!(
            "Aggregation failed for {operation}, computing it from the record tables: {error}"
        ),
    }
}

/// Concatenate income then expenses and stable sort by date, newest first.
///
/// Rows with the same date keep their concatenation order.
pub fn merge_records(income: Vec<Transaction>, expenses: Vec<Transaction>) -> Vec<Transaction> {
    let mut transactions = income;
    transactions.extend(expenses);
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
    transactions
}

/// Load every transaction of `user_id`, newest first.
///
/// # Errors
///
/// Returns an error if the record tables could not be read. Aggregation
/// errors are logged and trigger the fallback instead.
pub fn load_transactions(
    user_id: UserID,
    aggregation: Aggregation,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    match aggregation.all_transactions(user_id, connection) {
        Ok(transactions) if !transactions.is_empty() => return Ok(transactions),
        Ok(_) => tracing::debug!("Aggregation returned no transactions, merging the record tables"),
        Err(error) => log_fallback("all transactions", error),
    }

    let income = select_records(
        TransactionKind::Income,
        user_id,
        RecordOrder::Insertion,
        None,
        connection,
    )?;
    let expenses = select_records(
        TransactionKind::Expense,
        user_id,
        RecordOrder::Insertion,
        None,
        connection,
    )?;

    Ok(merge_records(income, expenses))
}

/// Load the [RECENT_TRANSACTIONS_LIMIT] most recent transactions of `user_id`.
///
/// The fallback reads at most [RECENT_FALLBACK_FETCH_LIMIT] rows per table,
/// newest first, so the truncated result is the true most recent set.
///
/// # Errors
///
/// Same as [load_transactions].
pub fn load_recent_transactions(
    user_id: UserID,
    aggregation: Aggregation,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    match aggregation.recent_transactions(user_id, RECENT_TRANSACTIONS_LIMIT, connection) {
        Ok(transactions) if !transactions.is_empty() => return Ok(transactions),
        Ok(_) => tracing::debug!(
            "Aggregation returned no recent transactions, merging the record tables"
        ),
        Err(error) => log_fallback("recent transactions", error),
    }

    let income = select_records(
        TransactionKind::Income,
        user_id,
        RecordOrder::NewestFirst,
        Some(RECENT_FALLBACK_FETCH_LIMIT),
        connection,
    )?;
    let expenses = select_records(
        TransactionKind::Expense,
        user_id,
        RecordOrder::NewestFirst,
        Some(RECENT_FALLBACK_FETCH_LIMIT),
        connection,
    )?;

    let mut transactions = merge_records(income, expenses);
    transactions.truncate(RECENT_TRANSACTIONS_LIMIT as usize);

    Ok(transactions)
}

/// Which transactions to show.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionFilter {
    /// Every transaction.
    #[default]
    All,
    /// Only income.
    Income,
    /// Only expenses.
    Expense,
}

impl TransactionFilter {
    /// Every filter, in display order.
    pub const OPTIONS: [TransactionFilter; 3] = [
        TransactionFilter::All,
        TransactionFilter::Income,
        TransactionFilter::Expense,
    ];

    /// Whether `transaction` passes this filter.
    pub fn matches(self, transaction: &Transaction) -> bool {
        match self {
            TransactionFilter::All => true,
            TransactionFilter::Income => transaction.kind == TransactionKind::Income,
            TransactionFilter::Expense => transaction.kind == TransactionKind::Expense,
        }
    }

    /// The value used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionFilter::All => "all",
            TransactionFilter::Income => "income",
            TransactionFilter::Expense => "expense",
        }
    }

    /// The text shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            TransactionFilter::All => "All",
            TransactionFilter::Income => "Income",
            TransactionFilter::Expense => "Expenses",
        }
    }
}

/// Keep the transactions that pass `filter`, preserving their order.
pub fn filter_transactions(
    transactions: Vec<Transaction>,
    filter: TransactionFilter,
) -> Vec<Transaction> {
    transactions
        .into_iter()
        .filter(|transaction| filter.matches(transaction))
        .collect()
}

/// The order to show transactions in.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first.
    DateAscending,
    /// Newest first.
    #[default]
    DateDescending,
    /// Smallest amount first.
    AmountAscending,
    /// Largest amount first.
    AmountDescending,
}

impl SortOrder {
    /// Every sort order, in display order.
    pub const OPTIONS: [SortOrder; 4] = [
        SortOrder::DateDescending,
        SortOrder::DateAscending,
        SortOrder::AmountDescending,
        SortOrder::AmountAscending,
    ];

    /// The value used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::DateAscending => "date_ascending",
            SortOrder::DateDescending => "date_descending",
            SortOrder::AmountAscending => "amount_ascending",
            SortOrder::AmountDescending => "amount_descending",
        }
    }

    /// The text shown to the user.
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::DateAscending => "Date (oldest first)",
            SortOrder::DateDescending => "Date (newest first)",
            SortOrder::AmountAscending => "Amount (low to high)",
            SortOrder::AmountDescending => "Amount (high to low)",
        }
    }
}

/// Stable sort `transactions` by the field named in `order`.
///
/// Ties keep their input order.
pub fn sort_transactions(
    mut transactions: Vec<Transaction>,
    order: SortOrder,
) -> Vec<Transaction> {
    match order {
        SortOrder::DateAscending => transactions.sort_by(|a, b| a.date.cmp(&b.date)),
        SortOrder::DateDescending => transactions.sort_by(|a, b| b.date.cmp(&a.date)),
        SortOrder::AmountAscending => transactions.sort_by(|a, b| a.amount.total_cmp(&b.amount)),
        SortOrder::AmountDescending => transactions.sort_by(|a, b| b.amount.total_cmp(&a.amount)),
    }

    transactions
}

/// Delete the transaction identified by `key` from the table for its kind.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if the row no longer exists.
pub fn delete_transaction(
    key: TransactionKey,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    delete_record(key, user_id, connection)?;
    tracing::info!("Deleted transaction {key} for user {user_id}");

    Ok(())
}

/// Total the given income and expense rows.
pub fn summarize(income: &[Transaction], expenses: &[Transaction]) -> Summary {
    let total_income = income.iter().map(|transaction| transaction.amount).sum();
    let total_expenses = expenses.iter().map(|transaction| transaction.amount).sum();

    Summary::from_totals(total_income, total_expenses)
}

/// Load the ledger totals of `user_id`.
///
/// Reads the `ledger_summary` view, or recomputes the totals from both
/// tables when the view cannot be used.
///
/// # Errors
///
/// Returns an error if the record tables could not be read.
pub fn load_summary(
    user_id: UserID,
    aggregation: Aggregation,
    connection: &Connection,
) -> Result<Summary, Error> {
    match aggregation.summary(user_id, connection) {
        Ok(summary) => return Ok(summary),
        Err(error) => log_fallback("summary", error),
    }

    let income = select_records(
        TransactionKind::Income,
        user_id,
        RecordOrder::Insertion,
        None,
        connection,
    )?;
    let expenses = select_records(
        TransactionKind::Expense,
        user_id,
        RecordOrder::Insertion,
        None,
        connection,
    )?;

    Ok(summarize(&income, &expenses))
}

/// The total amount for one category label.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The source or category.
    pub label: String,
    /// The summed amount.
    pub total: f64,
}

/// Sum the amounts of the `kind` transactions by category label.
///
/// Labels appear in the order they are first seen.
pub fn category_distribution(
    transactions: &[Transaction],
    kind: TransactionKind,
) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = Vec::new();

    for transaction in transactions
        .iter()
        .filter(|transaction| transaction.kind == kind)
    {
        match totals
            .iter_mut()
            .find(|total| total.label == transaction.category_label)
        {
            Some(total) => total.total += transaction.amount,
            None => totals.push(CategoryTotal {
                label: transaction.category_label.clone(),
                total: transaction.amount,
            }),
        }
    }

    totals
}
