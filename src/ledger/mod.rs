//! The temple ledger: income and expense records and their unified view.

mod aggregation;
mod kind;
pub mod reconciler;
pub mod records;
mod transaction;

pub use aggregation::{Aggregation, create_aggregation_views};
pub use kind::{TransactionKind, TransactionSource};
pub use reconciler::{
    CategoryTotal, RECENT_TRANSACTIONS_LIMIT, SortOrder, TransactionFilter,
    category_distribution, delete_transaction, filter_transactions, load_recent_transactions,
    load_summary, load_transactions, sort_transactions,
};
pub use records::{RecordFields, create_record_tables};
pub use transaction::{RecordId, Summary, Transaction, TransactionKey, UNCATEGORIZED};
