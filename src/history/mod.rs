//! The transaction history: every income and expense of the user, filterable
//! by kind, sortable by date or amount, with edit and delete actions per row.

mod page;
mod table;

pub use page::get_history_page;
pub use table::{HistoryQuery, HistoryState, delete_transaction_endpoint, get_history_table};
