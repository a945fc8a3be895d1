//! The transaction editor: one form for creating and editing income and expenses.

mod endpoint;
mod form;
mod page;

pub use endpoint::{create_transaction_endpoint, update_transaction_endpoint};
pub use form::ReturnTo;
pub use page::{get_edit_transaction_page, get_new_transaction_page};
