//! Creates the application's database schema.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    auth::{create_password_recovery_table, create_session_table, create_user_table},
    ledger::{create_aggregation_views, create_record_tables},
};

/// Create every table and view the application needs.
///
/// Safe to call on a database that has already been initialized.
///
/// # Errors
///
/// Returns an error if any of the SQL queries failed.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_session_table(&transaction)?;
    create_password_recovery_table(&transaction)?;
    create_record_tables(&transaction)?;
    create_aggregation_views(&transaction)?;

    transaction.commit()?;

    Ok(())
}
