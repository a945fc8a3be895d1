//! The record store: the `income` and `expenses` tables.
//!
//! Every query is scoped to the owning user. The table and label column for a
//! query always come from [TransactionKind::source].

use rusqlite::{Connection, Row};
use time::Date;

use crate::{
    Error,
    auth::UserID,
    ledger::{
        Transaction, TransactionKey, TransactionKind,
        transaction::{normalize_category_label, normalize_notes},
    },
};

/// The user editable fields of an income or expense row.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordFields {
    /// When the money moved.
    pub date: Date,
    /// The funding source or spending category.
    pub category_label: String,
    /// The non-negative amount of money.
    pub amount: f64,
    /// Optional free text.
    pub notes: Option<String>,
}

/// The order in which rows are fetched from a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOrder {
    /// Oldest row ID first.
    Insertion,
    /// Latest date first, then by row ID.
    NewestFirst,
}

impl RecordOrder {
    fn as_sql(self) -> &'static str {
        match self {
            RecordOrder::Insertion => "id ASC",
            RecordOrder::NewestFirst => "date DESC, id ASC",
        }
    }
}

/// Create the `income` and `expenses` tables.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_record_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for kind in TransactionKind::ALL {
        let source = kind.source();

        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    date TEXT NOT NULL,
                    {label} TEXT,
                    amount REAL NOT NULL CHECK (amount >= 0),
                    notes TEXT,
                    user_id INTEGER NOT NULL,
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
                table = source.table,
                label = source.label_column,
            ),
            (),
        )?;

        connection.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_user_date ON {table}(user_id, date)",
                table = source.table,
            ),
            (),
        )?;
    }

    Ok(())
}

/// Map a row of `id, date, label, amount, notes` to a [Transaction].
pub(super) fn map_record_row(
    kind: TransactionKind,
    row: &Row,
) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        kind,
        date: row.get(1)?,
        category_label: normalize_category_label(row.get(2)?),
        amount: row.get(3)?,
        notes: normalize_notes(row.get(4)?),
    })
}

/// Insert a new row into the table for `kind`.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred, e.g. the
/// user does not exist.
pub fn insert_record(
    kind: TransactionKind,
    fields: &RecordFields,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let source = kind.source();

    connection.execute(
        &format!(
            "INSERT INTO {table} (date, {label}, amount, notes, user_id)
            VALUES (?1, ?2, ?3, ?4, ?5)",
            table = source.table,
            label = source.label_column,
        ),
        (
            fields.date,
            &fields.category_label,
            fields.amount,
            &fields.notes,
            user_id.as_i64(),
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        kind,
        date: fields.date,
        category_label: normalize_category_label(Some(fields.category_label.clone())),
        amount: fields.amount,
        notes: normalize_notes(fields.notes.clone()),
    })
}

/// Get the row identified by `key`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the row does not exist or belongs to another user.
pub fn get_record(
    key: TransactionKey,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let source = key.kind.source();

    connection
        .prepare(&format!(
            "SELECT id, date, {label}, amount, notes FROM {table}
            WHERE id = :id AND user_id = :user_id",
            table = source.table,
            label = source.label_column,
        ))?
        .query_row(
            &[(":id", &key.id), (":user_id", &user_id.as_i64())],
            |row| map_record_row(key.kind, row),
        )
        .map_err(|error| error.into())
}

/// Fetch rows of `kind` owned by `user_id` in `order`, at most `limit` rows.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn select_records(
    kind: TransactionKind,
    user_id: UserID,
    order: RecordOrder,
    limit: Option<u32>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let source = kind.source();
    // A negative limit means no limit in SQLite.
    let limit = limit.map(i64::from).unwrap_or(-1);

    connection
        .prepare(&format!(
            "SELECT id, date, {label}, amount, notes FROM {table}
            WHERE user_id = :user_id
            ORDER BY {order}
            LIMIT :limit",
            table = source.table,
            label = source.label_column,
            order = order.as_sql(),
        ))?
        .query_map(
            &[(":user_id", &user_id.as_i64()), (":limit", &limit)],
            |row| map_record_row(kind, row),
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Overwrite the editable fields of the row identified by `key`.
///
/// The kind of a row cannot change, so `key.kind` selects the table.
///
/// # Errors
///
/// Returns [Error::UpdateMissingTransaction] if no row was updated.
pub fn update_record(
    key: TransactionKey,
    fields: &RecordFields,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let source = key.kind.source();

    let rows_affected = connection.execute(
        &format!(
            "UPDATE {table} SET date = ?1, {label} = ?2, amount = ?3, notes = ?4
            WHERE id = ?5 AND user_id = ?6",
            table = source.table,
            label = source.label_column,
        ),
        (
            fields.date,
            &fields.category_label,
            fields.amount,
            &fields.notes,
            key.id,
            user_id.as_i64(),
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(Transaction {
        id: key.id,
        kind: key.kind,
        date: fields.date,
        category_label: normalize_category_label(Some(fields.category_label.clone())),
        amount: fields.amount,
        notes: normalize_notes(fields.notes.clone()),
    })
}

/// Delete the row identified by `key`.
///
/// # Errors
///
/// Returns [Error::DeleteMissingTransaction] if no row was deleted.
pub fn delete_record(
    key: TransactionKey,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        &format!(
            "DELETE FROM {table} WHERE id = ?1 AND user_id = ?2",
            table = key.kind.source().table
        ),
        (key.id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Count the rows of `kind` owned by `user_id`.
pub fn count_records(
    kind: TransactionKind,
    user_id: UserID,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .query_row(
            &format!(
                "SELECT COUNT(id) FROM {table} WHERE user_id = ?1",
                table = kind.source().table
            ),
            [user_id.as_i64()],
            |row| row.get::<_, i64>(0),
        )
        .map_err(Error::from)
        .and_then(|count| {
            usize::try_from(count).map_err(|error| {
                tracing::error!("Got invalid row count {count}: {error}");
                Error::SqlError(rusqlite::Error::IntegralValueOutOfRange(0, count))
            })
        })
}
