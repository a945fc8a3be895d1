//! Server-side aggregation over the two record tables.
//!
//! The `ledger_transactions` view unions both tables into one shape and the
//! `ledger_summary` view holds the per-user totals. The service can be turned
//! off, in which case every call fails with [Error::AggregationUnavailable]
//! and callers merge the tables themselves.

use rusqlite::{Connection, Row, types::Type};

use crate::{
    Error,
    auth::UserID,
    ledger::{
        Summary, Transaction, TransactionKind,
        transaction::{normalize_category_label, normalize_notes},
    },
};

/// Whether the aggregation views may be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    /// Query the views.
    Enabled,
    /// Behave as if the views do not exist.
    Disabled,
}

/// Create the `ledger_transactions` and `ledger_summary` views.
///
/// The record tables must already exist.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_aggregation_views(connection: &Connection) -> Result<(), rusqlite::Error> {
    let selects = TransactionKind::ALL
        .into_iter()
        .enumerate()
        .map(|(kind_order, kind)| {
            let source = kind.source();
            format!(
                "SELECT id, date, '{kind}' AS kind, {kind_order} AS kind_order, \
                {label} AS label, amount, notes, user_id FROM {table}",
                label = source.label_column,
                table = source.table,
            )
        })
        .collect::<Vec<_>>()
        .join(" UNION ALL ");

    connection.execute(
        &format!("CREATE VIEW IF NOT EXISTS ledger_transactions AS {selects}"),
        (),
    )?;

    let income_table = TransactionKind::Income.source().table;
    let expense_table = TransactionKind::Expense.source().table;
    let income_total = format!(
        "COALESCE((SELECT SUM(amount) FROM {income_table} WHERE user_id = user.id), 0.0)"
    );
    let expense_total = format!(
        "COALESCE((SELECT SUM(amount) FROM {expense_table} WHERE user_id = user.id), 0.0)"
    );

    connection.execute(
        &format!(
            "CREATE VIEW IF NOT EXISTS ledger_summary AS
            SELECT
                user.id AS user_id,
                {income_total} AS total_income,
                {expense_total} AS total_expenses,
                {income_total} - {expense_total} AS balance
            FROM user"
        ),
        (),
    )?;

    Ok(())
}

fn map_unified_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        kind,
        date: row.get(1)?,
        category_label: normalize_category_label(row.get(3)?),
        amount: row.get(4)?,
        notes: normalize_notes(row.get(5)?),
    })
}

impl Aggregation {
    fn check_enabled(self) -> Result<(), Error> {
        match self {
            Aggregation::Enabled => Ok(()),
            Aggregation::Disabled => Err(Error::AggregationUnavailable),
        }
    }

    /// Every transaction of `user_id`, newest first.
    ///
    /// Equal dates are ordered income before expenses, then by row ID.
    ///
    /// # Errors
    ///
    /// Returns [Error::AggregationUnavailable] if the service is disabled, or
    /// a [Error::SqlError] if the query failed.
    pub fn all_transactions(
        self,
        user_id: UserID,
        connection: &Connection,
    ) -> Result<Vec<Transaction>, Error> {
        self.query_transactions(user_id, None, connection)
    }

    /// The `limit` most recent transactions of `user_id`, newest first.
    ///
    /// # Errors
    ///
    /// Same as [Aggregation::all_transactions].
    pub fn recent_transactions(
        self,
        user_id: UserID,
        limit: u32,
        connection: &Connection,
    ) -> Result<Vec<Transaction>, Error> {
        self.query_transactions(user_id, Some(limit), connection)
    }

    fn query_transactions(
        self,
        user_id: UserID,
        limit: Option<u32>,
        connection: &Connection,
    ) -> Result<Vec<Transaction>, Error> {
        self.check_enabled()?;
        let limit = limit.map(i64::from).unwrap_or(-1);

        connection
            .prepare(
                "SELECT id, date, kind, label, amount, notes FROM ledger_transactions
                WHERE user_id = :user_id
                ORDER BY date DESC, kind_order ASC, id ASC
                LIMIT :limit",
            )?
            .query_map(
                &[(":user_id", &user_id.as_i64()), (":limit", &limit)],
                map_unified_row,
            )?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }

    /// The precomputed totals of `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [Error::AggregationUnavailable] if the service is disabled,
    /// [Error::NotFound] if the user has no summary row, or a
    /// [Error::SqlError] if the query failed.
    pub fn summary(self, user_id: UserID, connection: &Connection) -> Result<Summary, Error> {
        self.check_enabled()?;

        connection
            .prepare(
                "SELECT total_income, total_expenses, balance FROM ledger_summary
                WHERE user_id = :user_id",
            )?
            .query_row(&[(":user_id", &user_id.as_i64())], |row| {
                Ok(Summary {
                    total_income: row.get(0)?,
                    total_expenses: row.get(1)?,
                    balance: row.get(2)?,
                })
            })
            .map_err(|error| error.into())
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        Error,
        auth::UserID,
        db::initialize,
        ledger::{
            Aggregation, Summary,
            TransactionKind::{self, Expense, Income},
            records::{RecordFields, insert_record},
        },
        test_utils::create_test_user,
    };

    fn get_test_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_test_user(&connection, "treasurer@temple.org");

        (connection, user.id)
    }

    fn insert(
        connection: &Connection,
        user_id: UserID,
        rows: &[(TransactionKind, time::Date, &str, f64)],
    ) {
        for &(kind, date, label, amount) in rows {
            insert_record(
                kind,
                &RecordFields {
                    date,
                    category_label: label.to_owned(),
                    amount,
                    notes: None,
                },
                user_id,
                connection,
            )
            .unwrap();
        }
    }

    #[test]
    fn disabled_service_is_unavailable() {
        let (connection, user_id) = get_test_connection();

        assert_eq!(
            Aggregation::Disabled.all_transactions(user_id, &connection),
            Err(Error::AggregationUnavailable)
        );
        assert_eq!(
            Aggregation::Disabled.recent_transactions(user_id, 8, &connection),
            Err(Error::AggregationUnavailable)
        );
        assert_eq!(
            Aggregation::Disabled.summary(user_id, &connection),
            Err(Error::AggregationUnavailable)
        );
    }

    #[test]
    fn all_transactions_are_unified_and_sorted() {
        let (connection, user_id) = get_test_connection();
        insert(
            &connection,
            user_id,
            &[
                (Income, date!(2024 - 01 - 05), "Donation", 500.0),
                (Expense, date!(2024 - 01 - 06), "Maintenance", 200.0),
            ],
        );

        let transactions = Aggregation::Enabled
            .all_transactions(user_id, &connection)
            .unwrap();

        assert_eq!(transactions.len(), 2);
        assert_eq!(transactions[0].kind, Expense);
        assert_eq!(transactions[0].category_label, "Maintenance");
        assert_eq!(transactions[0].date, date!(2024 - 01 - 06));
        assert_eq!(transactions[1].kind, Income);
        assert_eq!(transactions[1].category_label, "Donation");
    }

    #[test]
    fn recent_transactions_respects_limit() {
        let (connection, user_id) = get_test_connection();
        for day in 1..=5 {
            let date = time::Date::from_calendar_date(2024, time::Month::March, day).unwrap();
            insert(
                &connection,
                user_id,
                &[(Income, date, "Donation", 1.0), (Expense, date, "Flowers", 1.0)],
            );
        }

        let transactions = Aggregation::Enabled
            .recent_transactions(user_id, 3, &connection)
            .unwrap();

        let got = transactions
            .iter()
            .map(|transaction| (transaction.date.day(), transaction.kind))
            .collect::<Vec<_>>();
        assert_eq!(got, [(5, Income), (5, Expense), (4, Income)]);
    }

    #[test]
    fn transactions_are_scoped_to_user() {
        let (connection, user_id) = get_test_connection();
        let other_user = create_test_user(&connection, "priest@temple.org");
        insert(
            &connection,
            other_user.id,
            &[(Income, date!(2024 - 01 - 05), "Donation", 500.0)],
        );

        let transactions = Aggregation::Enabled
            .all_transactions(user_id, &connection)
            .unwrap();

        assert!(transactions.is_empty());
    }

    #[test]
    fn summary_totals_each_table() {
        let (connection, user_id) = get_test_connection();
        insert(
            &connection,
            user_id,
            &[
                (Income, date!(2024 - 01 - 05), "Donation", 500.0),
                (Income, date!(2024 - 01 - 07), "Festival", 250.0),
                (Expense, date!(2024 - 01 - 06), "Maintenance", 200.0),
            ],
        );

        let summary = Aggregation::Enabled.summary(user_id, &connection).unwrap();

        assert_eq!(summary, Summary::from_totals(750.0, 200.0));
    }

    #[test]
    fn summary_of_empty_ledger_is_zero() {
        let (connection, user_id) = get_test_connection();

        let summary = Aggregation::Enabled.summary(user_id, &connection).unwrap();

        assert_eq!(summary, Summary::default());
    }
}
