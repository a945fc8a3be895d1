//! The history table fragment and the endpoint that deletes rows from it.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::UserID,
    editor::ReturnTo,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        amount_color_class, format_currency,
    },
    ledger::{
        Aggregation, SortOrder, Transaction, TransactionFilter, TransactionKey,
        delete_transaction, filter_transactions, load_transactions, sort_transactions,
    },
};

/// The state needed for the history table.
#[derive(Debug, Clone)]
pub struct HistoryState {
    /// The database connection for reading and deleting transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Whether the aggregation views are used.
    pub aggregation: Aggregation,
}

impl FromRef<AppState> for HistoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            aggregation: state.aggregation,
        }
    }
}

/// Which transactions to list and in which order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HistoryQuery {
    /// Which kinds of transaction to show.
    #[serde(default)]
    pub filter: TransactionFilter,
    /// The order of the rows.
    #[serde(default)]
    pub sort: SortOrder,
}

fn edit_url(transaction: &Transaction) -> String {
    format!(
        "{}?return_to={}",
        format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.key()),
        ReturnTo::History.as_str()
    )
}

fn history_row(transaction: &Transaction) -> Markup {
    html! {
        tr class=(TABLE_ROW_STYLE) data-transaction-key=(transaction.key())
        {
            td class={(TABLE_CELL_STYLE) " whitespace-nowrap"} { (transaction.date) }
            td class=(TABLE_CELL_STYLE) { (transaction.kind.title()) }
            td class=(TABLE_CELL_STYLE) { (transaction.category_label) }
            td class={(TABLE_CELL_STYLE) " text-right whitespace-nowrap " (amount_color_class(transaction.kind))}
            {
                (format_currency(transaction.amount))
            }
            td class=(TABLE_CELL_STYLE) { (transaction.notes.as_deref().unwrap_or_default()) }
            td class=(TABLE_CELL_STYLE)
            {
                div class="flex gap-4"
                {
                    a href=(edit_url(transaction)) class=(LINK_STYLE) { "Edit" }

                    button
                        type="button"
                        hx-delete=(format_endpoint(endpoints::TRANSACTION, transaction.key()))
                        hx-confirm="Delete this transaction?"
                        hx-include="#history-controls"
                        hx-target="#history-table"
                        hx-target-error="#alert-container"
                        hx-swap="innerHTML"
                        class=(BUTTON_DELETE_STYLE)
                    {
                        "Delete"
                    }
                }
            }
        }
    }
}

/// Renders the rows of the history table, or a message when there are none.
pub(super) fn history_table_view(transactions: &[Transaction]) -> Markup {
    if transactions.is_empty() {
        return html! {
            p class="py-8 text-center text-gray-600 dark:text-gray-400" { "No transactions found" }
        };
    }

    html! {
        div class="overflow-x-auto rounded-lg shadow"
        {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Source / Category" }
                        th scope="col" class={(TABLE_CELL_STYLE) " text-right"} { "Amount" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Notes" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        (history_row(transaction))
                    }
                }
            }
        }
    }
}

fn load_history(
    state: &HistoryState,
    user_id: UserID,
    query: HistoryQuery,
) -> Result<Vec<Transaction>, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let transactions = load_transactions(user_id, state.aggregation, &connection)?;
    let transactions = filter_transactions(transactions, query.filter);

    Ok(sort_transactions(transactions, query.sort))
}

/// The history table for the selected filter and sort order.
pub async fn get_history_table(
    State(state): State<HistoryState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    match load_history(&state, user_id, query) {
        Ok(transactions) => history_table_view(&transactions).into_response(),
        Err(error) => {
            tracing::error!("Could not load history for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

/// Delete a transaction and answer with the reloaded history table.
pub async fn delete_transaction_endpoint(
    State(state): State<HistoryState>,
    Path(key): Path<TransactionKey>,
    user_id: Option<Extension<UserID>>,
    Query(query): Query<HistoryQuery>,
) -> Response {
    let Some(Extension(user_id)) = user_id else {
        return Error::NoSession.into_alert_response();
    };

    let deleted = match state.db_connection.lock() {
        Ok(connection) => delete_transaction(key, user_id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    if let Err(error) = deleted {
        tracing::error!("Could not delete transaction {key}: {error}");
        return error.into_alert_response();
    }

    get_history_table(State(state), Extension(user_id), Query(query)).await
}
