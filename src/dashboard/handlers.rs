//! Dashboard HTTP handlers and view rendering.
//!
//! The page itself is a shell. The summary and the recent transactions are
//! fragments that load on page load and reload whenever the change feed
//! reports a ledger change.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    changes::{LEDGER_CHANGED_EVENT, changes_poller},
    dashboard::{
        cards::summary_cards_view,
        charts::{DashboardChart, charts_view},
        tables::recent_transactions_view,
    },
    editor::ReturnTo,
    endpoints,
    html::{BUTTON_EXPENSE_STYLE, BUTTON_INCOME_STYLE, HeadElement, base, loading_spinner},
    ledger::{
        Aggregation, TransactionKind, category_distribution, load_recent_transactions,
        load_summary, load_transactions,
    },
    navigation::NavBar,
};

/// The state needed for the dashboard fragments.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The database connection for reading the ledger.
    pub db_connection: Arc<Mutex<Connection>>,
    /// Whether the aggregation views are used.
    pub aggregation: Aggregation,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            aggregation: state.aggregation,
        }
    }
}

/// The link that opens the editor for `kind` and comes back to the dashboard.
fn new_transaction_url(kind: TransactionKind) -> String {
    format!(
        "{}?kind={}&return_to={}",
        endpoints::NEW_TRANSACTION_VIEW,
        kind.as_str(),
        ReturnTo::Dashboard.as_str()
    )
}

/// A placeholder that loads `endpoint` now and after every ledger change.
fn live_fragment(id: &str, endpoint: &str) -> Markup {
    html! {
        div
            id=(id)
            class="w-full"
            hx-get=(endpoint)
            hx-trigger={"load, " (LEDGER_CHANGED_EVENT) " from:body"}
            hx-swap="innerHTML"
            hx-target-error="#alert-container"
        {
            div class="flex justify-center py-8 text-gray-500 dark:text-gray-400"
            {
                (loading_spinner())
                "Loading..."
            }
        }
    }
}

fn dashboard_view() -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            section id="quick-actions" class="w-full flex gap-4 mb-4"
            {
                a href=(new_transaction_url(TransactionKind::Income)) class=(BUTTON_INCOME_STYLE)
                {
                    "Add Income"
                }

                a href=(new_transaction_url(TransactionKind::Expense)) class=(BUTTON_EXPENSE_STYLE)
                {
                    "Add Expense"
                }
            }

            (live_fragment("dashboard-summary", endpoints::DASHBOARD_SUMMARY))
            (live_fragment("dashboard-recent", endpoints::DASHBOARD_RECENT))
        }

        (changes_poller())
    );

    let scripts = [HeadElement::ScriptLink(
        "/static/echarts.6.0.0.min.js".to_owned(),
    )];

    base("Dashboard", &scripts, &content)
}

/// Display the dashboard shell. The ledger data is loaded by its fragments.
pub async fn get_dashboard_page() -> Response {
    dashboard_view().into_response()
}

/// The summary cards and the income and expense distribution charts.
pub async fn get_dashboard_summary(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let summary = match load_summary(user_id, state.aggregation, &connection) {
        Ok(summary) => summary,
        Err(error) => {
            tracing::error!("Could not load summary for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let transactions = match load_transactions(user_id, state.aggregation, &connection) {
        Ok(transactions) => transactions,
        Err(error) => {
            tracing::error!("Could not load transactions for user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    let charts = TransactionKind::ALL.map(|kind| {
        DashboardChart::distribution(kind, &category_distribution(&transactions, kind))
    });

    html! {
        (summary_cards_view(&summary))
        (charts_view(&charts))
    }
    .into_response()
}

/// The table of the most recent transactions.
pub async fn get_dashboard_recent(
    State(state): State<DashboardState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let transactions = match state.db_connection.lock() {
        Ok(connection) => load_recent_transactions(user_id, state.aggregation, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match transactions {
        Ok(transactions) => recent_transactions_view(&transactions).into_response(),
        Err(error) => {
            tracing::error!("Could not load recent transactions for user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}
