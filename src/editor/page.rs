//! The pages for recording a new transaction and editing an existing one.

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
    editor::form::{EditorMode, ReturnTo, TransactionForm, transaction_form},
    html::{FORM_CONTAINER_STYLE, base, rupee_input_styles},
    ledger::{TransactionKey, TransactionKind, records::get_record},
    navigation::NavBar,
    timezone::get_local_date,
};

fn editor_page(
    title: &str,
    kind: TransactionKind,
    mode: EditorMode,
    form: &TransactionForm,
) -> Markup {
    let nav_bar = NavBar::new(form.return_to.endpoint()).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full max-w-md space-y-4 text-gray-900 dark:text-white"
            {
                h2 class="text-xl font-bold" { (title) }

                (transaction_form(kind, mode, form, None))
            }
        }
    };

    base(title, &[rupee_input_styles()], &content)
}

/// The state needed for the editor pages.
#[derive(Debug, Clone)]
pub struct EditorPageState {
    /// The local timezone as a canonical timezone name, e.g. "Asia/Kolkata".
    pub local_timezone: String,
    /// The database connection for loading the transaction to edit.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditorPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The query string for the new transaction page.
#[derive(Debug, Default, Deserialize)]
pub struct NewTransactionQuery {
    /// Whether to record income or an expense.
    #[serde(default)]
    pub kind: TransactionKind,
    /// The page that opened the editor.
    #[serde(default)]
    pub return_to: ReturnTo,
}

/// Renders the page for recording a new income or expense, dated today.
pub async fn get_new_transaction_page(
    State(state): State<EditorPageState>,
    Query(query): Query<NewTransactionQuery>,
) -> Result<Response, Error> {
    let today = get_local_date(&state.local_timezone)
        .inspect_err(|error| tracing::error!("Could not get today's date: {error}"))?;

    let title = match query.kind {
        TransactionKind::Income => "Add Income",
        TransactionKind::Expense => "Add Expense",
    };
    let form = TransactionForm::new(query.kind, today, query.return_to);

    Ok(editor_page(title, query.kind, EditorMode::Create, &form).into_response())
}

/// The query string for the edit transaction page.
#[derive(Debug, Default, Deserialize)]
pub struct EditTransactionQuery {
    /// The page that opened the editor.
    #[serde(default)]
    pub return_to: ReturnTo,
}

/// Renders the page for editing a transaction, filled in from the stored row.
///
/// Rows owned by other users are reported as not found.
pub async fn get_edit_transaction_page(
    State(state): State<EditorPageState>,
    Extension(user_id): Extension<UserID>,
    Path(key): Path<TransactionKey>,
    Query(query): Query<EditTransactionQuery>,
) -> Result<Response, Error> {
    let transaction = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        get_record(key, user_id, &connection)
            .inspect_err(|error| tracing::error!("Failed to retrieve transaction {key}: {error}"))?
    };

    let title = format!("Edit {}", key.kind.title());
    let form = TransactionForm::from_transaction(&transaction, query.return_to);

    Ok(editor_page(&title, key.kind, EditorMode::Edit(key), &form).into_response())
}
