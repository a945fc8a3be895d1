//! The endpoints that save the transaction form.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
// Must use axum_extra's Form since that parses an empty string as None instead
// of crashing like axum::Form.
use axum_extra::extract::Form;
use axum_htmx::HxRedirect;
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::UserID,
    editor::form::{EditorMode, TransactionForm, transaction_form},
    ledger::{
        TransactionKey, TransactionKind,
        records::{insert_record, update_record},
    },
};

/// Prefixes the store error shown in the form when the row could not be written.
pub const SAVE_FAILED_MSG: &str = "Could not save the transaction";

/// The state needed to create or update a transaction.
#[derive(Debug, Clone)]
pub struct EditorState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EditorState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

fn render_form_error(
    kind: TransactionKind,
    mode: EditorMode,
    form: &TransactionForm,
    message: &str,
) -> Response {
    transaction_form(kind, mode, form, Some(message)).into_response()
}

fn redirect_to_opener(form: &TransactionForm) -> Response {
    (
        HxRedirect(form.return_to.endpoint().to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for recording a new income or expense.
///
/// Redirects to the page that opened the editor on success, otherwise the
/// form is rendered again with the error and the user's input.
pub async fn create_transaction_endpoint(
    State(state): State<EditorState>,
    user_id: Option<Extension<UserID>>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let kind = form.kind;

    let Some(Extension(user_id)) = user_id else {
        tracing::error!("Tried to create a transaction without a session");
        let message = Error::NoSession.to_string();
        return render_form_error(kind, EditorMode::Create, &form, &message);
    };

    let fields = match form.validate(kind) {
        Ok(fields) => fields,
        Err(error) => {
            return render_form_error(kind, EditorMode::Create, &form, &error.to_string());
        }
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => insert_record(kind, &fields, user_id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(transaction) => {
            tracing::debug!("Created transaction {}", transaction.key());
            redirect_to_opener(&form)
        }
        Err(error) => {
            tracing::error!("could not create transaction: {error}");
            let message = format!("{SAVE_FAILED_MSG}: {error}");
            render_form_error(kind, EditorMode::Create, &form, &message)
        }
    }
}

/// A route handler for updating an income or expense row.
///
/// The kind of the row comes from `key` and cannot be changed by the form.
pub async fn update_transaction_endpoint(
    State(state): State<EditorState>,
    Path(key): Path<TransactionKey>,
    user_id: Option<Extension<UserID>>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let mode = EditorMode::Edit(key);

    let Some(Extension(user_id)) = user_id else {
        tracing::error!("Tried to update transaction {key} without a session");
        return render_form_error(key.kind, mode, &form, &Error::NoSession.to_string());
    };

    let fields = match form.validate(key.kind) {
        Ok(fields) => fields,
        Err(error) => return render_form_error(key.kind, mode, &form, &error.to_string()),
    };

    let result = match state.db_connection.lock() {
        Ok(connection) => update_record(key, &fields, user_id, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(_) => redirect_to_opener(&form),
        Err(Error::UpdateMissingTransaction) => {
            tracing::error!("Could not update transaction {key}: no such row for user {user_id}");
            Error::UpdateMissingTransaction.into_alert_response()
        }
        Err(error) => {
            tracing::error!("Could not update transaction {key}: {error}");
            let message = format!("{SAVE_FAILED_MSG}: {error}");
            render_form_error(key.kind, mode, &form, &message)
        }
    }
}
