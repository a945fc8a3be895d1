//! The long-poll endpoint that relays the change feed to open pages.
//!
//! A page holds one poller element. Each answer replaces the poller with a
//! fresh one, which immediately polls again.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Extension,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::{HX_TRIGGER, HxRedirect};
use maud::{Markup, html};
use rusqlite::Connection;
use tokio::time::{Instant, timeout_at};

use crate::{
    AppState, Error,
    auth::{AuthProvider, AuthSession},
    changes::{LedgerEvent, RecvError},
    endpoints,
    session::{SessionEvent, ViewState},
};

/// How long a poll waits for an event before answering with a fresh poller.
pub const CHANGE_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// The client-side event raised on `body` when a record changes.
pub const LEDGER_CHANGED_EVENT: &str = "ledger-changed";

/// The state needed to relay changes.
#[derive(Debug, Clone)]
pub struct ChangesState {
    /// The database connection for re-reading sessions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider whose events are relayed.
    pub auth: AuthProvider,
    /// How long each poll may wait.
    pub poll_timeout: Duration,
}

impl FromRef<AppState> for ChangesState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
            poll_timeout: CHANGE_POLL_TIMEOUT,
        }
    }
}

/// The element that keeps a long-poll open for the page it is placed in.
pub fn changes_poller() -> Markup {
    html! {
        div
            id="changes-poller"
            class="hidden"
            hx-get=(endpoints::CHANGES)
            hx-trigger="load"
            hx-swap="outerHTML"
        {}
    }
}

/// What the poll should answer with.
#[derive(Debug, PartialEq)]
enum PollOutcome {
    LedgerChanged,
    AuthChanged,
    Idle,
}

fn auth_redirect(state: &ChangesState, session: &AuthSession) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let current_session = state
        .auth
        .get_current_session(&session.id, &connection)?;
    let view = ViewState::new()
        .apply(SessionEvent::AuthChanged(current_session))
        .view();

    Ok((HxRedirect(view.endpoint().to_owned()), StatusCode::OK).into_response())
}

/// Wait for the next change relevant to the signed-in user.
///
/// Answers with an `HX-Trigger` of [LEDGER_CHANGED_EVENT] when a record
/// changed and with an `HX-Redirect` when the user's auth state changed.
/// Otherwise a fresh poller is returned after [CHANGE_POLL_TIMEOUT].
pub async fn get_changes(
    State(state): State<ChangesState>,
    Extension(session): Extension<AuthSession>,
) -> Response {
    let mut subscription = state.auth.subscribe();
    let deadline = Instant::now() + state.poll_timeout;

    let outcome = loop {
        match timeout_at(deadline, subscription.recv()).await {
            Ok(Ok(LedgerEvent::Table(change))) => {
                tracing::debug!("Relaying {change:?} to user {}", session.user_id);
                break PollOutcome::LedgerChanged;
            }
            Ok(Ok(LedgerEvent::Auth(event))) if event.user_id == session.user_id => {
                tracing::debug!("Relaying {event:?}");
                break PollOutcome::AuthChanged;
            }
            Ok(Ok(LedgerEvent::Auth(_))) => continue,
            Ok(Err(RecvError::Lagged(missed))) => {
                tracing::warn!("Change poll missed {missed} events, reloading fragments");
                break PollOutcome::LedgerChanged;
            }
            Ok(Err(RecvError::Closed)) => {
                tracing::warn!("Change feed closed");
                break PollOutcome::Idle;
            }
            Err(_elapsed) => break PollOutcome::Idle,
        }
    };

    match outcome {
        PollOutcome::LedgerChanged => {
            ([(HX_TRIGGER, LEDGER_CHANGED_EVENT)], changes_poller()).into_response()
        }
        PollOutcome::AuthChanged => match auth_redirect(&state, &session) {
            Ok(response) => response,
            Err(error) => {
                tracing::error!(
                    "Could not re-read session for user {}: {error}",
                    session.user_id
                );
                changes_poller().into_response()
            }
        },
        PollOutcome::Idle => changes_poller().into_response(),
    }
}
