//! Log-out route handler that ends the session, invalidates the auth cookie and redirects users.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;

use crate::{
    Error,
    auth::{AuthSession, AuthState, get_token_from_cookies, invalidate_auth_cookie},
    session::{SessionEvent, ViewState},
};

fn end_session(state: &AuthState, session: &AuthSession) -> Result<(), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    state
        .auth
        .sign_out(session, &connection)
        .inspect_err(|error| {
            tracing::error!(
                "Could not end session for user {}: {error}",
                session.user_id
            )
        })
}

/// End the session named by the auth cookie, invalidate the cookie and send
/// the client to the log-in page.
///
/// If the session could not be ended, an error alert is returned and the
/// cookie is kept.
pub async fn post_log_out(State(state): State<AuthState>, jar: PrivateCookieJar) -> Response {
    let view_state = match get_token_from_cookies(&jar) {
        Ok(token) => {
            let session = AuthSession {
                id: token.session_id,
                user_id: token.user_id,
            };
            if let Err(error) = end_session(&state, &session) {
                return error.into_alert_response();
            }

            ViewState::new().apply(SessionEvent::Started {
                recovery: None,
                session: Some(session),
            })
        }
        Err(_) => ViewState::new(),
    };

    let view = view_state.apply(SessionEvent::LoggedOut).view();
    let jar = invalidate_auth_cookie(jar);

    (HxRedirect(view.endpoint().to_owned()), jar).into_response()
}
