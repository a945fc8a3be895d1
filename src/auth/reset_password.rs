//! The page for choosing a new password after following a recovery link.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{AuthProvider, MIN_PASSWORD_LENGTH, validate_new_password},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, base, confirm_password_input, link, loading_spinner,
        log_in_register, password_input,
    },
    session::{
        RecoveryToken, SessionEvent, View, ViewState, get_recovery_token_from_cookies,
        invalidate_recovery_cookie,
    },
};

/// How long the success message shows before the log-in page.
pub const PASSWORD_RESET_REDIRECT_DELAY: Duration = Duration::from_secs(2);

/// Shown once the new password has been saved.
pub const PASSWORD_RESET_SUCCESS_MSG: &str = "Password reset successful! Redirecting to log in...";

#[derive(Default)]
struct FormErrors<'a> {
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn reset_password_form(errors: FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::RESET_PASSWORD_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#password, #confirm_password, #submit-button"
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (password_input("", MIN_PASSWORD_LENGTH, errors.password))
            (confirm_password_input(MIN_PASSWORD_LENGTH, errors.confirm_password))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Reset Password"
            }
        }
    }
}

fn invalid_link_message() -> Markup {
    html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p class="text-red-500 text-base" { (Error::InvalidRecoveryToken.to_string()) }
            p { (link(endpoints::FORGOT_PASSWORD_VIEW, "Request a new link")) }
        }
    }
}

fn reset_success(next_view: View) -> Markup {
    let trigger = format!("load delay:{}s", PASSWORD_RESET_REDIRECT_DELAY.as_secs());

    html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p class="text-green-600 dark:text-green-400" { (PASSWORD_RESET_SUCCESS_MSG) }

            // Logging out clears any stale auth cookie and redirects to the log-in page.
            @if next_view == View::LogIn {
                div hx-post=(endpoints::LOG_OUT) hx-trigger=(trigger) hx-swap="none" {}
            }
        }
    }
}

/// The state needed for resetting a password.
#[derive(Debug, Clone)]
pub struct ResetPasswordState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for the recovery tokens and users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider that replaces the password.
    pub auth: AuthProvider,
}

impl FromRef<AppState> for ResetPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<ResetPasswordState> for Key {
    fn from_ref(state: &ResetPasswordState) -> Self {
        state.cookie_key.clone()
    }
}

/// Show the new-password form if the visitor holds a recovery token.
pub async fn get_reset_password_page(jar: PrivateCookieJar) -> Response {
    let content = match get_recovery_token_from_cookies(&jar) {
        Some(_) => reset_password_form(FormErrors::default()),
        None => invalid_link_message(),
    };

    base(
        "Reset Password",
        &[],
        &log_in_register("Choose a new password", &content),
    )
    .into_response()
}

/// The data entered in the new-password form.
#[derive(Deserialize)]
pub struct ResetPasswordForm {
    /// The new password.
    pub password: String,
    /// The new password, again.
    pub confirm_password: String,
}

fn update_password(
    state: &ResetPasswordState,
    token: &RecoveryToken,
    password: &str,
) -> Result<(), Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    state.auth.update_user_password(token, password, &connection)
}

/// Replace the password of the user the recovery token was issued for.
///
/// The form is checked before the provider is called. On success the
/// recovery cookie is cleared and the client is sent to the log-in page
/// after [PASSWORD_RESET_REDIRECT_DELAY].
pub async fn post_reset_password(
    State(state): State<ResetPasswordState>,
    jar: PrivateCookieJar,
    Form(form): Form<ResetPasswordForm>,
) -> Response {
    match validate_new_password(&form.password, &form.confirm_password) {
        Ok(_) => {}
        Err(error @ Error::PasswordsDoNotMatch) => {
            let message = error.to_string();
            return reset_password_form(FormErrors {
                confirm_password: Some(&message),
                ..Default::default()
            })
            .into_response();
        }
        Err(error) => {
            let message = error.to_string();
            return reset_password_form(FormErrors {
                password: Some(&message),
                ..Default::default()
            })
            .into_response();
        }
    }

    let Some(token) = get_recovery_token_from_cookies(&jar) else {
        return invalid_link_message().into_response();
    };

    match update_password(&state, &token, &form.password) {
        Ok(()) => {
            let view = ViewState::new()
                .apply(SessionEvent::Started {
                    recovery: Some(token),
                    session: None,
                })
                .apply(SessionEvent::PasswordResetCompleted)
                .view();

            (invalidate_recovery_cookie(jar), reset_success(view)).into_response()
        }
        Err(Error::InvalidRecoveryToken) => {
            (invalidate_recovery_cookie(jar), invalid_link_message()).into_response()
        }
        Err(error) => {
            tracing::error!("Could not reset password: {error}");
            reset_password_form(FormErrors {
                password: Some("An internal error occurred. Please try again later."),
                ..Default::default()
            })
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        routing::{get, post},
    };
    use axum_test::TestServer;
    use time::{Duration, OffsetDateTime};

    use crate::{
        app_state::create_cookie_key,
        auth::{AuthProvider, provider::tests::RecordingMailer},
        changes::ChangeFeed,
        endpoints,
        session::{COOKIE_RECOVERY_TOKEN, SessionState, resolve_session},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        PASSWORD_RESET_SUCCESS_MSG, ResetPasswordState, get_reset_password_page,
        post_reset_password,
    };

    struct Fixture {
        server: TestServer,
        state: ResetPasswordState,
        fragment: String,
    }

    /// A server holding one user with an outstanding recovery link.
    fn get_fixture() -> Fixture {
        let connection = get_test_connection();
        create_test_user(&connection, "treasurer@temple.org");
        let auth = AuthProvider::new(ChangeFeed::new()).with_password_hash_cost(4);
        let mailer = RecordingMailer::default();
        auth.send_password_reset_email(
            "treasurer@temple.org",
            "http://localhost:3000",
            &mailer,
            &connection,
        )
        .unwrap();
        let link = mailer.sent.lock().unwrap()[0].1.clone();
        let (_, fragment) = link.split_once('#').unwrap();

        let state = ResetPasswordState {
            cookie_key: create_cookie_key("foobar"),
            db_connection: Arc::new(Mutex::new(connection)),
            auth,
        };
        let session_state = SessionState {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
        };

        let app = Router::new()
            .route(endpoints::RESET_PASSWORD_VIEW, get(get_reset_password_page))
            .route(endpoints::RESET_PASSWORD_API, post(post_reset_password))
            .with_state(state.clone())
            .merge(
                Router::new()
                    .route(endpoints::RESOLVE_SESSION, post(resolve_session))
                    .with_state(session_state),
            );

        Fixture {
            server: TestServer::try_new(app).expect("Could not create test server."),
            state,
            fragment: format!("#{fragment}"),
        }
    }

    /// Follow the recovery link, leaving the token in a cookie.
    macro_rules! recovery_cookies {
        ($fixture:expr) => {
            $fixture
                .server
                .post(endpoints::RESOLVE_SESSION)
                .form(&[("fragment", $fixture.fragment.as_str())])
                .await
                .cookies()
        };
    }

    #[tokio::test]
    async fn page_without_recovery_cookie_shows_invalid_link() {
        let fixture = get_fixture();

        let response = fixture.server.get(endpoints::RESET_PASSWORD_VIEW).await;

        response.assert_status_ok();
        response.assert_text_contains("This password reset link is invalid or has expired.");
        response.assert_text_contains(endpoints::FORGOT_PASSWORD_VIEW);
    }

    #[tokio::test]
    async fn page_with_recovery_cookie_shows_form() {
        let fixture = get_fixture();
        let jar = recovery_cookies!(fixture);

        let response = fixture
            .server
            .get(endpoints::RESET_PASSWORD_VIEW)
            .add_cookies(jar)
            .await;

        response.assert_status_ok();
        response.assert_text_contains(endpoints::RESET_PASSWORD_API);
        response.assert_text_contains("Reset Password");
    }

    #[tokio::test]
    async fn short_password_is_rejected_before_provider_call() {
        let fixture = get_fixture();
        let jar = recovery_cookies!(fixture);

        let response = fixture
            .server
            .post(endpoints::RESET_PASSWORD_API)
            .add_cookies(jar)
            .form(&[("password", "abcde"), ("confirm_password", "abcde")])
            .await;

        response.assert_text_contains("Password must be at least 6 characters.");
        let outstanding_tokens: i64 = fixture
            .state
            .db_connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM password_recovery", (), |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(outstanding_tokens, 1, "the token should not be consumed");
    }

    #[tokio::test]
    async fn mismatched_passwords_are_rejected() {
        let fixture = get_fixture();
        let jar = recovery_cookies!(fixture);

        let response = fixture
            .server
            .post(endpoints::RESET_PASSWORD_API)
            .add_cookies(jar)
            .form(&[
                ("password", "new password"),
                ("confirm_password", "new passw0rd"),
            ])
            .await;

        response.assert_text_contains("Passwords don");
        response.assert_text_contains("t match.");
    }

    #[tokio::test]
    async fn valid_reset_updates_password_and_redirects_to_log_in() {
        let fixture = get_fixture();
        let jar = recovery_cookies!(fixture);

        let response = fixture
            .server
            .post(endpoints::RESET_PASSWORD_API)
            .add_cookies(jar)
            .form(&[
                ("password", "new password"),
                ("confirm_password", "new password"),
            ])
            .await;

        response.assert_status_ok();
        response.assert_text_contains(PASSWORD_RESET_SUCCESS_MSG);
        response.assert_text_contains(r#"hx-trigger="load delay:2s""#);
        let cookie = response.cookie(COOKIE_RECOVERY_TOKEN);
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
        assert_eq!(cookie.max_age(), Some(Duration::ZERO));

        let connection = fixture.state.db_connection.lock().unwrap();
        assert!(
            fixture
                .state
                .auth
                .sign_in("treasurer@temple.org", "new password", &connection)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn reset_without_recovery_cookie_is_rejected() {
        let fixture = get_fixture();

        let response = fixture
            .server
            .post(endpoints::RESET_PASSWORD_API)
            .form(&[
                ("password", "new password"),
                ("confirm_password", "new password"),
            ])
            .await;

        response.assert_text_contains("This password reset link is invalid or has expired.");
    }
}
