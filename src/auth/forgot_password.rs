//! The page for requesting a password reset email.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{AuthProvider, Mailer},
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, base, email_input, link, loading_spinner, log_in_register},
};

/// Shown after a reset is requested, whether or not the address is registered.
pub const RESET_EMAIL_SENT_MSG: &str =
    "If an account exists for that email, a password reset link has been sent.";

fn forgot_password_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::FORGOT_PASSWORD_API)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #submit-button"
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            p class="text-sm text-gray-500 dark:text-gray-400"
            {
                "Enter the email address you registered with and we will send you a link to reset your password."
            }

            (email_input(email, error_message))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Send reset link"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Remembered it? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

fn reset_email_sent() -> Markup {
    html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p { (RESET_EMAIL_SENT_MSG) }
            p { (link(endpoints::LOG_IN_VIEW, "Back to log in")) }
        }
    }
}

/// Renders the form for requesting a password reset email.
pub async fn get_forgot_password_page() -> Response {
    let form = forgot_password_form("", None);
    let content = log_in_register("Forgot your password?", &form);
    base("Forgot Password", &[], &content).into_response()
}

/// The state needed for sending reset emails.
#[derive(Debug, Clone)]
pub struct ForgotPasswordState {
    /// The database connection for storing recovery tokens.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider that issues recovery tokens.
    pub auth: AuthProvider,
    /// The address the reset link points to.
    pub public_url: String,
    /// Delivers the email.
    pub mailer: Arc<dyn Mailer>,
}

impl FromRef<AppState> for ForgotPasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
            public_url: state.public_url.clone(),
            mailer: state.mailer.clone(),
        }
    }
}

/// The data entered in the forgot-password form.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    /// The address to send the link to.
    pub email: String,
}

/// Send a password reset link to the submitted address.
///
/// The response is the same for registered and unregistered addresses.
pub async fn post_forgot_password(
    State(state): State<ForgotPasswordState>,
    Form(form): Form<ForgotPasswordForm>,
) -> Response {
    let result = match state.db_connection.lock() {
        Ok(connection) => state.auth.send_password_reset_email(
            &form.email,
            &state.public_url,
            state.mailer.as_ref(),
            &connection,
        ),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match result {
        Ok(()) => reset_email_sent().into_response(),
        Err(error @ Error::InvalidEmail(_)) => {
            forgot_password_form(&form.email, Some(&error.to_string())).into_response()
        }
        Err(error) => {
            tracing::error!("Could not send password reset email: {error}");
            forgot_password_form(
                &form.email,
                Some("Could not send the reset email. Please try again later."),
            )
            .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State};

    use crate::{
        auth::{AuthProvider, provider::tests::RecordingMailer},
        changes::ChangeFeed,
        endpoints,
        test_utils::{
            assert_form_input, assert_hx_endpoint, assert_valid_html, create_test_user,
            get_test_connection, must_get_form, parse_html_document, parse_html_fragment,
        },
    };

    use super::{
        ForgotPasswordForm, ForgotPasswordState, RESET_EMAIL_SENT_MSG, get_forgot_password_page,
        post_forgot_password,
    };

    fn get_test_state(mailer: Arc<RecordingMailer>) -> ForgotPasswordState {
        let connection = get_test_connection();
        create_test_user(&connection, "treasurer@temple.org");

        ForgotPasswordState {
            db_connection: Arc::new(Mutex::new(connection)),
            auth: AuthProvider::new(ChangeFeed::new()),
            public_url: "http://localhost:3000".to_owned(),
            mailer,
        }
    }

    fn form(email: &str) -> Form<ForgotPasswordForm> {
        Form(ForgotPasswordForm {
            email: email.to_owned(),
        })
    }

    #[tokio::test]
    async fn page_displays_email_form() {
        let response = get_forgot_password_page().await;

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::FORGOT_PASSWORD_API, "hx-post");
        assert_form_input(&form, "email", "email");
    }

    #[tokio::test]
    async fn registered_email_gets_link() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = get_test_state(mailer.clone());

        let response = post_forgot_password(State(state), form("treasurer@temple.org")).await;

        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(RESET_EMAIL_SENT_MSG), "got {text}");
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.starts_with("http://localhost:3000/#access_token="));
    }

    #[tokio::test]
    async fn unknown_email_gets_same_response() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = get_test_state(mailer.clone());

        let response = post_forgot_password(State(state), form("nobody@temple.org")).await;

        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(RESET_EMAIL_SENT_MSG), "got {text}");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn invalid_email_shows_error() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = get_test_state(mailer.clone());

        let response = post_forgot_password(State(state), form("not an email")).await;

        let html = parse_html_fragment(response).await;
        let form = must_get_form(&html);
        let text = form.text().collect::<String>();
        assert!(text.contains("is not a valid email address"), "got {text}");
    }
}
