//! The registration page for creating an account.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    auth::{AuthProvider, MIN_PASSWORD_LENGTH, validate_new_password},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, base, confirm_password_input, email_input, link, loading_spinner,
        log_in_register, password_input,
    },
    internal_server_error::get_internal_server_error_redirect,
};

/// Shown once the account has been created.
pub const REGISTRATION_SUCCESS_MSG: &str = "Registration successful. You can now log in.";

#[derive(Default)]
struct FormErrors<'a> {
    email: Option<&'a str>,
    password: Option<&'a str>,
    confirm_password: Option<&'a str>,
}

fn registration_form(email: &str, password: &str, errors: FormErrors) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #confirm_password, #submit-button"
            hx-swap="outerHTML"
            class="space-y-4 md:space-y-6"
        {
            (email_input(email, errors.email))
            (password_input(password, MIN_PASSWORD_LENGTH, errors.password))
            (confirm_password_input(MIN_PASSWORD_LENGTH, errors.confirm_password))

            button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" id="indicator"
                {
                    (loading_spinner())
                }
                "Register"
            }

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

fn registration_success() -> Markup {
    html! {
        div class="space-y-4 text-gray-900 dark:text-white"
        {
            p class="text-green-600 dark:text-green-400" { (REGISTRATION_SUCCESS_MSG) }
            p { (link(endpoints::LOG_IN_VIEW, "Go to log in")) }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form("", "", FormErrors::default());
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The database connection for storing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider that creates the account.
    pub auth: AuthProvider,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
        }
    }
}

/// The data entered in the registration form.
#[derive(Serialize, Deserialize)]
pub struct RegisterForm {
    /// The email address to register.
    pub email: String,
    /// The new password.
    pub password: String,
    /// The new password, again.
    pub confirm_password: String,
}

/// Create an account from the registration form.
///
/// The password checks run before the provider is called. On success the
/// form is replaced with a message and a link to the log-in page.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = user_data.email.as_str();
    let password = user_data.password.as_str();

    match validate_new_password(password, &user_data.confirm_password) {
        Ok(_) => {}
        Err(error @ Error::PasswordsDoNotMatch) => {
            let message = error.to_string();
            return registration_form(
                email,
                password,
                FormErrors {
                    confirm_password: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
        Err(error) => {
            let message = error.to_string();
            return registration_form(
                email,
                password,
                FormErrors {
                    password: Some(&message),
                    ..Default::default()
                },
            )
            .into_response();
        }
    }

    let sign_up_result = match state.db_connection.lock() {
        Ok(connection) => state.auth.sign_up(email, password, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            Err(Error::DatabaseLockError)
        }
    };

    match sign_up_result {
        Ok(_) => registration_success().into_response(),
        Err(error @ (Error::InvalidEmail(_) | Error::EmailAlreadyRegistered)) => {
            let message = error.to_string();
            registration_form(
                email,
                password,
                FormErrors {
                    email: Some(&message),
                    ..Default::default()
                },
            )
            .into_response()
        }
        Err(error @ Error::PasswordTooShort) => {
            let message = error.to_string();
            registration_form(
                email,
                password,
                FormErrors {
                    password: Some(&message),
                    ..Default::default()
                },
            )
            .into_response()
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while registering a user: {error}");
            get_internal_server_error_redirect()
        }
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::StatusCode;

    use crate::{
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button, assert_hx_endpoint, assert_valid_html,
            must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page().await;
        assert_eq!(response.status(), StatusCode::OK);

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::USERS, "hx-post");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
        assert_form_submit_button(&form);

        let log_in_link = form
            .select(&scraper::Selector::parse("a").unwrap())
            .next()
            .expect("No log in link");
        assert_eq!(
            log_in_link.value().attr("href"),
            Some(endpoints::LOG_IN_VIEW)
        );
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Form, extract::State, http::StatusCode};

    use crate::{
        auth::{AuthProvider, Email, get_user_by_email},
        changes::ChangeFeed,
        endpoints,
        test_utils::{
            assert_form_error_message, create_test_user, get_test_connection, must_get_form,
            parse_html_fragment,
        },
    };

    use super::{REGISTRATION_SUCCESS_MSG, RegisterForm, RegistrationState, register_user};

    fn get_test_state() -> RegistrationState {
        RegistrationState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
            auth: AuthProvider::new(ChangeFeed::new()).with_password_hash_cost(4),
        }
    }

    fn form(email: &str, password: &str, confirm_password: &str) -> Form<RegisterForm> {
        Form(RegisterForm {
            email: email.to_owned(),
            password: password.to_owned(),
            confirm_password: confirm_password.to_owned(),
        })
    }

    #[tokio::test]
    async fn register_user_succeeds() {
        let state = get_test_state();

        let response = register_user(
            State(state.clone()),
            form("treasurer@temple.org", "hunter2", "hunter2"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains(REGISTRATION_SUCCESS_MSG), "got {text}");
        let link = html
            .select(&scraper::Selector::parse("a").unwrap())
            .next()
            .expect("No log in link");
        assert_eq!(link.value().attr("href"), Some(endpoints::LOG_IN_VIEW));

        let connection = state.db_connection.lock().unwrap();
        assert!(
            get_user_by_email(&Email::new_unchecked("treasurer@temple.org"), &connection).is_ok()
        );
    }

    #[tokio::test]
    async fn register_user_fails_with_short_password() {
        let response = register_user(
            State(get_test_state()),
            form("treasurer@temple.org", "abcde", "abcde"),
        )
        .await;

        let html = parse_html_fragment(response).await;
        assert_form_error_message(
            &must_get_form(&html),
            "Password must be at least 6 characters.",
        );
    }

    #[tokio::test]
    async fn register_user_fails_with_mismatched_passwords() {
        let response = register_user(
            State(get_test_state()),
            form("treasurer@temple.org", "hunter2", "hunter3"),
        )
        .await;

        let html = parse_html_fragment(response).await;
        assert_form_error_message(&must_get_form(&html), "Passwords don't match.");
    }

    #[tokio::test]
    async fn register_user_fails_with_taken_email() {
        let state = get_test_state();
        create_test_user(&state.db_connection.lock().unwrap(), "treasurer@temple.org");

        let response = register_user(
            State(state),
            form("treasurer@temple.org", "hunter2", "hunter2"),
        )
        .await;

        let html = parse_html_fragment(response).await;
        assert_form_error_message(
            &must_get_form(&html),
            "An account with this email address already exists.",
        );
    }
}
