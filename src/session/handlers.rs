//! The start page and the endpoint that decides where it leads.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::html;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{AuthProvider, AuthSession, get_token_from_cookies},
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, loading_spinner},
    session::{RecoveryToken, SessionEvent, View, ViewState, set_recovery_cookie},
};

/// The state needed to resolve the start page.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The database connection for looking up sessions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider that owns the sessions.
    pub auth: AuthProvider,
}

impl FromRef<AppState> for SessionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
            auth: state.auth.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<SessionState> for Key {
    fn from_ref(state: &SessionState) -> Self {
        state.cookie_key.clone()
    }
}

/// Render the loading view.
///
/// The page posts its URL fragment to [resolve_session] as soon as it loads,
/// since the fragment never reaches the server otherwise.
pub async fn get_start_page() -> Response {
    let content = html! {
        div
            class=(PAGE_CONTAINER_STYLE)
            hx-post=(endpoints::RESOLVE_SESSION)
            hx-trigger="load"
            hx-vals="js:{fragment: window.location.hash}"
            hx-target-error="#alert-container"
        {
            div class="flex items-center justify-center min-h-screen text-gray-900 dark:text-white"
            {
                (loading_spinner())
                "Loading..."
            }
        }
    };

    base("Loading", &[], &content).into_response()
}

/// The form posted by the start page.
#[derive(Debug, Default, Deserialize)]
pub struct ResolveSessionForm {
    /// The URL fragment, with or without the leading '#'.
    #[serde(default)]
    pub fragment: String,
}

fn current_session(
    state: &SessionState,
    jar: &PrivateCookieJar,
) -> Result<Option<AuthSession>, Error> {
    let token = match get_token_from_cookies(jar) {
        Ok(token) => token,
        Err(_) => return Ok(None),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let session = state
        .auth
        .get_current_session(&token.session_id, &connection)?
        .filter(|session| session.user_id == token.user_id);

    Ok(session)
}

/// Decide the first view from the URL fragment and the stored session.
///
/// A recovery link wins over an existing session. Its token is moved into a
/// private cookie so that it stays out of later URLs.
pub async fn resolve_session(
    State(state): State<SessionState>,
    jar: PrivateCookieJar,
    Form(form): Form<ResolveSessionForm>,
) -> Response {
    let recovery = RecoveryToken::from_fragment(&form.fragment);
    // A recovery link never looks at the stored session.
    let session = match recovery {
        Some(_) => None,
        None => match current_session(&state, &jar) {
            Ok(session) => session,
            Err(error) => {
                tracing::error!("Could not resolve session: {error}");
                return error.into_alert_response();
            }
        },
    };

    let jar = match &recovery {
        Some(token) => set_recovery_cookie(jar, token),
        None => jar,
    };

    let view_state = ViewState::new().apply(SessionEvent::Started { recovery, session });
    let view = view_state.view();

    if view == View::ResetPassword {
        tracing::info!("Start page opened with a recovery link");
    }

    (HxRedirect(view.endpoint().to_owned()), jar).into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Router,
        extract::State,
        http::StatusCode,
        routing::{get, post},
    };
    use axum_extra::extract::PrivateCookieJar;
    use axum_test::TestServer;
    use time::UtcOffset;

    use crate::{
        Error,
        app_state::create_cookie_key,
        auth::{AuthProvider, DEFAULT_COOKIE_DURATION, set_auth_cookie},
        changes::ChangeFeed,
        endpoints,
        session::COOKIE_RECOVERY_TOKEN,
        test_utils::{
            TEST_PASSWORD, assert_valid_html, create_test_user, get_test_connection,
            parse_html_document,
        },
    };

    use super::{SessionState, get_start_page, resolve_session};

    const TEST_LOG_IN_ROUTE: &str = "/log_in_stub";

    fn get_test_state() -> SessionState {
        let connection = get_test_connection();
        create_test_user(&connection, "treasurer@temple.org");

        SessionState {
            cookie_key: create_cookie_key("foobar"),
            db_connection: Arc::new(Mutex::new(connection)),
            auth: AuthProvider::new(ChangeFeed::new()).with_password_hash_cost(4),
        }
    }

    async fn stub_log_in_route(
        State(state): State<SessionState>,
        jar: PrivateCookieJar,
    ) -> Result<PrivateCookieJar, Error> {
        let connection = state.db_connection.lock().unwrap();
        let session = state
            .auth
            .sign_in("treasurer@temple.org", TEST_PASSWORD, &connection)?;

        set_auth_cookie(jar, &session, DEFAULT_COOKIE_DURATION, UtcOffset::UTC)
    }

    fn get_test_server() -> TestServer {
        let app = Router::new()
            .route(endpoints::RESOLVE_SESSION, post(resolve_session))
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(get_test_state());

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn start_page_posts_fragment_on_load() {
        let response = get_start_page().await;

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let selector = scraper::Selector::parse("div[hx-post]").unwrap();
        let loader = document.select(&selector).next().expect("No loader found");
        assert_eq!(
            loader.value().attr("hx-post"),
            Some(endpoints::RESOLVE_SESSION)
        );
        assert_eq!(loader.value().attr("hx-trigger"), Some("load"));
        assert_eq!(
            loader.value().attr("hx-vals"),
            Some("js:{fragment: window.location.hash}")
        );
    }

    #[tokio::test]
    async fn resolves_to_log_in_without_session() {
        let server = get_test_server();

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .form(&[("fragment", "")])
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn resolves_to_dashboard_with_session() {
        let server = get_test_server();
        let jar = server.post(TEST_LOG_IN_ROUTE).await.cookies();

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .add_cookies(jar)
            .form(&[("fragment", "")])
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::DASHBOARD_VIEW);
    }

    #[tokio::test]
    async fn recovery_fragment_wins_over_session() {
        let server = get_test_server();
        let jar = server.post(TEST_LOG_IN_ROUTE).await.cookies();

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .add_cookies(jar)
            .form(&[("fragment", "#access_token=abc&type=recovery")])
            .await;

        assert_eq!(
            response.header("hx-redirect"),
            endpoints::RESET_PASSWORD_VIEW
        );
        // The cookie is encrypted, so the token itself must not be visible.
        let recovery_cookie = response.cookie(COOKIE_RECOVERY_TOKEN);
        assert_ne!(recovery_cookie.value(), "abc");
    }

    #[tokio::test]
    async fn recovery_fragment_skips_session_lookup() {
        let state = get_test_state();
        let app = Router::new()
            .route(endpoints::RESOLVE_SESSION, post(resolve_session))
            .route(TEST_LOG_IN_ROUTE, post(stub_log_in_route))
            .with_state(state.clone());
        let server = TestServer::try_new(app).expect("Could not create test server.");
        let jar = server.post(TEST_LOG_IN_ROUTE).await.cookies();
        state
            .db_connection
            .lock()
            .unwrap()
            .execute("DROP TABLE session", ())
            .unwrap();

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .add_cookies(jar.clone())
            .form(&[("fragment", "#access_token=abc&type=recovery")])
            .await;

        assert_eq!(
            response.header("hx-redirect"),
            endpoints::RESET_PASSWORD_VIEW
        );

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .add_cookies(jar)
            .form(&[("fragment", "")])
            .await;

        response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn fragment_without_recovery_type_is_ignored() {
        let server = get_test_server();

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .form(&[("fragment", "#access_token=abc&type=signup")])
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }

    #[tokio::test]
    async fn missing_fragment_field_is_accepted() {
        let app = Router::new()
            .route(endpoints::ROOT, get(get_start_page))
            .route(endpoints::RESOLVE_SESSION, post(resolve_session))
            .with_state(get_test_state());
        let server = TestServer::try_new(app).expect("Could not create test server.");

        let response = server
            .post(endpoints::RESOLVE_SESSION)
            .content_type("application/x-www-form-urlencoded")
            .await;

        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }
}
