//! The in-process auth provider: accounts, server-side sessions and
//! password recovery.
//!
//! Every change to a user's auth state is published on the [ChangeFeed] so
//! that open pages can follow it.

use rand::{Rng, distributions::Alphanumeric, thread_rng};
use rusqlite::{Connection, OptionalExtension};
use time::{Duration, OffsetDateTime};

use crate::{
    Error,
    auth::{
        Email, Mailer, PasswordHash, User, UserID, ValidatedPassword, create_user,
        get_user_by_email, update_password_hash,
    },
    changes::{AuthEvent, AuthEventKind, ChangeFeed, LedgerEvent, Subscription},
    session::RecoveryToken,
};

/// How long a password reset link stays valid.
pub const RECOVERY_TOKEN_DURATION: Duration = Duration::hours(1);

const TOKEN_LENGTH: usize = 32;

/// A signed-in session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    /// The opaque session ID stored in the auth cookie.
    pub id: String,
    /// The user the session belongs to.
    pub user_id: UserID,
}

/// Create the table of active sessions.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_session_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS session (
                id TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

/// Create the table of outstanding password recovery tokens.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_password_recovery_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS password_recovery (
                token TEXT PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn generate_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Signs users up, in and out, and handles password recovery.
#[derive(Debug, Clone)]
pub struct AuthProvider {
    changes: ChangeFeed,
    password_hash_cost: u32,
}

impl AuthProvider {
    /// Create a provider that publishes auth events on `changes`.
    pub fn new(changes: ChangeFeed) -> Self {
        Self {
            changes,
            password_hash_cost: PasswordHash::DEFAULT_COST,
        }
    }

    /// Use `cost` rounds when hashing new passwords.
    pub fn with_password_hash_cost(mut self, cost: u32) -> Self {
        self.password_hash_cost = cost;
        self
    }

    /// Listen for auth events.
    pub fn subscribe(&self) -> Subscription {
        self.changes.subscribe()
    }

    fn publish(&self, user_id: UserID, kind: AuthEventKind) {
        self.changes
            .publish(LedgerEvent::Auth(AuthEvent { user_id, kind }));
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::InvalidEmail] if `email` is not an email address,
    /// - [Error::PasswordTooShort] if `password` is too short,
    /// - [Error::EmailAlreadyRegistered] if the email is taken,
    /// - [Error::HashingError] or [Error::SqlError] otherwise.
    pub fn sign_up(
        &self,
        email: &str,
        password: &str,
        connection: &Connection,
    ) -> Result<User, Error> {
        let email = Email::new(email)?;
        let password = ValidatedPassword::new(password)?;
        let password_hash = PasswordHash::new(password, self.password_hash_cost)?;

        let user = create_user(email, password_hash, connection)?;
        tracing::info!("Registered user {}", user.id);

        Ok(user)
    }

    /// Check the credentials and start a new session.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidCredentials] if the email is unknown or the
    /// password is wrong.
    pub fn sign_in(
        &self,
        email: &str,
        password: &str,
        connection: &Connection,
    ) -> Result<AuthSession, Error> {
        let email = Email::new(email).map_err(|_| Error::InvalidCredentials)?;
        let user = match get_user_by_email(&email, connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        };

        let is_password_valid = user
            .password_hash
            .verify(password)
            .map_err(|error| Error::HashingError(error.to_string()))?;

        if !is_password_valid {
            return Err(Error::InvalidCredentials);
        }

        let session = AuthSession {
            id: generate_token(),
            user_id: user.id,
        };

        connection.execute(
            "INSERT INTO session (id, user_id, created_at) VALUES (?1, ?2, ?3)",
            (&session.id, session.user_id.as_i64(), OffsetDateTime::now_utc()),
        )?;

        tracing::info!("User {} signed in", session.user_id);
        self.publish(session.user_id, AuthEventKind::SignedIn);

        Ok(session)
    }

    /// End `session`.
    ///
    /// Signing out of a session that has already ended is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [Error::SqlError] if the session could not be deleted.
    pub fn sign_out(&self, session: &AuthSession, connection: &Connection) -> Result<(), Error> {
        let rows_affected =
            connection.execute("DELETE FROM session WHERE id = ?1", (&session.id,))?;

        if rows_affected > 0 {
            tracing::info!("User {} signed out", session.user_id);
            self.publish(session.user_id, AuthEventKind::SignedOut);
        }

        Ok(())
    }

    /// Look up the session with `session_id`, if it is still active.
    ///
    /// # Errors
    ///
    /// Returns a [Error::SqlError] if the query failed.
    pub fn get_current_session(
        &self,
        session_id: &str,
        connection: &Connection,
    ) -> Result<Option<AuthSession>, Error> {
        let maybe_user_id: Option<i64> = connection
            .query_row(
                "SELECT user_id FROM session WHERE id = ?1",
                (session_id,),
                |row| row.get(0),
            )
            .optional()?;

        Ok(maybe_user_id.map(|user_id| AuthSession {
            id: session_id.to_owned(),
            user_id: UserID::new(user_id),
        }))
    }

    /// Replace the password of the user the recovery token was issued for.
    ///
    /// The token is consumed and every session of the user is ended.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::PasswordTooShort] if `new_password` is too short,
    /// - [Error::InvalidRecoveryToken] if the token is unknown, used or expired,
    /// - [Error::HashingError] or [Error::SqlError] otherwise.
    pub fn update_user_password(
        &self,
        recovery_token: &RecoveryToken,
        new_password: &str,
        connection: &Connection,
    ) -> Result<(), Error> {
        let password = ValidatedPassword::new(new_password)?;

        let (raw_user_id, expires_at): (i64, OffsetDateTime) = connection
            .query_row(
                "SELECT user_id, expires_at FROM password_recovery WHERE token = ?1",
                (recovery_token.as_str(),),
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
            .ok_or(Error::InvalidRecoveryToken)?;

        if expires_at <= OffsetDateTime::now_utc() {
            connection.execute(
                "DELETE FROM password_recovery WHERE token = ?1",
                (recovery_token.as_str(),),
            )?;
            return Err(Error::InvalidRecoveryToken);
        }

        let user_id = UserID::new(raw_user_id);
        let password_hash = PasswordHash::new(password, self.password_hash_cost)?;

        let transaction = connection.unchecked_transaction()?;
        update_password_hash(user_id, &password_hash, &transaction)?;
        transaction.execute(
            "DELETE FROM password_recovery WHERE user_id = ?1",
            (user_id.as_i64(),),
        )?;
        transaction.execute(
            "DELETE FROM session WHERE user_id = ?1",
            (user_id.as_i64(),),
        )?;
        transaction.commit()?;

        tracing::info!("Password updated for user {user_id}");
        self.publish(user_id, AuthEventKind::PasswordUpdated);

        Ok(())
    }

    /// Email a password reset link to `email`.
    ///
    /// The link is `redirect_url` with the recovery token in its fragment.
    /// Unknown addresses are accepted silently so that the response does not
    /// reveal who is registered.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - [Error::InvalidEmail] if `email` is not an email address,
    /// - [Error::EmailDeliveryError] if the mailer failed,
    /// - [Error::SqlError] if the token could not be stored.
    pub fn send_password_reset_email(
        &self,
        email: &str,
        redirect_url: &str,
        mailer: &dyn Mailer,
        connection: &Connection,
    ) -> Result<(), Error> {
        let email = Email::new(email)?;
        let user = match get_user_by_email(&email, connection) {
            Ok(user) => user,
            Err(Error::NotFound) => {
                tracing::info!("Password reset requested for unregistered email");
                return Ok(());
            }
            Err(error) => return Err(error),
        };

        let token = generate_token();
        connection.execute(
            "INSERT INTO password_recovery (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
            (
                &token,
                user.id.as_i64(),
                OffsetDateTime::now_utc() + RECOVERY_TOKEN_DURATION,
            ),
        )?;

        let link = format!(
            "{}/#access_token={token}&type=recovery",
            redirect_url.trim_end_matches('/')
        );
        mailer.send_password_reset(&user.email, &link)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::{AuthProvider, Email, Mailer, get_user_by_email},
        changes::{AuthEvent, AuthEventKind, ChangeFeed, LedgerEvent},
        db::initialize,
        session::RecoveryToken,
    };

    /// Keeps every reset link instead of sending it.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingMailer {
        pub(crate) sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingMailer {
        pub(crate) fn last_token(&self) -> Option<RecoveryToken> {
            let sent = self.sent.lock().unwrap();
            let (_, link) = sent.last()?;
            let (_, fragment) = link.split_once('#')?;

            RecoveryToken::from_fragment(fragment)
        }
    }

    impl Mailer for RecordingMailer {
        fn send_password_reset(&self, to: &Email, link: &str) -> Result<(), Error> {
            self.sent
                .lock()
                .unwrap()
                .push((to.to_string(), link.to_owned()));

            Ok(())
        }
    }

    fn get_test_provider() -> (AuthProvider, ChangeFeed, Connection) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let feed = ChangeFeed::new();
        let provider = AuthProvider::new(feed.clone()).with_password_hash_cost(4);

        (provider, feed, connection)
    }

    #[test]
    fn sign_up_then_sign_in() {
        let (provider, _, connection) = get_test_provider();
        let user = provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();

        let session = provider
            .sign_in("treasurer@temple.org", "hunter2", &connection)
            .unwrap();

        assert_eq!(session.user_id, user.id);
        assert_eq!(session.id.len(), 32);
        assert_eq!(
            provider.get_current_session(&session.id, &connection),
            Ok(Some(session))
        );
    }

    #[test]
    fn sign_up_rejects_short_password_and_duplicate_email() {
        let (provider, _, connection) = get_test_provider();

        assert_eq!(
            provider.sign_up("treasurer@temple.org", "abcde", &connection),
            Err(Error::PasswordTooShort)
        );

        provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        assert_eq!(
            provider
                .sign_up("Treasurer@Temple.org", "hunter2", &connection)
                .map(|user| user.id),
            Err(Error::EmailAlreadyRegistered)
        );
    }

    #[test]
    fn sign_in_rejects_bad_credentials() {
        let (provider, _, connection) = get_test_provider();
        provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();

        assert_eq!(
            provider.sign_in("treasurer@temple.org", "hunter3", &connection),
            Err(Error::InvalidCredentials)
        );
        assert_eq!(
            provider.sign_in("priest@temple.org", "hunter2", &connection),
            Err(Error::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn sign_in_and_out_publish_events() {
        let (provider, _, connection) = get_test_provider();
        let user = provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        let mut subscription = provider.subscribe();

        let session = provider
            .sign_in("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        provider.sign_out(&session, &connection).unwrap();

        assert_eq!(
            subscription.recv().await,
            Ok(LedgerEvent::Auth(AuthEvent {
                user_id: user.id,
                kind: AuthEventKind::SignedIn
            }))
        );
        assert_eq!(
            subscription.recv().await,
            Ok(LedgerEvent::Auth(AuthEvent {
                user_id: user.id,
                kind: AuthEventKind::SignedOut
            }))
        );
        assert_eq!(
            provider.get_current_session(&session.id, &connection),
            Ok(None)
        );
    }

    #[test]
    fn reset_email_contains_recovery_link() {
        let (provider, _, connection) = get_test_provider();
        provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        let mailer = RecordingMailer::default();

        provider
            .send_password_reset_email(
                "treasurer@temple.org",
                "http://localhost:3000",
                &mailer,
                &connection,
            )
            .unwrap();

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, link) = &sent[0];
        assert_eq!(to, "treasurer@temple.org");
        assert!(
            link.starts_with("http://localhost:3000/#access_token="),
            "unexpected link {link}"
        );
        assert!(link.ends_with("&type=recovery"), "unexpected link {link}");
    }

    #[test]
    fn reset_email_for_unknown_address_is_silent() {
        let (provider, _, connection) = get_test_provider();
        let mailer = RecordingMailer::default();

        let result = provider.send_password_reset_email(
            "nobody@temple.org",
            "http://localhost:3000",
            &mailer,
            &connection,
        );

        assert_eq!(result, Ok(()));
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[test]
    fn update_password_consumes_token_and_ends_sessions() {
        let (provider, _, connection) = get_test_provider();
        provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        let session = provider
            .sign_in("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        let mailer = RecordingMailer::default();
        provider
            .send_password_reset_email(
                "treasurer@temple.org",
                "http://localhost:3000",
                &mailer,
                &connection,
            )
            .unwrap();
        let token = mailer.last_token().unwrap();

        provider
            .update_user_password(&token, "new password", &connection)
            .unwrap();

        assert_eq!(
            provider.get_current_session(&session.id, &connection),
            Ok(None)
        );
        assert!(
            provider
                .sign_in("treasurer@temple.org", "new password", &connection)
                .is_ok()
        );
        assert_eq!(
            provider.update_user_password(&token, "another password", &connection),
            Err(Error::InvalidRecoveryToken)
        );
    }

    #[test]
    fn update_password_rejects_unknown_and_expired_tokens() {
        let (provider, _, connection) = get_test_provider();
        let user = provider
            .sign_up("treasurer@temple.org", "hunter2", &connection)
            .unwrap();
        connection
            .execute(
                "INSERT INTO password_recovery (token, user_id, expires_at) VALUES (?1, ?2, ?3)",
                (
                    "expired",
                    user.id.as_i64(),
                    OffsetDateTime::now_utc() - Duration::minutes(1),
                ),
            )
            .unwrap();

        assert_eq!(
            provider.update_user_password(
                &RecoveryToken::new_unchecked("unknown"),
                "new password",
                &connection
            ),
            Err(Error::InvalidRecoveryToken)
        );
        assert_eq!(
            provider.update_user_password(
                &RecoveryToken::new_unchecked("expired"),
                "new password",
                &connection
            ),
            Err(Error::InvalidRecoveryToken)
        );
        let stored_user =
            get_user_by_email(&Email::new_unchecked("treasurer@temple.org"), &connection).unwrap();
        assert_eq!(stored_user.password_hash, user.password_hash);
    }
}
