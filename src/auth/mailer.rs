//! Delivery of password reset emails.

use std::fmt::Debug;

use crate::{Error, auth::Email};

/// Sends account emails on behalf of the auth provider.
pub trait Mailer: Debug + Send + Sync {
    /// Send `to` a message containing the password reset `link`.
    ///
    /// # Errors
    ///
    /// Returns [Error::EmailDeliveryError] if the message could not be sent.
    fn send_password_reset(&self, to: &Email, link: &str) -> Result<(), Error>;
}

/// A [Mailer] that writes each message to the server log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send_password_reset(&self, to: &Email, link: &str) -> Result<(), Error> {
        tracing::info!("Password reset link for {to}: {link}");

        Ok(())
    }
}
