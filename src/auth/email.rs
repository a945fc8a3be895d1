//! The email address used to identify a user account.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::Error;

/// A trimmed, lowercase email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// Surrounding whitespace is removed and the address is lowercased so
    /// that the same account cannot be registered twice with different casing.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidEmail] if `raw_email` does not look like
    /// `local@domain`.
    pub fn new(raw_email: &str) -> Result<Self, Error> {
        let email = raw_email.trim().to_lowercase();

        match email.split_once('@') {
            Some((local, domain))
                if !local.is_empty() && !domain.is_empty() && !domain.contains('@') =>
            {
                Ok(Self(email))
            }
            _ => Err(Error::InvalidEmail(raw_email.to_owned())),
        }
    }

    /// Create a new `Email` without any validation.
    ///
    /// Only use this for addresses read back from the database.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod email_tests {
    use crate::{Error, auth::Email};

    #[test]
    fn create_email_success() {
        let email = Email::new("treasurer@temple.org").unwrap();

        assert_eq!(email.as_ref(), "treasurer@temple.org");
    }

    #[test]
    fn create_email_normalizes_case_and_whitespace() {
        let email = Email::new("  Treasurer@Temple.ORG ").unwrap();

        assert_eq!(email.as_ref(), "treasurer@temple.org");
    }

    #[test]
    fn create_email_fails_with_no_at_symbol() {
        assert!(matches!(
            Email::new("treasurer.temple.org"),
            Err(Error::InvalidEmail(_))
        ));
    }

    #[test]
    fn create_email_fails_with_empty_parts() {
        assert!(matches!(Email::new("@temple.org"), Err(Error::InvalidEmail(_))));
        assert!(matches!(Email::new("treasurer@"), Err(Error::InvalidEmail(_))));
        assert!(matches!(Email::new(""), Err(Error::InvalidEmail(_))));
    }
}
