//! Password recovery tokens carried in the URL fragment of a reset link and
//! then held in a short-lived private cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

/// The name of the cookie holding the recovery token between resolving the
/// start page and submitting the new password.
pub const COOKIE_RECOVERY_TOKEN: &str = "recovery_token";

/// How long the recovery cookie lives.
pub const RECOVERY_COOKIE_DURATION: Duration = Duration::minutes(15);

/// A one-time token that authorizes a password reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryToken(String);

impl RecoveryToken {
    /// Parse a URL fragment such as `#access_token=abc&type=recovery`.
    ///
    /// Returns `None` unless the fragment has a non-empty `access_token` and
    /// `type` is `recovery`.
    pub fn from_fragment(fragment: &str) -> Option<Self> {
        let fragment = fragment.strip_prefix('#').unwrap_or(fragment);
        let pairs: Vec<(String, String)> = serde_urlencoded::from_str(fragment).ok()?;

        let value_of = |name: &str| {
            pairs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        match (value_of("access_token"), value_of("type")) {
            (Some(token), Some("recovery")) if !token.is_empty() => Some(Self(token.to_owned())),
            _ => None,
        }
    }

    /// Wrap a token without checking it.
    pub fn new_unchecked(token: &str) -> Self {
        Self(token.to_owned())
    }

    /// The raw token text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Store `token` in `jar` for [RECOVERY_COOKIE_DURATION].
pub fn set_recovery_cookie(jar: PrivateCookieJar, token: &RecoveryToken) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_RECOVERY_TOKEN, token.as_str().to_owned()))
            .expires(OffsetDateTime::now_utc() + RECOVERY_COOKIE_DURATION)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

/// The recovery token in `jar`, if there is one.
pub fn get_recovery_token_from_cookies(jar: &PrivateCookieJar) -> Option<RecoveryToken> {
    jar.get(COOKIE_RECOVERY_TOKEN)
        .map(|cookie| cookie.value_trimmed().to_owned())
        .filter(|token| !token.is_empty() && token != "deleted")
        .map(RecoveryToken)
}

/// Overwrite the recovery cookie with an expired one.
pub fn invalidate_recovery_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.add(
        Cookie::build((COOKIE_RECOVERY_TOKEN, "deleted"))
            .expires(OffsetDateTime::UNIX_EPOCH)
            .max_age(Duration::ZERO)
            .http_only(true)
            .same_site(SameSite::Strict)
            .secure(true)
            .path("/"),
    )
}

#[cfg(test)]
mod tests {
    use axum_extra::extract::{PrivateCookieJar, cookie::Key};
    use sha2::{Digest, Sha512};

    use super::{
        RecoveryToken, get_recovery_token_from_cookies, invalidate_recovery_cookie,
        set_recovery_cookie,
    };

    #[test]
    fn parses_recovery_fragment() {
        assert_eq!(
            RecoveryToken::from_fragment("#access_token=abc&type=recovery"),
            Some(RecoveryToken::new_unchecked("abc"))
        );
    }

    #[test]
    fn parses_fragment_without_hash_in_any_order() {
        assert_eq!(
            RecoveryToken::from_fragment("type=recovery&expires_in=3600&access_token=abc"),
            Some(RecoveryToken::new_unchecked("abc"))
        );
    }

    #[test]
    fn rejects_fragment_without_recovery_type() {
        assert_eq!(RecoveryToken::from_fragment("#access_token=abc"), None);
        assert_eq!(
            RecoveryToken::from_fragment("#access_token=abc&type=signup"),
            None
        );
    }

    #[test]
    fn rejects_fragment_with_empty_token() {
        assert_eq!(
            RecoveryToken::from_fragment("#access_token=&type=recovery"),
            None
        );
        assert_eq!(RecoveryToken::from_fragment("#type=recovery"), None);
        assert_eq!(RecoveryToken::from_fragment(""), None);
    }

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(Key::from(&Sha512::digest(b"recovery")))
    }

    #[test]
    fn cookie_holds_token() {
        let token = RecoveryToken::new_unchecked("abc");

        let jar = set_recovery_cookie(get_jar(), &token);

        assert_eq!(get_recovery_token_from_cookies(&jar), Some(token));
    }

    #[test]
    fn invalidated_cookie_holds_no_token() {
        let jar = set_recovery_cookie(get_jar(), &RecoveryToken::new_unchecked("abc"));

        let jar = invalidate_recovery_cookie(jar);

        assert_eq!(get_recovery_token_from_cookies(&jar), None);
    }
}
