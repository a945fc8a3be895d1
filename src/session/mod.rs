//! Decides which screen a visitor sees and carries the recovery token.

mod handlers;
mod recovery;
mod view;

pub use handlers::{ResolveSessionForm, SessionState, get_start_page, resolve_session};
pub use recovery::{
    COOKIE_RECOVERY_TOKEN, RECOVERY_COOKIE_DURATION, RecoveryToken,
    get_recovery_token_from_cookies, invalidate_recovery_cookie, set_recovery_cookie,
};
pub use view::{SessionEvent, View, ViewState};
