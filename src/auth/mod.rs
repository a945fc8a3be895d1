//! Accounts, sessions, password recovery and the pages that drive them.

mod cookie;
mod email;
mod forgot_password;
mod log_in;
mod log_out;
mod mailer;
mod middleware;
mod password;
mod provider;
mod redirect;
mod register;
mod reset_password;
mod token;
mod user;

pub use cookie::{
    COOKIE_TOKEN, DEFAULT_COOKIE_DURATION, REMEMBER_ME_COOKIE_DURATION,
    extend_auth_cookie_duration_if_needed, get_token_from_cookies, invalidate_auth_cookie,
    set_auth_cookie,
};
pub use email::Email;
pub use forgot_password::{ForgotPasswordState, get_forgot_password_page, post_forgot_password};
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::post_log_out;
pub use mailer::{LogMailer, Mailer};
pub use middleware::{AuthState, auth_guard, auth_guard_hx};
pub use password::{MIN_PASSWORD_LENGTH, PasswordHash, ValidatedPassword, validate_new_password};
pub use provider::{
    AuthProvider, AuthSession, RECOVERY_TOKEN_DURATION, create_password_recovery_table,
    create_session_table,
};
pub use redirect::{build_log_in_redirect_url, normalize_redirect_url};
pub use register::{RegistrationState, get_register_page, register_user};
pub use reset_password::{
    PASSWORD_RESET_REDIRECT_DELAY, ResetPasswordState, get_reset_password_page,
    post_reset_password,
};
pub use token::Token;
pub use user::{
    User, UserID, create_user, create_user_table, get_user_by_email, get_user_by_id,
    update_password_hash,
};
