//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/transactions/{transaction_key}/edit', use [format_endpoint].

use std::fmt::Display;

/// The start page that works out which view to show.
pub const ROOT: &str = "/";
/// The landing page for logged in users.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page listing every transaction.
pub const HISTORY_VIEW: &str = "/history";
/// The page for recording a new income or expense.
pub const NEW_TRANSACTION_VIEW: &str = "/transactions/new";
/// The page for editing an existing transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_key}/edit";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page for requesting a password reset email.
pub const FORGOT_PASSWORD_VIEW: &str = "/forgot_password";
/// The page for choosing a new password.
pub const RESET_PASSWORD_VIEW: &str = "/reset_password";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route that turns the start page's URL fragment into a view.
pub const RESOLVE_SESSION: &str = "/api/session/resolve";
/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to register users.
pub const USERS: &str = "/api/users";
/// The route for sending a password reset email.
pub const FORGOT_PASSWORD_API: &str = "/api/forgot_password";
/// The route for setting a new password.
pub const RESET_PASSWORD_API: &str = "/api/reset_password";
/// The dashboard summary cards and charts.
pub const DASHBOARD_SUMMARY: &str = "/api/dashboard/summary";
/// The dashboard recent transactions table.
pub const DASHBOARD_RECENT: &str = "/api/dashboard/recent";
/// The history table.
pub const HISTORY_TABLE: &str = "/api/history";
/// The route to create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to update or delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_key}";
/// The long-poll route for change events.
pub const CHANGES: &str = "/api/changes";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/transactions/{transaction_key}/edit',
/// '{transaction_key}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: impl Display) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
