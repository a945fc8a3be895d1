//! Which screen the user sees, as a function of session events.

use crate::{auth::AuthSession, endpoints, session::RecoveryToken};

/// A screen of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// The start page, while the session is being resolved.
    Loading,
    /// The log-in form.
    LogIn,
    /// Totals, charts and recent transactions.
    Dashboard,
    /// Every transaction, filterable and sortable.
    History,
    /// The new-password form reached from a recovery link.
    ResetPassword,
}

impl View {
    /// The page that renders this view.
    pub const fn endpoint(self) -> &'static str {
        match self {
            View::Loading => endpoints::ROOT,
            View::LogIn => endpoints::LOG_IN_VIEW,
            View::Dashboard => endpoints::DASHBOARD_VIEW,
            View::History => endpoints::HISTORY_VIEW,
            View::ResetPassword => endpoints::RESET_PASSWORD_VIEW,
        }
    }
}

/// Something that may change the active view.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The start page resolved the URL fragment and the stored session.
    Started {
        recovery: Option<RecoveryToken>,
        session: Option<AuthSession>,
    },
    /// The auth provider reported a new session, or none.
    AuthChanged(Option<AuthSession>),
    /// The user asked for a view.
    Navigate(View),
    /// The user logged out.
    LoggedOut,
    /// The password was replaced through a recovery link.
    PasswordResetCompleted,
}

/// The active view and the session it was decided with.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    view: View,
    session: Option<AuthSession>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewState {
    /// The state before anything is known: loading, without a session.
    pub fn new() -> Self {
        Self {
            view: View::Loading,
            session: None,
        }
    }

    /// The active view.
    pub fn view(&self) -> View {
        self.view
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    /// Give up the state, keeping the session.
    pub fn into_session(self) -> Option<AuthSession> {
        self.session
    }

    fn home_for(session: &Option<AuthSession>) -> View {
        if session.is_some() {
            View::Dashboard
        } else {
            View::LogIn
        }
    }

    /// The state after `event`.
    pub fn apply(self, event: SessionEvent) -> Self {
        match event {
            SessionEvent::Started {
                recovery: Some(_),
                session,
            } => Self {
                view: View::ResetPassword,
                session,
            },
            SessionEvent::Started {
                recovery: None,
                session,
            }
            | SessionEvent::AuthChanged(session) => Self {
                view: Self::home_for(&session),
                session,
            },
            SessionEvent::Navigate(view @ (View::Dashboard | View::History)) => {
                if self.session.is_some() {
                    Self { view, ..self }
                } else {
                    Self {
                        view: View::LogIn,
                        ..self
                    }
                }
            }
            SessionEvent::Navigate(_) => self,
            SessionEvent::LoggedOut | SessionEvent::PasswordResetCompleted => Self {
                view: View::LogIn,
                session: None,
            },
        }
    }
}
