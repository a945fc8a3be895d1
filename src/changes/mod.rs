//! Change notifications for the ledger tables and auth state, and the
//! long-poll endpoint that relays them to open pages.

mod endpoint;
mod feed;

pub use endpoint::{
    CHANGE_POLL_TIMEOUT, ChangesState, LEDGER_CHANGED_EVENT, changes_poller, get_changes,
};
pub use feed::{
    AuthEvent, AuthEventKind, ChangeAction, ChangeFeed, LedgerEvent, RecvError, Subscription,
    TableChange, watch_tables,
};
