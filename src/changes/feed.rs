//! A broadcast channel for record and auth changes.

use rusqlite::{Connection, hooks::Action};
use tokio::sync::broadcast;

use crate::{auth::UserID, ledger::TransactionKind};

/// How many undelivered events a slow subscriber may fall behind by before
/// it starts missing events.
const FEED_CAPACITY: usize = 64;

/// What happened to a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    /// A row was inserted.
    Insert,
    /// A row was updated.
    Update,
    /// A row was deleted.
    Delete,
}

impl ChangeAction {
    fn from_sqlite(action: Action) -> Option<Self> {
        match action {
            Action::SQLITE_INSERT => Some(ChangeAction::Insert),
            Action::SQLITE_UPDATE => Some(ChangeAction::Update),
            Action::SQLITE_DELETE => Some(ChangeAction::Delete),
            _ => None,
        }
    }
}

/// A change to a row in the income or expenses table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableChange {
    /// The table that changed.
    pub kind: TransactionKind,
    /// What happened.
    pub action: ChangeAction,
    /// The affected row.
    pub row_id: i64,
}

/// The kinds of auth change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEventKind {
    /// The user started a session.
    SignedIn,
    /// The user ended a session.
    SignedOut,
    /// The user's password was replaced, ending all of their sessions.
    PasswordUpdated,
}

/// A change to a user's authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthEvent {
    /// The user the change applies to.
    pub user_id: UserID,
    /// What changed.
    pub kind: AuthEventKind,
}

/// An event published on the [ChangeFeed].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEvent {
    /// A record changed.
    Table(TableChange),
    /// A user's auth state changed.
    Auth(AuthEvent),
}

/// Publishes [LedgerEvent]s to every current subscriber.
///
/// Cloning the feed gives another handle to the same channel.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<LedgerEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    /// Create a feed with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);

        Self { sender }
    }

    /// Send `event` to every current subscriber.
    ///
    /// Events published while nobody is subscribed are dropped.
    pub fn publish(&self, event: LedgerEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::debug!("Published {event:?} to {receivers} subscriber(s)"),
            Err(_) => tracing::trace!("No subscribers for {event:?}"),
        }
    }

    /// Listen for events published from now on.
    ///
    /// Dropping the returned [Subscription] stops listening.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
        }
    }

    /// The number of live subscriptions.
    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// The receiving end of a [ChangeFeed].
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<LedgerEvent>,
}

/// Why a [Subscription] did not yield an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvError {
    /// The subscriber fell behind and missed this many events.
    Lagged(u64),
    /// Every [ChangeFeed] handle has been dropped.
    Closed,
}

impl Subscription {
    /// Wait for the next event.
    ///
    /// # Errors
    ///
    /// Returns [RecvError::Lagged] if events were missed, or
    /// [RecvError::Closed] if the feed is gone.
    pub async fn recv(&mut self) -> Result<LedgerEvent, RecvError> {
        self.receiver.recv().await.map_err(|error| match error {
            broadcast::error::RecvError::Lagged(missed) => RecvError::Lagged(missed),
            broadcast::error::RecvError::Closed => RecvError::Closed,
        })
    }
}

/// Publish a [TableChange] on `feed` for every insert, update and delete on
/// the income and expenses tables made through `connection`.
///
/// Replaces any update hook already installed on `connection`.
///
/// # Errors
///
/// Returns an error if SQLite rejected the hook.
pub fn watch_tables(connection: &Connection, feed: ChangeFeed) -> Result<(), rusqlite::Error> {
    connection.update_hook(Some(
        move |action: Action, _database: &str, table: &str, row_id: i64| {
            let Some(kind) = TransactionKind::from_table(table) else {
                return;
            };
            let Some(action) = ChangeAction::from_sqlite(action) else {
                return;
            };

            feed.publish(LedgerEvent::Table(TableChange {
                kind,
                action,
                row_id,
            }));
        },
    ))
}
