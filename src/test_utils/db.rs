use rusqlite::Connection;

use crate::{
    auth::{Email, PasswordHash, User, create_user},
    db::initialize,
};

/// The password of every user made by [create_test_user].
pub(crate) const TEST_PASSWORD: &str = "hunter2";

/// An in-memory database with the full schema.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open database in memory.");
    initialize(&connection).expect("Could not initialize database.");

    connection
}

/// Insert a user with [TEST_PASSWORD], hashed cheaply.
#[track_caller]
pub(crate) fn create_test_user(connection: &Connection, email: &str) -> User {
    let password_hash =
        PasswordHash::from_raw_password(TEST_PASSWORD, 4).expect("Could not hash password");

    create_user(Email::new_unchecked(email), password_hash, connection)
        .expect("Could not create test user")
}
