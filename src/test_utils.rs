#![allow(missing_docs)]

//! Shared fixtures for the crate's tests.

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{OffsetDateTime, macros::datetime};

use crate::{
    Clock,
    db::initialize,
    user::{PasswordHash, User, ValidatedPassword, register_user},
};

/// The instant the test clock is frozen at.
pub(crate) const NOW: OffsetDateTime = datetime!(2026-03-15 12:00 UTC);

/// A clock pinned to a fixed instant.
pub(crate) struct FixedClock(pub(crate) OffsetDateTime);

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

pub(crate) fn test_clock() -> FixedClock {
    FixedClock(NOW)
}

/// An in-memory database with the full schema.
pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().expect("Could not open in-memory database");
    initialize(&connection).expect("Could not initialize schema");
    connection
}

/// Register the default test user ("ana@example.com", password "hunter2!").
pub(crate) fn create_test_user(connection: &Connection) -> User {
    register_with(connection, "Ana", "ana@example.com")
}

/// Register a second user for cross-user isolation tests.
pub(crate) fn create_second_user(connection: &Connection) -> User {
    register_with(connection, "Bruno", "bruno@example.com")
}

fn register_with(connection: &Connection, name: &str, email: &str) -> User {
    let password = ValidatedPassword::new("hunter2!").unwrap();
    let hash = PasswordHash::new(&password, 4).unwrap();

    register_user(name, email, hash, &test_clock(), connection)
        .expect("Could not register test user")
}

/// Parse a decimal literal.
pub(crate) fn dec(text: &str) -> Decimal {
    text.parse().expect("invalid decimal literal in test")
}
