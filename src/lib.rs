//! Centavo is a library for managing personal finances: accounts,
//! categories, tags, transactions, recurring bills, budgets, savings goals,
//! and credit cards, stored per user in SQLite.
//!
//! Balances, budget consumption, bill statuses, goal progress, and card
//! invoices are derived values: they are computed from the transaction
//! ledger on every read and never persisted. Monetary amounts use
//! [rust_decimal::Decimal] throughout so that sums and threshold
//! comparisons are exact.
//!
//! The crate has no HTTP layer. Callers are expected to wire these
//! functions into whatever front end they use, passing the owning user's id
//! into every call and a [Clock] wherever "today" matters.

#![warn(missing_docs)]

pub mod account;
pub mod budget;
pub mod card;
pub mod category;
mod clock;
pub mod csv_export;
mod db;
pub mod goal;
pub mod money;
pub mod recurring;
pub mod report;
pub mod tag;
pub mod transaction;
pub mod user;
pub mod verification;

#[cfg(test)]
mod test_utils;

pub use clock::{Clock, SystemClock};
pub use db::initialize;

use crate::{account::AccountId, category::CategoryId};

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// An amount string could not be parsed as a decimal, or an amount that
    /// must be positive was zero or negative.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A date string could not be parsed.
    #[error("invalid date: {0}")]
    InvalidDate(String),

    /// A day of month outside 1-31 was given for a bill or card.
    #[error("{0} is not a valid day of the month")]
    InvalidDayOfMonth(u8),

    /// A calendar month outside 1-12 was given.
    #[error("{0} is not a valid month")]
    InvalidMonth(u8),

    /// An empty string was used where a name is required.
    #[error("name cannot be empty")]
    EmptyName,

    /// An unrecognized transaction kind string.
    #[error("\"{0}\" is not a transaction kind")]
    InvalidTransactionKind(String),

    /// An unrecognized account kind string.
    #[error("\"{0}\" is not an account kind")]
    InvalidAccountKind(String),

    /// An unrecognized category kind string.
    #[error("\"{0}\" is not a category kind")]
    InvalidCategoryKind(String),

    /// A string that is not a well-formed email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The password does not meet the minimum length.
    #[error("password must be at least {} characters", user::MIN_PASSWORD_LENGTH)]
    PasswordTooShort,

    /// The email/password combination did not match a user.
    ///
    /// Returned both for an unknown email and for a wrong password so that
    /// callers cannot probe which emails are registered.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The email is already registered.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// An unexpected error from the password hashing library.
    ///
    /// The message should only be logged on the server, never shown to a
    /// client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The account id on a write did not refer to an account owned by the
    /// caller.
    #[error("the account ID does not refer to a valid account")]
    InvalidAccount(Option<AccountId>),

    /// The category id on a write did not refer to a category owned by the
    /// caller.
    #[error("the category ID does not refer to a valid category")]
    InvalidCategory(Option<CategoryId>),

    /// A recurring bill's stored payment map could not be parsed.
    ///
    /// Malformed entries are rejected rather than silently treated as an
    /// empty map, so a corrupted row surfaces instead of reporting every
    /// month unpaid.
    #[error("malformed payment map: {0}")]
    InvalidPaymentMap(String),

    /// No verification code has been issued for the user.
    #[error("no verification code was requested")]
    CodeMissing,

    /// The supplied verification code does not match the issued one.
    #[error("incorrect verification code")]
    CodeMismatch,

    /// The verification code was issued more than ten minutes ago.
    #[error("the verification code has expired")]
    CodeExpired,

    /// The mailer failed to deliver a verification code.
    #[error("could not deliver the verification code: {0}")]
    CodeDelivery(String),

    /// CSV data could not be written or parsed.
    #[error("CSV processing failed: {0}")]
    InvalidCsv(String),

    /// The requested resource was not found.
    ///
    /// Also returned when the resource exists but belongs to another user,
    /// so an ownership miss leaks nothing about the row's existence.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}
