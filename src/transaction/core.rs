//! Defines the core data model and database operations for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    money,
    user::UserId,
};

/// Database identifier for a transaction.
pub type TransactionId = i64;

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received.
    Income,
    /// Money spent.
    Expense,
}

impl TransactionKind {
    /// The kind's stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(Error::InvalidTransactionKind(other.to_owned())),
        }
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event where money was either spent or earned.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The amount of money moved. Always positive; the direction comes from
    /// `kind`.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The account the money moved through, if recorded.
    pub account_id: Option<AccountId>,
    /// The category the transaction belongs to, if any.
    pub category_id: Option<CategoryId>,
    /// An opaque URL for an uploaded receipt, if one was attached.
    pub receipt_url: Option<String>,
    /// The user that owns the transaction.
    pub user_id: UserId,
}

impl Transaction {
    /// Start building a new transaction.
    pub fn build(
        kind: TransactionKind,
        amount: Decimal,
        date: Date,
        description: &str,
    ) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            date,
            description: description.to_owned(),
            account_id: None,
            category_id: None,
        }
    }
}

/// A builder for creating and editing [Transaction] rows.
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    /// Whether the transaction is income or an expense.
    pub kind: TransactionKind,
    /// The amount of money moved. Must be positive.
    pub amount: Decimal,
    /// When the transaction happened.
    pub date: Date,
    /// A text description of what the transaction was for.
    pub description: String,
    /// The account the money moved through.
    pub account_id: Option<AccountId>,
    /// The category the transaction belongs to.
    pub category_id: Option<CategoryId>,
}

impl TransactionBuilder {
    /// Set the account the transaction is recorded against.
    pub fn account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }

    /// Set the category for the transaction.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }
}

/// Create the transaction table and the transaction-tag join table.
pub fn create_transaction_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            amount TEXT NOT NULL,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            receipt_url TEXT,
            account_id INTEGER,
            category_id INTEGER,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_user_date ON \"transaction\"(user_id, date);
        CREATE INDEX IF NOT EXISTS idx_transaction_account ON \"transaction\"(account_id);

        CREATE TABLE IF NOT EXISTS transaction_tag (
            transaction_id INTEGER NOT NULL,
            tag_id INTEGER NOT NULL,
            PRIMARY KEY (transaction_id, tag_id),
            FOREIGN KEY(transaction_id) REFERENCES \"transaction\"(id) ON DELETE CASCADE,
            FOREIGN KEY(tag_id) REFERENCES tag(id) ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

/// Create a new transaction in the database from a builder.
///
/// # Errors
/// This function will return an:
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::InvalidAccount] if the account id does not refer to one of the
///   user's accounts,
/// - [Error::InvalidCategory] if the category id does not refer to one of
///   the user's categories,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    builder: TransactionBuilder,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    money::require_positive(builder.amount)?;
    validate_account(builder.account_id, user_id, connection)?;
    validate_category(builder.category_id, user_id, connection)?;

    connection.execute(
        "INSERT INTO \"transaction\" (kind, amount, date, description, account_id, category_id, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        (
            builder.kind.as_str(),
            builder.amount.to_string(),
            builder.date,
            &builder.description,
            builder.account_id,
            builder.category_id,
            user_id,
        ),
    )?;

    Ok(Transaction {
        id: connection.last_insert_rowid(),
        kind: builder.kind,
        amount: builder.amount,
        date: builder.date,
        description: builder.description,
        account_id: builder.account_id,
        category_id: builder.category_id,
        receipt_url: None,
        user_id,
    })
}

/// Retrieve a transaction owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs
/// to another user.
pub fn get_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(
            "SELECT id, kind, amount, date, description, account_id, category_id, receipt_url, user_id
             FROM \"transaction\" WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &id), (":user_id", &user_id)], map_transaction_row)
        .map_err(|error| error.into())
}

/// Replace a transaction's fields from a builder. Any attached receipt is
/// kept.
///
/// # Errors
/// Returns the same validation errors as [create_transaction], or
/// [Error::NotFound] if the transaction does not exist or belongs to
/// another user.
pub fn update_transaction(
    id: TransactionId,
    builder: TransactionBuilder,
    user_id: UserId,
    connection: &Connection,
) -> Result<Transaction, Error> {
    money::require_positive(builder.amount)?;
    validate_account(builder.account_id, user_id, connection)?;
    validate_category(builder.category_id, user_id, connection)?;

    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
         SET kind = ?1, amount = ?2, date = ?3, description = ?4, account_id = ?5, category_id = ?6
         WHERE id = ?7 AND user_id = ?8",
        (
            builder.kind.as_str(),
            builder.amount.to_string(),
            builder.date,
            &builder.description,
            builder.account_id,
            builder.category_id,
            id,
            user_id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_transaction(id, user_id, connection)
}

/// Delete a transaction. Derived values pick up the change on the next
/// read.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs
/// to another user.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Attach the retrieval URL of an uploaded receipt to a transaction.
///
/// The URL comes from an external file store and is treated as an opaque
/// string.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs
/// to another user.
pub fn attach_receipt(
    id: TransactionId,
    user_id: UserId,
    receipt_url: &str,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE \"transaction\" SET receipt_url = ?1 WHERE id = ?2 AND user_id = ?3",
        (receipt_url, id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the total number of transactions a user has recorded.
pub fn count_transactions(user_id: UserId, connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM \"transaction\" WHERE user_id = :user_id",
            &[(":user_id", &user_id)],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Map a database row to a [Transaction].
pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let raw_kind: String = row.get(1)?;
    let kind = raw_kind.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        kind,
        amount: money::read_amount(row, 2)?,
        date: row.get(3)?,
        description: row.get(4)?,
        account_id: row.get(5)?,
        category_id: row.get(6)?,
        receipt_url: row.get(7)?,
        user_id: row.get(8)?,
    })
}

pub(crate) fn validate_account(
    account_id: Option<AccountId>,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(account_id) = account_id else {
        return Ok(());
    };

    let exists: bool = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM account WHERE id = ?1 AND user_id = ?2)",
        (account_id, user_id),
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        // The same error covers a missing account and someone else's, so
        // nothing leaks about which it was.
        Err(Error::InvalidAccount(Some(account_id)))
    }
}

pub(crate) fn validate_category(
    category_id: Option<CategoryId>,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let Some(category_id) = category_id else {
        return Ok(());
    };

    let exists: bool = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM category WHERE id = ?1 AND user_id = ?2)",
        (category_id, user_id),
        |row| row.get(0),
    )?;

    if exists {
        Ok(())
    } else {
        Err(Error::InvalidCategory(Some(category_id)))
    }
}
