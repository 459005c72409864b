//! Credit cards and their derived invoice figures.
//!
//! A card spends through a linked account (kind `card`) that is created
//! with it; the invoice is the sum of that account's expense transactions
//! in the current calendar month.

use rusqlite::{Connection, Row, Transaction as SqlTransaction};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    account::{AccountId, AccountKind, NewAccount, create_account},
    money,
    transaction::{TransactionFilter, TransactionKind, get_transactions},
    user::UserId,
};

/// Database identifier for a credit card.
pub type CardId = i64;

/// A credit card.
#[derive(Debug, Clone, PartialEq)]
pub struct CreditCard {
    /// The ID of the card.
    pub id: CardId,
    /// The card's display name.
    pub name: String,
    /// The card network label, e.g. "Visa" or "Mastercard".
    pub network: String,
    /// The card's credit limit.
    pub limit: Decimal,
    /// The day of the month (1-31) the statement closes.
    pub closing_day: u8,
    /// The day of the month (1-31) the statement falls due.
    pub due_day: u8,
    /// Display color as a hex string.
    pub color: String,
    /// Whether the card is still in use.
    pub active: bool,
    /// The account the card's spending is routed through, until deleted.
    pub account_id: Option<AccountId>,
    /// The user that owns the card.
    pub user_id: UserId,
}

/// The fields needed to create a credit card.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    /// The card's display name.
    pub name: String,
    /// The card network label.
    pub network: String,
    /// The card's credit limit.
    pub limit: Decimal,
    /// The day of the month (1-31) the statement closes.
    pub closing_day: u8,
    /// The day of the month (1-31) the statement falls due.
    pub due_day: u8,
    /// Display color as a hex string.
    pub color: String,
}

impl NewCard {
    /// Create a card definition with the default network and color.
    pub fn new(name: &str, limit: Decimal, closing_day: u8, due_day: u8) -> Self {
        Self {
            name: name.to_owned(),
            network: "Visa".to_owned(),
            limit,
            closing_day,
            due_day,
            color: "#7c5cfc".to_owned(),
        }
    }

    /// Set the network label.
    pub fn network(mut self, network: &str) -> Self {
        self.network = network.to_owned();
        self
    }

    /// Set the display color.
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }
}

/// A card's derived invoice figures for the current calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct CardStatus {
    /// The sum of this month's expenses on the linked account; zero when
    /// the card has no linked account.
    pub invoice: Decimal,
    /// The limit minus the invoice, floored at zero.
    pub available_limit: Decimal,
    /// Invoice over limit, clamped to [0, 100]; 0 for a non-positive
    /// limit.
    pub percent_used: Decimal,
}

/// Create the credit card table and its indexes.
pub fn create_card_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS credit_card (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            network TEXT NOT NULL,
            limit_amount TEXT NOT NULL,
            closing_day INTEGER NOT NULL CHECK (closing_day BETWEEN 1 AND 31),
            due_day INTEGER NOT NULL CHECK (due_day BETWEEN 1 AND 31),
            color TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            account_id INTEGER,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_credit_card_user ON credit_card(user_id);",
    )?;

    Ok(())
}

/// Create a card together with its linked spending account.
///
/// Both rows are inserted in one store transaction, so a card never exists
/// without its account.
///
/// # Errors
/// This function will return an:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidAmount] if the limit is zero or negative,
/// - [Error::InvalidDayOfMonth] if either day is outside 1-31.
pub fn create_card(
    new_card: NewCard,
    user_id: UserId,
    connection: &Connection,
) -> Result<CreditCard, Error> {
    let name = new_card.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    money::require_positive(new_card.limit)?;

    for day in [new_card.closing_day, new_card.due_day] {
        if !(1..=31).contains(&day) {
            return Err(Error::InvalidDayOfMonth(day));
        }
    }

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let linked_account = create_account(
        NewAccount::new(&format!("{name} card"), AccountKind::Card)
            .color(&new_card.color)
            .icon("fa-credit-card"),
        user_id,
        &sql_transaction,
    )?;

    sql_transaction.execute(
        "INSERT INTO credit_card (name, network, limit_amount, closing_day, due_day, color, active, account_id, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8)",
        (
            name,
            &new_card.network,
            new_card.limit.to_string(),
            new_card.closing_day,
            new_card.due_day,
            &new_card.color,
            linked_account.id,
            user_id,
        ),
    )?;

    let card_id = sql_transaction.last_insert_rowid();

    sql_transaction.commit()?;

    Ok(CreditCard {
        id: card_id,
        name: name.to_owned(),
        network: new_card.network,
        limit: new_card.limit,
        closing_day: new_card.closing_day,
        due_day: new_card.due_day,
        color: new_card.color,
        active: true,
        account_id: Some(linked_account.id),
        user_id,
    })
}

/// Retrieve a single card owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the card does not exist or belongs to
/// another user.
pub fn get_card(card_id: CardId, user_id: UserId, connection: &Connection) -> Result<CreditCard, Error> {
    connection
        .prepare(
            "SELECT id, name, network, limit_amount, closing_day, due_day, color, active, account_id, user_id
             FROM credit_card WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &card_id), (":user_id", &user_id)], map_card_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's cards.
pub fn get_cards(user_id: UserId, connection: &Connection) -> Result<Vec<CreditCard>, Error> {
    connection
        .prepare(
            "SELECT id, name, network, limit_amount, closing_day, due_day, color, active, account_id, user_id
             FROM credit_card WHERE user_id = :user_id ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_card_row)?
        .map(|maybe_card| maybe_card.map_err(|error| error.into()))
        .collect()
}

/// Delete a card. Its linked account and that account's transactions are
/// kept as ordinary ledger rows.
///
/// # Errors
/// Returns [Error::NotFound] if the card does not exist or belongs to
/// another user.
pub fn delete_card(card_id: CardId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM credit_card WHERE id = ?1 AND user_id = ?2",
        (card_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Derive a card's invoice figures for the month `today` falls in.
pub fn card_status(
    card: &CreditCard,
    today: Date,
    connection: &Connection,
) -> Result<CardStatus, Error> {
    let invoice = card_invoice(card, today, connection)?;

    Ok(CardStatus {
        invoice,
        available_limit: (card.limit - invoice).max(Decimal::ZERO),
        percent_used: money::percentage(invoice, card.limit),
    })
}

/// The sum of the current month's expense transactions on the card's
/// linked account; zero when no account is linked.
pub fn card_invoice(
    card: &CreditCard,
    today: Date,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let Some(account_id) = card.account_id else {
        return Ok(Decimal::ZERO);
    };

    let filter = TransactionFilter {
        kind: Some(TransactionKind::Expense),
        account_id: Some(account_id),
        ..TransactionFilter::for_month(today.year(), u8::from(today.month()))
    };

    let mut invoice = Decimal::ZERO;

    for transaction in get_transactions(card.user_id, &filter, connection)? {
        invoice += transaction.amount;
    }

    Ok(invoice)
}

fn map_card_row(row: &Row) -> Result<CreditCard, rusqlite::Error> {
    Ok(CreditCard {
        id: row.get(0)?,
        name: row.get(1)?,
        network: row.get(2)?,
        limit: money::read_amount(row, 3)?,
        closing_day: row.get(4)?,
        due_day: row.get(5)?,
        color: row.get(6)?,
        active: row.get(7)?,
        account_id: row.get(8)?,
        user_id: row.get(9)?,
    })
}

#[cfg(test)]
mod create_card_tests {
    use crate::{
        Error,
        account::{AccountKind, get_account},
        test_utils::{create_test_user, dec, get_test_connection},
    };

    use super::{NewCard, create_card, get_card};

    #[test]
    fn create_card_also_creates_linked_account() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let card = create_card(NewCard::new("Gold", dec("5000"), 25, 5), user.id, &conn)
            .expect("Could not create card");

        let account_id = card.account_id.expect("card should have a linked account");
        let account = get_account(account_id, user.id, &conn).unwrap();
        assert_eq!(account.name, "Gold card");
        assert_eq!(account.kind, AccountKind::Card);
        assert_eq!(Ok(card), get_card(conn.last_insert_rowid(), user.id, &conn));
    }

    #[test]
    fn create_card_rejects_days_out_of_range() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = create_card(NewCard::new("Gold", dec("5000"), 0, 5), user.id, &conn);

        assert_eq!(result, Err(Error::InvalidDayOfMonth(0)));

        let result = create_card(NewCard::new("Gold", dec("5000"), 25, 32), user.id, &conn);

        assert_eq!(result, Err(Error::InvalidDayOfMonth(32)));
    }

    #[test]
    fn cards_are_scoped_to_their_owner() {
        use crate::test_utils::create_second_user;

        use super::{delete_card, get_cards};

        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = create_second_user(&conn);
        let card = create_card(NewCard::new("Gold", dec("5000"), 25, 5), owner.id, &conn).unwrap();

        assert_eq!(Err(Error::NotFound), get_card(card.id, other.id, &conn));
        assert_eq!(Err(Error::NotFound), delete_card(card.id, other.id, &conn));
        assert!(get_cards(other.id, &conn).unwrap().is_empty());
    }

    #[test]
    fn rejected_card_leaves_no_account_behind() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        create_card(NewCard::new("Gold", dec("-1"), 25, 5), user.id, &conn)
            .expect_err("negative limit should be rejected");

        let accounts = crate::account::get_accounts(user.id, &conn).unwrap();
        assert!(accounts.iter().all(|account| account.kind != AccountKind::Card));
    }
}
