//! Database operations and balance derivation for accounts.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::{
    Error,
    account::{Account, AccountId, NewAccount},
    money,
    transaction::TransactionKind,
    user::UserId,
};

/// Create the account table and its indexes.
pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            initial_balance TEXT NOT NULL,
            color TEXT NOT NULL,
            icon TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_account_user ON account(user_id);",
    )?;

    Ok(())
}

/// Create an account and return it with its generated ID.
///
/// # Errors
/// Returns [Error::EmptyName] if the name is empty or whitespace.
pub fn create_account(
    new_account: NewAccount,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = new_account.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection.execute(
        "INSERT INTO account (name, kind, initial_balance, color, icon, active, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6)",
        (
            name,
            new_account.kind.as_str(),
            new_account.initial_balance.to_string(),
            &new_account.color,
            &new_account.icon,
            user_id,
        ),
    )?;

    Ok(Account {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        kind: new_account.kind,
        initial_balance: new_account.initial_balance,
        color: new_account.color,
        icon: new_account.icon,
        active: true,
        user_id,
    })
}

/// Retrieve a single account owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn get_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Account, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, initial_balance, color, icon, active, user_id
             FROM account WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &account_id), (":user_id", &user_id)], map_account_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's accounts, including inactive ones.
pub fn get_accounts(user_id: UserId, connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, initial_balance, color, icon, active, user_id
             FROM account WHERE user_id = :user_id ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the user's active accounts, the set shown in account pickers.
pub fn get_active_accounts(
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, initial_balance, color, icon, active, user_id
             FROM account WHERE user_id = :user_id AND active = 1 ORDER BY name ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_account_row)?
        .map(|maybe_account| maybe_account.map_err(|error| error.into()))
        .collect()
}

/// Update an account's name, kind, starting balance, and display metadata.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user, and [Error::EmptyName] for a blank name.
pub fn update_account(
    account_id: AccountId,
    user_id: UserId,
    changes: NewAccount,
    connection: &Connection,
) -> Result<Account, Error> {
    let name = changes.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let rows_affected = connection.execute(
        "UPDATE account
         SET name = ?1, kind = ?2, initial_balance = ?3, color = ?4, icon = ?5
         WHERE id = ?6 AND user_id = ?7",
        (
            name,
            changes.kind.as_str(),
            changes.initial_balance.to_string(),
            &changes.color,
            &changes.icon,
            account_id,
            user_id,
        ),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_account(account_id, user_id, connection)
}

/// Delete an account. Transactions that referenced it keep their history
/// with the account link cleared.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist or belongs to
/// another user.
pub fn delete_account(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM account WHERE id = ?1 AND user_id = ?2",
        (account_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The account's current balance: the initial balance plus income minus
/// expenses across its transactions.
///
/// # Errors
/// Returns [Error::SqlError] on query failure or a malformed stored amount.
pub fn account_balance(account: &Account, connection: &Connection) -> Result<Decimal, Error> {
    let net = net_transaction_total(account.id, account.user_id, connection)?;

    Ok(account.initial_balance + net)
}

/// The combined balance of the user's active accounts.
///
/// # Errors
/// Returns [Error::SqlError] on query failure or a malformed stored amount.
pub fn total_balance(user_id: UserId, connection: &Connection) -> Result<Decimal, Error> {
    let mut total = Decimal::ZERO;

    for account in get_active_accounts(user_id, connection)? {
        total += account_balance(&account, connection)?;
    }

    Ok(total)
}

/// Income minus expenses over an account's transactions, summed in Rust so
/// decimal amounts never pass through floating point.
fn net_transaction_total(
    account_id: AccountId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Decimal, Error> {
    let rows = connection
        .prepare(
            "SELECT kind, amount FROM \"transaction\"
             WHERE account_id = :account_id AND user_id = :user_id",
        )?
        .query_map(
            &[(":account_id", &account_id), (":user_id", &user_id)],
            |row| {
                let kind: String = row.get(0)?;
                let amount: String = row.get(1)?;
                Ok((kind, amount))
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;

    let mut net = Decimal::ZERO;

    for (raw_kind, raw_amount) in rows {
        let kind: TransactionKind = raw_kind.parse()?;
        let amount = money::parse_amount(&raw_amount)?;

        match kind {
            TransactionKind::Income => net += amount,
            TransactionKind::Expense => net -= amount,
        }
    }

    Ok(net)
}

fn map_account_row(row: &Row) -> Result<Account, rusqlite::Error> {
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        initial_balance: money::read_amount(row, 3)?,
        color: row.get(4)?,
        icon: row.get(5)?,
        active: row.get(6)?,
        user_id: row.get(7)?,
    })
}

#[cfg(test)]
mod account_query_tests {
    use crate::{
        Error,
        account::{AccountKind, NewAccount},
        test_utils::{create_test_user, dec, get_test_connection},
    };

    use super::{create_account, delete_account, get_account, get_accounts, update_account};

    #[test]
    fn create_account_succeeds() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let account = create_account(
            NewAccount::new("Everyday", AccountKind::Checking).initial_balance(dec("100.50")),
            user.id,
            &conn,
        )
        .expect("Could not create account");

        assert!(account.id > 0);
        assert_eq!(account.name, "Everyday");
        assert_eq!(account.initial_balance, dec("100.50"));
        assert!(account.active);
    }

    #[test]
    fn create_account_rejects_empty_name() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = create_account(NewAccount::new("  ", AccountKind::Cash), user.id, &conn);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn get_account_hides_other_users_rows() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = crate::test_utils::create_second_user(&conn);
        let account =
            create_account(NewAccount::new("Private", AccountKind::Savings), owner.id, &conn)
                .unwrap();

        let result = get_account(account.id, other.id, &conn);

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn get_accounts_only_returns_own_rows() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = crate::test_utils::create_second_user(&conn);
        create_account(NewAccount::new("Mine", AccountKind::Checking), owner.id, &conn).unwrap();

        let accounts = get_accounts(other.id, &conn).unwrap();

        // The second user still has their seeded wallet, nothing more.
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Wallet");
    }

    #[test]
    fn update_account_replaces_fields() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let account =
            create_account(NewAccount::new("Old", AccountKind::Checking), user.id, &conn).unwrap();

        let updated = update_account(
            account.id,
            user.id,
            NewAccount::new("New", AccountKind::Savings).initial_balance(dec("10")),
            &conn,
        )
        .expect("Could not update account");

        assert_eq!(updated.name, "New");
        assert_eq!(updated.kind, AccountKind::Savings);
        assert_eq!(updated.initial_balance, dec("10"));
    }

    #[test]
    fn update_missing_account_returns_not_found() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = update_account(
            999,
            user.id,
            NewAccount::new("New", AccountKind::Savings),
            &conn,
        );

        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_account_removes_row() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let account =
            create_account(NewAccount::new("Doomed", AccountKind::Cash), user.id, &conn).unwrap();

        delete_account(account.id, user.id, &conn).expect("Could not delete account");

        assert_eq!(Err(Error::NotFound), get_account(account.id, user.id, &conn));
    }
}
