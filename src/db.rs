//! Database schema initialization.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error, account::create_account_table, budget::create_budget_table, card::create_card_table,
    category::create_category_table, goal::create_goal_table, recurring::create_bill_table,
    tag::create_tag_table, transaction::create_transaction_tables, user::create_user_table,
};

/// Create every application table if it does not already exist.
///
/// The tables are created inside a single exclusive transaction so that a
/// half-initialized database is never observed.
///
/// # Errors
/// Returns an error if the schema could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    // Owner deletion must cascade through every table.
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_account_table(&transaction)?;
    create_category_table(&transaction)?;
    create_tag_table(&transaction)?;
    create_transaction_tables(&transaction)?;
    create_bill_table(&transaction)?;
    create_budget_table(&transaction)?;
    create_goal_table(&transaction)?;
    create_card_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

#[cfg(test)]
mod initialize_tests {
    use rusqlite::Connection;

    use super::initialize;

    #[test]
    fn sql_is_valid() {
        let connection =
            Connection::open_in_memory().expect("Could not initialise in-memory SQLite database");

        assert_eq!(Ok(()), initialize(&connection));
    }

    #[test]
    fn is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        initialize(&connection).unwrap();

        assert_eq!(Ok(()), initialize(&connection));
    }
}
