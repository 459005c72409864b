//! Database operations for users.

use rusqlite::{Connection, Row, Transaction as SqlTransaction};
use time::OffsetDateTime;

use crate::{
    Clock, Error,
    account::{self, AccountKind, NewAccount},
    category,
    user::{
        PasswordHash, Theme, User, UserId,
        domain::parse_email,
    },
};

/// Create the user table and its indexes.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS user (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            theme TEXT NOT NULL DEFAULT 'dark',
            verification_code TEXT,
            code_expires_at TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_user_email ON user(email);",
    )?;

    Ok(())
}

/// Register a new user and seed their starter ledger.
///
/// The user row, the default category set, and the default wallet account
/// are inserted in one store transaction: a registered user always has the
/// fixtures, and a failed registration leaves nothing behind.
///
/// # Errors
/// This function will return:
/// - [Error::EmptyName] if `name` is empty or whitespace,
/// - [Error::InvalidEmail] if `email` is not a well-formed address,
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn register_user(
    name: &str,
    email: &str,
    password_hash: PasswordHash,
    clock: &impl Clock,
    connection: &Connection,
) -> Result<User, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let email = parse_email(email)?;
    let created_at = clock.now();

    let transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    transaction.execute(
        "INSERT INTO user (name, email, password_hash, theme, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            name,
            email.as_str(),
            password_hash.as_ref(),
            Theme::Dark.as_str(),
            created_at,
        ),
    )?;

    let user_id = transaction.last_insert_rowid();

    for starter_category in category::default_categories() {
        category::create_category(starter_category, user_id, &transaction)?;
    }

    account::create_account(
        NewAccount::new("Wallet", AccountKind::Cash).color("#00d68f"),
        user_id,
        &transaction,
    )?;

    transaction.commit()?;

    Ok(User {
        id: user_id,
        name: name.to_owned(),
        email,
        password_hash,
        theme: Theme::Dark,
        created_at,
    })
}

/// Retrieve a user by their `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to a user.
pub fn get_user(id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, email, password_hash, theme, created_at FROM user WHERE id = :id",
        )?
        .query_one(&[(":id", &id)], map_user_row)
        .map_err(|error| error.into())
}

/// Retrieve a user by their email address.
///
/// # Errors
/// Returns [Error::NotFound] if no user has the address.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, name, email, password_hash, theme, created_at
             FROM user WHERE email = :email",
        )?
        .query_one(&[(":email", &email.trim())], map_user_row)
        .map_err(|error| error.into())
}

/// Check an email/password pair and return the matching user.
///
/// # Errors
/// Returns [Error::InvalidCredentials] for an unknown email or a wrong
/// password; the two cases are indistinguishable to the caller.
pub fn authenticate(email: &str, password: &str, connection: &Connection) -> Result<User, Error> {
    let user = get_user_by_email(email, connection).map_err(|error| match error {
        Error::NotFound => Error::InvalidCredentials,
        error => error,
    })?;

    user.password_hash.verify(password)?;

    Ok(user)
}

/// Update a user's display name and email address.
///
/// # Errors
/// This function will return:
/// - [Error::EmptyName] if `name` is empty,
/// - [Error::InvalidEmail] if `email` is malformed,
/// - [Error::DuplicateEmail] if another user already has the address,
/// - or [Error::NotFound] if `user_id` does not refer to a user.
pub fn update_profile(
    user_id: UserId,
    name: &str,
    email: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    let email = parse_email(email)?;

    let rows_affected = connection.execute(
        "UPDATE user SET name = ?1, email = ?2 WHERE id = ?3",
        (name, email.as_str(), user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_user(user_id, connection)
}

/// Replace a user's password after verifying their current one.
///
/// # Errors
/// Returns [Error::InvalidCredentials] if `current_password` does not match
/// the stored hash, or [Error::NotFound] for an unknown user.
pub fn change_password(
    user_id: UserId,
    current_password: &str,
    new_password_hash: PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let user = get_user(user_id, connection)?;

    user.password_hash.verify(current_password)?;

    connection.execute(
        "UPDATE user SET password_hash = ?1 WHERE id = ?2",
        (new_password_hash.as_ref(), user_id),
    )?;

    Ok(())
}

/// Switch the user between the dark and light themes, returning the new one.
///
/// # Errors
/// Returns [Error::NotFound] for an unknown user.
pub fn toggle_theme(user_id: UserId, connection: &Connection) -> Result<Theme, Error> {
    let theme = get_user(user_id, connection)?.theme.toggled();

    connection.execute(
        "UPDATE user SET theme = ?1 WHERE id = ?2",
        (theme.as_str(), user_id),
    )?;

    Ok(theme)
}

/// Delete a user and, through the schema's cascades, everything they own.
///
/// # Errors
/// Returns [Error::NotFound] if `user_id` does not refer to a user.
pub fn delete_user(user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", [user_id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(2)?;
    let email = raw_email.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })?;

    let raw_hash: String = row.get(3)?;
    let raw_theme: String = row.get(4)?;
    let created_at: OffsetDateTime = row.get(5)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email,
        password_hash: PasswordHash::new_unchecked(&raw_hash),
        // Theme parsing falls back to dark on unknown values.
        theme: raw_theme.parse().unwrap_or(Theme::Dark),
        created_at,
    })
}

#[cfg(test)]
mod register_user_tests {
    use crate::{
        Error,
        account::get_accounts,
        category::get_categories,
        test_utils::{NOW, get_test_connection, test_clock},
        user::PasswordHash,
    };

    use super::{get_user_by_email, register_user};

    #[test]
    fn register_creates_user() {
        let conn = get_test_connection();

        let user = register_user(
            "Ana",
            "ana@example.com",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        )
        .expect("Could not register user");

        assert!(user.id > 0);
        assert_eq!(user.name, "Ana");
        assert_eq!(user.email.as_str(), "ana@example.com");
        assert_eq!(user.created_at, NOW);
        assert_eq!(Ok(user), get_user_by_email("ana@example.com", &conn));
    }

    #[test]
    fn register_seeds_default_categories_and_wallet() {
        let conn = get_test_connection();

        let user = register_user(
            "Ana",
            "ana@example.com",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        )
        .unwrap();

        let categories = get_categories(user.id, &conn).unwrap();
        let accounts = get_accounts(user.id, &conn).unwrap();

        assert_eq!(categories.len(), 14);
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].name, "Wallet");
    }

    #[test]
    fn register_rejects_duplicate_email() {
        let conn = get_test_connection();
        register_user(
            "Ana",
            "ana@example.com",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        )
        .unwrap();

        let result = register_user(
            "Impostor",
            "ana@example.com",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        );

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn register_rejects_empty_name() {
        let conn = get_test_connection();

        let result = register_user(
            "  \t",
            "ana@example.com",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        );

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn register_rejects_malformed_email() {
        let conn = get_test_connection();

        let result = register_user(
            "Ana",
            "not-an-email",
            PasswordHash::new_unchecked("$2b$04$fake"),
            &test_clock(),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidEmail("not-an-email".to_owned())));
    }
}


#[cfg(test)]
mod profile_tests {
    use crate::{
        Error,
        test_utils::{create_test_user, get_test_connection},
        user::{PasswordHash, Theme},
    };

    use super::{change_password, delete_user, get_user, toggle_theme, update_profile};

    #[test]
    fn update_profile_changes_name_and_email() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let updated = update_profile(user.id, "Ana Clara", "ana.clara@example.com", &conn)
            .expect("Could not update profile");

        assert_eq!(updated.name, "Ana Clara");
        assert_eq!(updated.email.as_str(), "ana.clara@example.com");
    }

    #[test]
    fn toggle_theme_flips_between_dark_and_light() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        assert_eq!(Ok(Theme::Light), toggle_theme(user.id, &conn));
        assert_eq!(Ok(Theme::Dark), toggle_theme(user.id, &conn));
    }

    #[test]
    fn change_password_requires_current_password() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = change_password(
            user.id,
            "not the password",
            PasswordHash::new_unchecked("$2b$04$new"),
            &conn,
        );

        assert_eq!(result, Err(Error::InvalidCredentials));
    }

    #[test]
    fn delete_user_removes_the_row() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        delete_user(user.id, &conn).expect("Could not delete user");

        assert_eq!(Err(Error::NotFound), get_user(user.id, &conn));
    }

    #[test]
    fn delete_missing_user_returns_not_found() {
        let conn = get_test_connection();

        assert_eq!(Err(Error::NotFound), delete_user(99, &conn));
    }

    #[test]
    fn delete_user_cascades_to_everything_they_own() {
        use time::macros::date;

        use crate::{
            goal::{NewGoal, create_goal},
            test_utils::dec,
            transaction::{Transaction, TransactionKind, create_transaction},
        };

        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("10"), date!(2026 - 03 - 01), ""),
            user.id,
            &conn,
        )
        .unwrap();
        create_goal(NewGoal::new("Trip", dec("100")), user.id, &conn).unwrap();

        delete_user(user.id, &conn).expect("Could not delete user");

        for table in ["account", "category", "\"transaction\"", "goal"] {
            let remaining: i64 = conn
                .query_row(
                    &format!("SELECT COUNT(*) FROM {table} WHERE user_id = ?1"),
                    [user.id],
                    |row| row.get(0),
                )
                .unwrap();

            assert_eq!(remaining, 0, "rows left in {table} after user delete");
        }
    }
}
