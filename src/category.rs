//! Categories that classify transactions as income, expense, or both.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserId};

/// Database identifier for a category.
pub type CategoryId = i64;

/// Which transaction kinds a category applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    /// Only income transactions.
    Income,
    /// Only expense transactions.
    Expense,
    /// Either kind.
    Both,
}

impl CategoryKind {
    /// The kind's stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryKind::Income => "income",
            CategoryKind::Expense => "expense",
            CategoryKind::Both => "both",
        }
    }
}

impl FromStr for CategoryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(CategoryKind::Income),
            "expense" => Ok(CategoryKind::Expense),
            "both" => Ok(CategoryKind::Both),
            other => Err(Error::InvalidCategoryKind(other.to_owned())),
        }
    }
}

impl Display for CategoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction category (e.g. "Food", "Salary").
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The category's display name.
    pub name: String,
    /// Which transaction kinds the category applies to.
    pub kind: CategoryKind,
    /// Display icon name.
    pub icon: String,
    /// Display color as a hex string.
    pub color: String,
    /// The user that owns the category.
    pub user_id: UserId,
}

/// The fields needed to create a category.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The category's display name.
    pub name: String,
    /// Which transaction kinds the category applies to.
    pub kind: CategoryKind,
    /// Display icon name.
    pub icon: String,
    /// Display color as a hex string.
    pub color: String,
}

impl NewCategory {
    /// Create a category definition with default display metadata.
    pub fn new(name: &str, kind: CategoryKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            icon: "fa-tag".to_owned(),
            color: "#7c5cfc".to_owned(),
        }
    }

    /// Set the display icon.
    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_owned();
        self
    }

    /// Set the display color.
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }
}

/// The starter categories seeded for every new user.
pub fn default_categories() -> Vec<NewCategory> {
    use CategoryKind::{Expense, Income};

    [
        ("Salary", Income, "fa-money-bill-wave", "#00d68f"),
        ("Freelance", Income, "fa-laptop-code", "#45b7d1"),
        ("Investments", Income, "fa-chart-line", "#7c5cfc"),
        ("Other (Income)", Income, "fa-plus-circle", "#ffd93d"),
        ("Food", Expense, "fa-utensils", "#ff6b6b"),
        ("Transport", Expense, "fa-car", "#45b7d1"),
        ("Housing", Expense, "fa-house", "#7c5cfc"),
        ("Health", Expense, "fa-heart-pulse", "#ff4757"),
        ("Education", Expense, "fa-graduation-cap", "#00d68f"),
        ("Leisure", Expense, "fa-gamepad", "#f093fb"),
        ("Clothing", Expense, "fa-shirt", "#ff8a5c"),
        ("Utilities", Expense, "fa-file-invoice", "#ffd93d"),
        ("Subscriptions", Expense, "fa-tv", "#6c5ce7"),
        ("Other (Expense)", Expense, "fa-receipt", "#a0a3bd"),
    ]
    .into_iter()
    .map(|(name, kind, icon, color)| NewCategory::new(name, kind).icon(icon).color(color))
    .collect()
}

/// Create the category table and its indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            kind TEXT NOT NULL,
            icon TEXT NOT NULL,
            color TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user ON category(user_id);",
    )?;

    Ok(())
}

/// Create a category and return it with its generated ID.
///
/// # Errors
/// Returns [Error::EmptyName] if the name is empty or whitespace.
pub fn create_category(
    new_category: NewCategory,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    let name = new_category.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    connection.execute(
        "INSERT INTO category (name, kind, icon, color, user_id) VALUES (?1, ?2, ?3, ?4, ?5)",
        (
            name,
            new_category.kind.as_str(),
            &new_category.icon,
            &new_category.color,
            user_id,
        ),
    )?;

    Ok(Category {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        kind: new_category.kind,
        icon: new_category.icon,
        color: new_category.color,
        user_id,
    })
}

/// Retrieve a single category owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another user.
pub fn get_category(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Category, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, icon, color, user_id
             FROM category WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(
            &[(":id", &category_id), (":user_id", &user_id)],
            map_category_row,
        )
        .map_err(|error| error.into())
}

/// Retrieve all of a user's categories, ordered by kind then name.
pub fn get_categories(user_id: UserId, connection: &Connection) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, icon, color, user_id
             FROM category WHERE user_id = :user_id ORDER BY kind, name ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Retrieve the user's categories applicable to `kind`, including those
/// marked as applying to both kinds.
pub fn get_categories_by_kind(
    user_id: UserId,
    kind: CategoryKind,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, name, kind, icon, color, user_id
             FROM category
             WHERE user_id = ?1 AND kind IN (?2, 'both')
             ORDER BY name ASC",
        )?
        .query_map((user_id, kind.as_str()), map_category_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Delete a category. Transactions that referenced it keep their history
/// with the category link cleared.
///
/// # Errors
/// Returns [Error::NotFound] if the category does not exist or belongs to
/// another user.
pub fn delete_category(
    category_id: CategoryId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_category_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let raw_kind: String = row.get(2)?;
    let kind = raw_kind.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind,
        icon: row.get(3)?,
        color: row.get(4)?,
        user_id: row.get(5)?,
    })
}

#[cfg(test)]
mod category_query_tests {
    use crate::{
        Error,
        category::{CategoryKind, NewCategory},
        test_utils::{create_second_user, create_test_user, get_test_connection},
    };

    use super::{
        create_category, delete_category, get_categories, get_categories_by_kind, get_category,
    };

    #[test]
    fn create_category_succeeds() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let category = create_category(
            NewCategory::new("Pets", CategoryKind::Expense),
            user.id,
            &conn,
        )
        .expect("Could not create category");

        assert!(category.id > 0);
        assert_eq!(category.name, "Pets");

        let fetched = get_category(category.id, user.id, &conn);

        assert_eq!(Ok(category), fetched);
    }

    #[test]
    fn create_category_rejects_empty_name() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = create_category(NewCategory::new("", CategoryKind::Both), user.id, &conn);

        assert_eq!(result, Err(Error::EmptyName));
    }

    #[test]
    fn get_categories_by_kind_includes_both() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_category(NewCategory::new("Gifts", CategoryKind::Both), user.id, &conn).unwrap();

        let income = get_categories_by_kind(user.id, CategoryKind::Income, &conn).unwrap();
        let expense = get_categories_by_kind(user.id, CategoryKind::Expense, &conn).unwrap();

        assert!(income.iter().any(|category| category.name == "Gifts"));
        assert!(expense.iter().any(|category| category.name == "Gifts"));
        // The seeded set has 4 income and 10 expense categories.
        assert_eq!(income.len(), 5);
        assert_eq!(expense.len(), 11);
    }

    #[test]
    fn categories_are_scoped_to_their_owner() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = create_second_user(&conn);
        let category = create_category(
            NewCategory::new("Secret", CategoryKind::Expense),
            owner.id,
            &conn,
        )
        .unwrap();

        assert_eq!(Err(Error::NotFound), get_category(category.id, other.id, &conn));
        assert!(
            get_categories(other.id, &conn)
                .unwrap()
                .iter()
                .all(|c| c.name != "Secret")
        );
    }

    #[test]
    fn delete_category_enforces_ownership() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = create_second_user(&conn);
        let category = create_category(
            NewCategory::new("Mine", CategoryKind::Expense),
            owner.id,
            &conn,
        )
        .unwrap();

        assert_eq!(Err(Error::NotFound), delete_category(category.id, other.id, &conn));
        assert_eq!(Ok(()), delete_category(category.id, owner.id, &conn));
    }
}
