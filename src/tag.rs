//! Tags for cross-cutting labels on transactions (e.g. "Vacation",
//! "Tax-deductible"). Unlike categories, a transaction can carry any number
//! of tags.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserId};

/// A validated, non-empty tag name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct TagName(String);

impl TagName {
    /// Create a tag name.
    ///
    /// # Errors
    /// Returns [Error::EmptyName] if `name` is empty or whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a tag name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for TagName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TagName::new(s)
    }
}

impl Display for TagName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier for a tag.
pub type TagId = i64;

/// A label a user can attach to any number of transactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct Tag {
    /// The ID of the tag.
    pub id: TagId,
    /// The tag's display name.
    pub name: TagName,
    /// Display color as a hex string.
    pub color: String,
    /// The user that owns the tag.
    pub user_id: UserId,
}

/// Create the tag table and its indexes.
pub fn create_tag_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS tag (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_tag_user ON tag(user_id);",
    )?;

    Ok(())
}

/// Create a tag and return it with its generated ID.
pub fn create_tag(
    name: TagName,
    color: &str,
    user_id: UserId,
    connection: &Connection,
) -> Result<Tag, Error> {
    connection.execute(
        "INSERT INTO tag (name, color, user_id) VALUES (?1, ?2, ?3)",
        (name.as_ref(), color, user_id),
    )?;

    Ok(Tag {
        id: connection.last_insert_rowid(),
        name,
        color: color.to_owned(),
        user_id,
    })
}

/// Retrieve a single tag owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the tag does not exist or belongs to
/// another user.
pub fn get_tag(tag_id: TagId, user_id: UserId, connection: &Connection) -> Result<Tag, Error> {
    connection
        .prepare("SELECT id, name, color, user_id FROM tag WHERE id = :id AND user_id = :user_id")?
        .query_one(&[(":id", &tag_id), (":user_id", &user_id)], map_tag_row)
        .map_err(|error| error.into())
}

/// Retrieve all of a user's tags ordered alphabetically by name.
pub fn get_tags(user_id: UserId, connection: &Connection) -> Result<Vec<Tag>, Error> {
    connection
        .prepare("SELECT id, name, color, user_id FROM tag WHERE user_id = :user_id ORDER BY name ASC")?
        .query_map(&[(":user_id", &user_id)], map_tag_row)?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}

/// Update a tag's name and color.
///
/// # Errors
/// Returns [Error::NotFound] if the tag does not exist or belongs to
/// another user.
pub fn update_tag(
    tag_id: TagId,
    new_name: TagName,
    new_color: &str,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE tag SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4",
        (new_name.as_ref(), new_color, tag_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Delete a tag, removing it from any transactions that carried it.
///
/// # Errors
/// Returns [Error::NotFound] if the tag does not exist or belongs to
/// another user.
pub fn delete_tag(tag_id: TagId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM tag WHERE id = ?1 AND user_id = ?2",
        (tag_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

fn map_tag_row(row: &Row) -> Result<Tag, rusqlite::Error> {
    let raw_name: String = row.get(1)?;

    Ok(Tag {
        id: row.get(0)?,
        name: TagName::new_unchecked(&raw_name),
        color: row.get(2)?,
        user_id: row.get(3)?,
    })
}
