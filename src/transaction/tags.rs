//! The many-to-many link between transactions and tags.

use rusqlite::{Connection, Transaction as SqlTransaction};

use crate::{
    Error,
    tag::{Tag, TagId, TagName},
    transaction::TransactionId,
    user::UserId,
};

/// Replace the set of tags on a transaction.
///
/// Tag ids that do not refer to the caller's own tags are silently dropped,
/// so a stale picker selection degrades to "fewer tags" rather than an
/// error. The returned vector is the set that was actually applied.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist or belongs
/// to another user.
pub fn set_transaction_tags(
    transaction_id: TransactionId,
    user_id: UserId,
    tag_ids: &[TagId],
    connection: &Connection,
) -> Result<Vec<Tag>, Error> {
    let owns_transaction: bool = connection.query_row(
        "SELECT EXISTS (SELECT 1 FROM \"transaction\" WHERE id = ?1 AND user_id = ?2)",
        (transaction_id, user_id),
        |row| row.get(0),
    )?;

    if !owns_transaction {
        return Err(Error::NotFound);
    }

    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    sql_transaction.execute(
        "DELETE FROM transaction_tag WHERE transaction_id = ?1",
        [transaction_id],
    )?;

    for tag_id in tag_ids {
        // The ownership filter is part of the insert, so foreign tags are
        // skipped without a separate lookup.
        sql_transaction.execute(
            "INSERT OR IGNORE INTO transaction_tag (transaction_id, tag_id)
             SELECT ?1, id FROM tag WHERE id = ?2 AND user_id = ?3",
            (transaction_id, tag_id, user_id),
        )?;
    }

    sql_transaction.commit()?;

    get_transaction_tags(transaction_id, user_id, connection)
}

/// The tags currently attached to a transaction, ordered by name.
pub fn get_transaction_tags(
    transaction_id: TransactionId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Vec<Tag>, Error> {
    connection
        .prepare(
            "SELECT tag.id, tag.name, tag.color, tag.user_id FROM tag
             INNER JOIN transaction_tag ON transaction_tag.tag_id = tag.id
             WHERE transaction_tag.transaction_id = :transaction_id
               AND tag.user_id = :user_id
             ORDER BY tag.name ASC",
        )?
        .query_map(
            &[(":transaction_id", &transaction_id), (":user_id", &user_id)],
            |row| {
                let raw_name: String = row.get(1)?;

                Ok(Tag {
                    id: row.get(0)?,
                    name: TagName::new_unchecked(&raw_name),
                    color: row.get(2)?,
                    user_id: row.get(3)?,
                })
            },
        )?
        .map(|maybe_tag| maybe_tag.map_err(|error| error.into()))
        .collect()
}
