//! Filtered queries over the transaction ledger.

use rusqlite::{Connection, types::Value};
use rust_decimal::Decimal;
use time::{Date, Month};

use crate::{
    Error,
    account::AccountId,
    category::CategoryId,
    transaction::{Transaction, TransactionKind, map_transaction_row},
    user::UserId,
};

/// The inclusive date range covering one calendar month.
///
/// # Errors
/// Returns [Error::InvalidMonth] if `month` is outside 1-12.
pub(crate) fn month_range(year: i32, month: u8) -> Result<(Date, Date), Error> {
    let month = Month::try_from(month).map_err(|_| Error::InvalidMonth(month))?;

    let start = Date::from_calendar_date(year, month, 1)
        .map_err(|error| Error::InvalidDate(error.to_string()))?;

    let next_month_start = match month {
        Month::December => Date::from_calendar_date(year + 1, Month::January, 1),
        _ => Date::from_calendar_date(year, month.next(), 1),
    }
    .map_err(|error| Error::InvalidDate(error.to_string()))?;

    let end = next_month_start
        .previous_day()
        .ok_or_else(|| Error::InvalidDate(format!("no last day for {year}-{month:?}")))?;

    Ok((start, end))
}

/// Criteria for selecting a user's transactions.
///
/// All fields are optional and combine with AND. A `month` without a `year`
/// is ignored, matching the web client's filter form.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransactionFilter {
    /// Only transactions within this year.
    pub year: Option<i32>,
    /// Only transactions within this month (1-12); requires `year`.
    pub month: Option<u8>,
    /// Only income or only expenses.
    pub kind: Option<TransactionKind>,
    /// Only transactions in this category.
    pub category_id: Option<CategoryId>,
    /// Only transactions on this account.
    pub account_id: Option<AccountId>,
    /// Only transactions whose description contains this text
    /// (case-insensitive).
    pub description_like: Option<String>,
    /// Only transactions on or after this date.
    pub date_from: Option<Date>,
    /// Only transactions on or before this date.
    pub date_to: Option<Date>,
    /// Only transactions of at least this amount.
    pub amount_min: Option<Decimal>,
    /// Only transactions of at most this amount.
    pub amount_max: Option<Decimal>,
    /// Return at most this many transactions.
    pub limit: Option<usize>,
}

impl TransactionFilter {
    /// A filter for one calendar month of a year.
    pub fn for_month(year: i32, month: u8) -> Self {
        Self {
            year: Some(year),
            month: Some(month),
            ..Self::default()
        }
    }

    /// A filter for a whole year.
    pub fn for_year(year: i32) -> Self {
        Self {
            year: Some(year),
            ..Self::default()
        }
    }
}

/// Get a user's transactions matching `filter`, newest first.
///
/// Date, kind, category, account, and description criteria are applied in
/// SQL; amount bounds are applied after the stored decimal strings are
/// parsed, so they never rely on lexicographic comparison.
///
/// # Errors
/// Returns [Error::InvalidMonth] for a month outside 1-12, or
/// [Error::SqlError] if the query fails.
pub fn get_transactions(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut clauses = vec!["user_id = ?1".to_owned()];
    let mut params = vec![Value::Integer(user_id)];

    if let Some(year) = filter.year {
        let (start, end) = match filter.month {
            Some(month) => month_range(year, month)?,
            None => (year_start(year)?, year_end(year)?),
        };

        clauses.push(format!("date BETWEEN ?{} AND ?{}", params.len() + 1, params.len() + 2));
        params.push(Value::Text(start.to_string()));
        params.push(Value::Text(end.to_string()));
    }

    if let Some(kind) = filter.kind {
        clauses.push(format!("kind = ?{}", params.len() + 1));
        params.push(Value::Text(kind.as_str().to_owned()));
    }

    if let Some(category_id) = filter.category_id {
        clauses.push(format!("category_id = ?{}", params.len() + 1));
        params.push(Value::Integer(category_id));
    }

    if let Some(account_id) = filter.account_id {
        clauses.push(format!("account_id = ?{}", params.len() + 1));
        params.push(Value::Integer(account_id));
    }

    if let Some(ref text) = filter.description_like {
        clauses.push(format!("description LIKE ?{}", params.len() + 1));
        params.push(Value::Text(format!("%{}%", text.trim())));
    }

    if let Some(date_from) = filter.date_from {
        clauses.push(format!("date >= ?{}", params.len() + 1));
        params.push(Value::Text(date_from.to_string()));
    }

    if let Some(date_to) = filter.date_to {
        clauses.push(format!("date <= ?{}", params.len() + 1));
        params.push(Value::Text(date_to.to_string()));
    }

    // Sort by date, and then ID to keep transaction order stable after
    // updates.
    let query = format!(
        "SELECT id, kind, amount, date, description, account_id, category_id, receipt_url, user_id
         FROM \"transaction\" WHERE {} ORDER BY date DESC, id DESC",
        clauses.join(" AND ")
    );

    let mut transactions = connection
        .prepare(&query)?
        .query_map(rusqlite::params_from_iter(params), map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(amount_min) = filter.amount_min {
        transactions.retain(|transaction| transaction.amount >= amount_min);
    }

    if let Some(amount_max) = filter.amount_max {
        transactions.retain(|transaction| transaction.amount <= amount_max);
    }

    if let Some(limit) = filter.limit {
        transactions.truncate(limit);
    }

    Ok(transactions)
}

/// How many rows a search returns at most.
pub const SEARCH_RESULT_LIMIT: usize = 100;

/// Free-form transaction search: [get_transactions] with the result count
/// capped at [SEARCH_RESULT_LIMIT], whatever the filter asks for.
pub fn search_transactions(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let capped = TransactionFilter {
        limit: Some(
            filter
                .limit
                .map_or(SEARCH_RESULT_LIMIT, |limit| limit.min(SEARCH_RESULT_LIMIT)),
        ),
        ..filter.clone()
    };

    get_transactions(user_id, &capped, connection)
}

fn year_start(year: i32) -> Result<Date, Error> {
    Date::from_calendar_date(year, Month::January, 1)
        .map_err(|error| Error::InvalidDate(error.to_string()))
}

fn year_end(year: i32) -> Result<Date, Error> {
    Date::from_calendar_date(year, Month::December, 31)
        .map_err(|error| Error::InvalidDate(error.to_string()))
}

#[cfg(test)]
mod month_range_tests {
    use time::macros::date;

    use crate::Error;

    use super::month_range;

    #[test]
    fn covers_whole_month() {
        let (start, end) = month_range(2026, 3).unwrap();

        assert_eq!(start, date!(2026 - 03 - 01));
        assert_eq!(end, date!(2026 - 03 - 31));
    }

    #[test]
    fn handles_leap_february() {
        let (_, end) = month_range(2024, 2).unwrap();

        assert_eq!(end, date!(2024 - 02 - 29));
    }

    #[test]
    fn rejects_month_out_of_range() {
        assert_eq!(month_range(2026, 13), Err(Error::InvalidMonth(13)));
        assert_eq!(month_range(2026, 0), Err(Error::InvalidMonth(0)));
    }
}
