//! Decimal helpers for monetary amounts.
//!
//! Amounts are stored in SQLite as canonical decimal strings and summed in
//! Rust after parsing, so totals never drift and comparisons are exact.

use rust_decimal::Decimal;

use crate::Error;

/// Parse a stored or user-supplied amount string.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `text` is not a decimal number.
pub fn parse_amount(text: &str) -> Result<Decimal, Error> {
    text.trim()
        .parse::<Decimal>()
        .map_err(|_| Error::InvalidAmount(text.to_owned()))
}

/// Reject amounts that are not strictly positive.
///
/// # Errors
/// Returns [Error::InvalidAmount] if `amount` is zero or negative.
pub fn require_positive(amount: Decimal) -> Result<Decimal, Error> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(amount.to_string()));
    }

    Ok(amount)
}

/// The share of `whole` taken by `part`, as a percentage clamped to
/// [0, 100] and rounded to one decimal place.
///
/// A non-positive `whole` yields 0 rather than a division error, so an
/// unset budget limit or goal target reads as "nothing consumed".
pub fn percentage(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }

    let percent = (part / whole * Decimal::ONE_HUNDRED).round_dp(1);

    percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
}

/// Format an amount with exactly two decimal places, e.g. for CSV export.
pub fn format_amount(amount: Decimal) -> String {
    format!("{amount:.2}")
}

/// Read a decimal TEXT column from a row.
///
/// A stored amount that fails to parse is a corrupted row, surfaced as a
/// conversion failure on the offending column.
pub(crate) fn read_amount(row: &rusqlite::Row, index: usize) -> Result<Decimal, rusqlite::Error> {
    let text: String = row.get(index)?;

    text.parse::<Decimal>().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(error),
        )
    })
}
