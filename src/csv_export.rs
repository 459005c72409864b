//! CSV export of the transaction ledger, plus the matching strict reader.
//!
//! The export uses `dd/mm/yyyy` dates and exactly-two-decimal amounts, so
//! a file can be re-parsed into the same set of rows it was written from.

use std::io::{Read, Write};

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    Error,
    account::get_accounts,
    category::get_categories,
    money,
    report::UNCATEGORIZED_LABEL,
    transaction::{TransactionFilter, TransactionKind, get_transactions},
    user::UserId,
};

/// The export's column headers, in order.
pub const CSV_HEADERS: [&str; 6] = ["Date", "Type", "Amount", "Category", "Account", "Description"];

/// Date format used in exports, e.g. `05/03/2026`.
const DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[day]/[month]/[year]");

/// One row of an exported (or re-parsed) CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct CsvRecord {
    /// When the transaction happened.
    pub date: Date,
    /// Whether the transaction was income or an expense.
    pub kind: TransactionKind,
    /// The amount of money moved.
    pub amount: Decimal,
    /// The category name, or [UNCATEGORIZED_LABEL].
    pub category: String,
    /// The account name, or an empty string.
    pub account: String,
    /// The transaction's description.
    pub description: String,
}

/// Write a user's transactions as CSV, newest first, optionally narrowed
/// to a year or a year and month.
///
/// # Errors
/// Returns [Error::InvalidMonth] for a month outside 1-12, or
/// [Error::InvalidCsv] if writing fails.
pub fn export_transactions<W: Write>(
    user_id: UserId,
    year: Option<i32>,
    month: Option<u8>,
    connection: &Connection,
    writer: W,
) -> Result<(), Error> {
    let filter = TransactionFilter {
        year,
        month,
        ..TransactionFilter::default()
    };

    let transactions = get_transactions(user_id, &filter, connection)?;

    let category_names: std::collections::HashMap<_, _> = get_categories(user_id, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();
    let account_names: std::collections::HashMap<_, _> = get_accounts(user_id, connection)?
        .into_iter()
        .map(|account| (account.id, account.name))
        .collect();

    let mut csv_writer = csv::Writer::from_writer(writer);

    csv_writer
        .write_record(CSV_HEADERS)
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    for transaction in transactions {
        let date = transaction
            .date
            .format(DATE_FORMAT)
            .map_err(|error| Error::InvalidDate(error.to_string()))?;

        let category = transaction
            .category_id
            .and_then(|category_id| category_names.get(&category_id))
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED_LABEL);

        let account = transaction
            .account_id
            .and_then(|account_id| account_names.get(&account_id))
            .map(String::as_str)
            .unwrap_or("");

        csv_writer
            .write_record([
                date.as_str(),
                transaction.kind.as_str(),
                &money::format_amount(transaction.amount),
                category,
                account,
                &transaction.description,
            ])
            .map_err(|error| Error::InvalidCsv(error.to_string()))?;
    }

    csv_writer
        .flush()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?;

    Ok(())
}

/// Parse CSV data previously produced by [export_transactions].
///
/// Parsing is strict: a wrong header row, a malformed date or amount, or
/// an unknown transaction type is an error rather than a skipped row.
///
/// # Errors
/// Returns [Error::InvalidCsv] describing the first problem found.
pub fn read_transactions_csv<R: Read>(reader: R) -> Result<Vec<CsvRecord>, Error> {
    let mut csv_reader = csv::Reader::from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|error| Error::InvalidCsv(error.to_string()))?
        .clone();

    if headers != *CSV_HEADERS.as_slice() {
        return Err(Error::InvalidCsv(format!(
            "expected headers {CSV_HEADERS:?}, got {headers:?}"
        )));
    }

    let mut records = Vec::new();

    for (line, result) in csv_reader.records().enumerate() {
        let record = result.map_err(|error| Error::InvalidCsv(error.to_string()))?;

        if record.len() != CSV_HEADERS.len() {
            return Err(Error::InvalidCsv(format!(
                "row {} has {} fields, expected {}",
                line + 1,
                record.len(),
                CSV_HEADERS.len()
            )));
        }

        let date = Date::parse(&record[0], DATE_FORMAT)
            .map_err(|_| Error::InvalidCsv(format!("bad date \"{}\"", &record[0])))?;
        let kind: TransactionKind = record[1]
            .parse()
            .map_err(|_| Error::InvalidCsv(format!("bad transaction type \"{}\"", &record[1])))?;
        let amount: Decimal = record[2]
            .parse()
            .map_err(|_| Error::InvalidCsv(format!("bad amount \"{}\"", &record[2])))?;

        records.push(CsvRecord {
            date,
            kind,
            amount,
            category: record[3].to_owned(),
            account: record[4].to_owned(),
            description: record[5].to_owned(),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod export_tests {
    use time::macros::date;

    use crate::{
        account::{AccountKind, NewAccount, create_account},
        category::{CategoryKind, NewCategory, create_category},
        report::UNCATEGORIZED_LABEL,
        test_utils::{create_test_user, dec, get_test_connection},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{CsvRecord, export_transactions, read_transactions_csv};

    #[test]
    fn export_round_trips_through_the_reader() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let food = create_category(
            NewCategory::new("Extra Food", CategoryKind::Expense),
            user.id,
            &conn,
        )
        .unwrap();
        let account =
            create_account(NewAccount::new("Everyday", AccountKind::Checking), user.id, &conn)
                .unwrap();

        create_transaction(
            Transaction::build(
                TransactionKind::Expense,
                dec("12.3"),
                date!(2026 - 03 - 05),
                "Lunch",
            )
            .category_id(Some(food.id))
            .account_id(Some(account.id)),
            user.id,
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(
                TransactionKind::Income,
                dec("1500"),
                date!(2026 - 03 - 01),
                "Pay",
            ),
            user.id,
            &conn,
        )
        .unwrap();
        // Outside the requested month, so not exported.
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("99"), date!(2026 - 04 - 01), ""),
            user.id,
            &conn,
        )
        .unwrap();

        let mut buffer = Vec::new();
        export_transactions(user.id, Some(2026), Some(3), &conn, &mut buffer).unwrap();

        let records = read_transactions_csv(buffer.as_slice()).unwrap();

        assert_eq!(
            records,
            vec![
                CsvRecord {
                    date: date!(2026 - 03 - 05),
                    kind: TransactionKind::Expense,
                    amount: dec("12.30"),
                    category: "Extra Food".to_owned(),
                    account: "Everyday".to_owned(),
                    description: "Lunch".to_owned(),
                },
                CsvRecord {
                    date: date!(2026 - 03 - 01),
                    kind: TransactionKind::Income,
                    amount: dec("1500.00"),
                    category: UNCATEGORIZED_LABEL.to_owned(),
                    account: String::new(),
                    description: "Pay".to_owned(),
                },
            ]
        );
    }

    #[test]
    fn amounts_are_formatted_with_two_decimal_places() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("150"), date!(2026 - 03 - 05), ""),
            user.id,
            &conn,
        )
        .unwrap();

        let mut buffer = Vec::new();
        export_transactions(user.id, None, None, &conn, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();

        assert!(text.contains("150.00"), "export should contain 150.00: {text}");
        assert!(text.contains("05/03/2026"), "dates use dd/mm/yyyy: {text}");
    }

    #[test]
    fn month_without_year_is_ignored() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("1"), date!(2026 - 03 - 05), ""),
            user.id,
            &conn,
        )
        .unwrap();

        let mut buffer = Vec::new();
        export_transactions(user.id, None, Some(12), &conn, &mut buffer).unwrap();

        let records = read_transactions_csv(buffer.as_slice()).unwrap();
        assert_eq!(records.len(), 1);
    }
}
