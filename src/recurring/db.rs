//! Database operations for recurring bills, including the atomic
//! pay-and-mirror operation.

use rusqlite::{Connection, Row, Transaction as SqlTransaction};
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error, money,
    recurring::{BillId, NewBill, PaymentMap, PaymentMonth, RecurringBill},
    transaction::{
        Transaction, TransactionKind, create_transaction, validate_account, validate_category,
    },
    user::UserId,
};

/// Create the recurring bill table and its indexes.
pub fn create_bill_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS recurring_bill (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            amount TEXT NOT NULL,
            kind TEXT NOT NULL,
            due_day INTEGER NOT NULL CHECK (due_day BETWEEN 1 AND 31),
            category_id INTEGER,
            account_id INTEGER,
            active INTEGER NOT NULL DEFAULT 1,
            payments TEXT NOT NULL DEFAULT '{}',
            user_id INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE ON DELETE SET NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_recurring_bill_user ON recurring_bill(user_id);",
    )?;

    Ok(())
}

/// Create a recurring bill and return it with its generated ID.
///
/// # Errors
/// This function will return an:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidAmount] if the amount is zero or negative,
/// - [Error::InvalidDayOfMonth] if the due day is outside 1-31,
/// - [Error::InvalidAccount] / [Error::InvalidCategory] if a linked id does
///   not refer to one of the user's rows.
pub fn create_bill(
    new_bill: NewBill,
    user_id: UserId,
    connection: &Connection,
) -> Result<RecurringBill, Error> {
    let name = new_bill.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    money::require_positive(new_bill.amount)?;

    if !(1..=31).contains(&new_bill.due_day) {
        return Err(Error::InvalidDayOfMonth(new_bill.due_day));
    }

    validate_account(new_bill.account_id, user_id, connection)?;
    validate_category(new_bill.category_id, user_id, connection)?;

    connection.execute(
        "INSERT INTO recurring_bill (name, amount, kind, due_day, category_id, account_id, active, payments, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, '{}', ?7)",
        (
            name,
            new_bill.amount.to_string(),
            new_bill.kind.as_str(),
            new_bill.due_day,
            new_bill.category_id,
            new_bill.account_id,
            user_id,
        ),
    )?;

    Ok(RecurringBill {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        amount: new_bill.amount,
        kind: new_bill.kind,
        due_day: new_bill.due_day,
        category_id: new_bill.category_id,
        account_id: new_bill.account_id,
        active: true,
        payments: PaymentMap::new(),
        user_id,
    })
}

/// Retrieve a single bill owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to
/// another user, and [Error::InvalidPaymentMap] if its stored payment map
/// is corrupted.
pub fn get_bill(bill_id: BillId, user_id: UserId, connection: &Connection) -> Result<RecurringBill, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, kind, due_day, category_id, account_id, active, payments, user_id
             FROM recurring_bill WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &bill_id), (":user_id", &user_id)], map_bill_row)
        .map_err(unwrap_payment_map_error)
}

/// Retrieve all of a user's bills ordered by due day.
pub fn get_bills(user_id: UserId, connection: &Connection) -> Result<Vec<RecurringBill>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, kind, due_day, category_id, account_id, active, payments, user_id
             FROM recurring_bill WHERE user_id = :user_id ORDER BY due_day ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_bill_row)?
        .map(|maybe_bill| maybe_bill.map_err(unwrap_payment_map_error))
        .collect()
}

/// Retrieve the user's bills of one kind (the income and expense lists are
/// shown separately), ordered by due day.
pub fn get_bills_by_kind(
    user_id: UserId,
    kind: TransactionKind,
    connection: &Connection,
) -> Result<Vec<RecurringBill>, Error> {
    connection
        .prepare(
            "SELECT id, name, amount, kind, due_day, category_id, account_id, active, payments, user_id
             FROM recurring_bill WHERE user_id = ?1 AND kind = ?2 ORDER BY due_day ASC",
        )?
        .query_map((user_id, kind.as_str()), map_bill_row)?
        .map(|maybe_bill| maybe_bill.map_err(unwrap_payment_map_error))
        .collect()
}

/// Delete a bill. The transactions it spawned are ordinary ledger rows and
/// are kept.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to
/// another user.
pub fn delete_bill(bill_id: BillId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM recurring_bill WHERE id = ?1 AND user_id = ?2",
        (bill_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// What happened when a bill was paid.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    /// The month was marked paid and the mirroring transaction inserted.
    Paid(Transaction),
    /// The month was already marked paid; nothing was written.
    ///
    /// Re-paying is a no-op by design: the paid flag stays true and no
    /// second mirrored transaction appears.
    AlreadyPaid,
}

/// Pay a bill for the month `today` falls in.
///
/// Marks the month paid and inserts a transaction mirroring the bill's
/// kind, amount, category, and account, as one unit: a failure on either
/// write rolls back both.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to
/// another user.
pub fn pay_bill(
    bill_id: BillId,
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<PaymentOutcome, Error> {
    let sql_transaction =
        SqlTransaction::new_unchecked(connection, rusqlite::TransactionBehavior::Immediate)?;

    let mut bill = get_bill(bill_id, user_id, &sql_transaction)?;
    let month = PaymentMonth::from_date(today);

    if bill.payments.is_paid(month) {
        return Ok(PaymentOutcome::AlreadyPaid);
    }

    bill.payments.set_paid(month, true);

    sql_transaction.execute(
        "UPDATE recurring_bill SET payments = ?1 WHERE id = ?2 AND user_id = ?3",
        (bill.payments.to_json()?, bill_id, user_id),
    )?;

    let mirrored = create_transaction(
        Transaction::build(
            bill.kind,
            bill.amount,
            today,
            &format!("Recurring: {}", bill.name),
        )
        .account_id(bill.account_id)
        .category_id(bill.category_id),
        user_id,
        &sql_transaction,
    )?;

    sql_transaction.commit()?;

    Ok(PaymentOutcome::Paid(mirrored))
}

/// Clear the paid flag for one month, e.g. after marking the wrong bill.
///
/// The mirrored transaction, if any, is an ordinary ledger row; deleting it
/// is a separate, explicit decision.
///
/// # Errors
/// Returns [Error::NotFound] if the bill does not exist or belongs to
/// another user.
pub fn unmark_paid(
    bill_id: BillId,
    user_id: UserId,
    month: PaymentMonth,
    connection: &Connection,
) -> Result<(), Error> {
    let mut bill = get_bill(bill_id, user_id, connection)?;

    bill.payments.set_paid(month, false);

    connection.execute(
        "UPDATE recurring_bill SET payments = ?1 WHERE id = ?2 AND user_id = ?3",
        (bill.payments.to_json()?, bill_id, user_id),
    )?;

    Ok(())
}

/// The month's committed/paid/outstanding totals over a user's active
/// bills of one kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BillTotals {
    /// The sum of every active bill's amount.
    pub total: Decimal,
    /// The part already marked paid for the month.
    pub paid: Decimal,
    /// The part still outstanding.
    pub pending: Decimal,
}

/// Total up the user's active bills of `kind` for one month.
pub fn month_bill_totals(
    user_id: UserId,
    kind: TransactionKind,
    month: PaymentMonth,
    connection: &Connection,
) -> Result<BillTotals, Error> {
    let mut total = Decimal::ZERO;
    let mut paid = Decimal::ZERO;

    for bill in get_bills_by_kind(user_id, kind, connection)? {
        if !bill.active {
            continue;
        }

        total += bill.amount;

        if bill.payments.is_paid(month) {
            paid += bill.amount;
        }
    }

    Ok(BillTotals {
        total,
        paid,
        pending: total - paid,
    })
}

fn map_bill_row(row: &Row) -> Result<RecurringBill, rusqlite::Error> {
    let raw_kind: String = row.get(3)?;
    let kind = raw_kind.parse().map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(error))
    })?;

    let raw_payments: String = row.get(8)?;
    let payments = PaymentMap::from_json(&raw_payments).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(error))
    })?;

    Ok(RecurringBill {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: money::read_amount(row, 2)?,
        kind,
        due_day: row.get(4)?,
        category_id: row.get(5)?,
        account_id: row.get(6)?,
        active: row.get(7)?,
        payments,
        user_id: row.get(9)?,
    })
}

/// Surface a payment-map parse failure as [Error::InvalidPaymentMap]
/// instead of a generic SQL conversion error.
fn unwrap_payment_map_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::FromSqlConversionFailure(8, _, boxed) => {
            match boxed.downcast::<Error>() {
                Ok(inner) => *inner,
                Err(other) => Error::SqlError(rusqlite::Error::FromSqlConversionFailure(
                    8,
                    rusqlite::types::Type::Text,
                    other,
                )),
            }
        }
        error => error.into(),
    }
}
