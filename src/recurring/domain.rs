//! Core recurring-bill domain types and the status derivation.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, account::AccountId, category::CategoryId, transaction::TransactionKind, user::UserId,
};

/// Database identifier for a recurring bill.
pub type BillId = i64;

/// The state of a bill for the current calendar day.
///
/// There is no stored state: the status is derived from today's date, the
/// bill's due day, and the paid flag for the current month, every time it
/// is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillStatus {
    /// The bill is marked paid for the current month.
    Paid,
    /// The due day has passed without payment.
    Overdue,
    /// The due day is within the next three days (or is today).
    Upcoming,
    /// Nothing due soon.
    Pending,
}

/// One calendar month of one year, the key a bill's payments are tracked
/// under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PaymentMonth {
    /// The calendar year.
    pub year: i32,
    /// The calendar month, 1-12.
    pub month: u8,
}

impl PaymentMonth {
    /// Create a payment month.
    ///
    /// # Errors
    /// Returns [Error::InvalidMonth] if `month` is outside 1-12.
    pub fn new(year: i32, month: u8) -> Result<Self, Error> {
        if !(1..=12).contains(&month) {
            return Err(Error::InvalidMonth(month));
        }

        Ok(Self { year, month })
    }

    /// The payment month a date falls in.
    pub fn from_date(date: Date) -> Self {
        Self {
            year: date.year(),
            month: u8::from(date.month()),
        }
    }
}

impl Display for PaymentMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for PaymentMonth {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::InvalidPaymentMap(format!("bad month key \"{s}\""));

        let (raw_year, raw_month) = s.split_once('-').ok_or_else(malformed)?;
        let year: i32 = raw_year.parse().map_err(|_| malformed())?;
        let month: u8 = raw_month.parse().map_err(|_| malformed())?;

        PaymentMonth::new(year, month).map_err(|_| malformed())
    }
}

/// A bill's paid/unpaid flags keyed by payment month.
///
/// Persisted as a JSON object with `"YYYY-MM"` keys. Parsing is strict:
/// malformed keys or non-boolean values are an error, never an empty map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentMap(BTreeMap<PaymentMonth, bool>);

impl PaymentMap {
    /// An empty map: no month has ever been marked.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the stored JSON form.
    ///
    /// # Errors
    /// Returns [Error::InvalidPaymentMap] if `text` is not a JSON object of
    /// `"YYYY-MM": bool` entries.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let object: BTreeMap<String, bool> = serde_json::from_str(text)
            .map_err(|error| Error::InvalidPaymentMap(error.to_string()))?;

        let mut map = BTreeMap::new();

        for (key, paid) in object {
            map.insert(key.parse::<PaymentMonth>()?, paid);
        }

        Ok(Self(map))
    }

    /// Serialize to the stored JSON form with canonical `"YYYY-MM"` keys.
    ///
    /// # Errors
    /// Returns [Error::InvalidPaymentMap] if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        let object: BTreeMap<String, bool> = self
            .0
            .iter()
            .map(|(month, paid)| (month.to_string(), *paid))
            .collect();

        serde_json::to_string(&object).map_err(|error| Error::InvalidPaymentMap(error.to_string()))
    }

    /// Whether the bill is marked paid for `month`. Unrecorded months read
    /// as unpaid.
    pub fn is_paid(&self, month: PaymentMonth) -> bool {
        self.0.get(&month).copied().unwrap_or(false)
    }

    /// Record the paid flag for `month`.
    pub fn set_paid(&mut self, month: PaymentMonth, paid: bool) {
        self.0.insert(month, paid);
    }
}

/// A template for a monthly obligation.
#[derive(Debug, Clone, PartialEq)]
pub struct RecurringBill {
    /// The ID of the bill.
    pub id: BillId,
    /// The bill's display name.
    pub name: String,
    /// The amount due each month.
    pub amount: Decimal,
    /// Whether paying the bill records income or an expense.
    pub kind: TransactionKind,
    /// The day of the month (1-31) the bill falls due.
    pub due_day: u8,
    /// The category for spawned transactions, if any.
    pub category_id: Option<CategoryId>,
    /// The account for spawned transactions, if any.
    pub account_id: Option<AccountId>,
    /// Whether the bill is still in use.
    pub active: bool,
    /// The per-month paid flags.
    pub payments: PaymentMap,
    /// The user that owns the bill.
    pub user_id: UserId,
}

/// The fields needed to create a recurring bill.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBill {
    /// The bill's display name.
    pub name: String,
    /// The amount due each month.
    pub amount: Decimal,
    /// Whether paying the bill records income or an expense.
    pub kind: TransactionKind,
    /// The day of the month (1-31) the bill falls due.
    pub due_day: u8,
    /// The category for spawned transactions.
    pub category_id: Option<CategoryId>,
    /// The account for spawned transactions.
    pub account_id: Option<AccountId>,
}

impl NewBill {
    /// Create a bill definition. Most bills are expenses; pass
    /// [TransactionKind::Income] for things like a fixed salary.
    pub fn new(name: &str, amount: Decimal, kind: TransactionKind, due_day: u8) -> Self {
        Self {
            name: name.to_owned(),
            amount,
            kind,
            due_day,
            category_id: None,
            account_id: None,
        }
    }

    /// Set the category for spawned transactions.
    pub fn category_id(mut self, category_id: Option<CategoryId>) -> Self {
        self.category_id = category_id;
        self
    }

    /// Set the account for spawned transactions.
    pub fn account_id(mut self, account_id: Option<AccountId>) -> Self {
        self.account_id = account_id;
        self
    }
}

/// Derive a bill's status for `today`.
///
/// The paid flag for the current month wins regardless of the date; after
/// that the due day decides between overdue, upcoming (within three days,
/// including the due day itself), and pending.
pub fn bill_status(bill: &RecurringBill, today: Date) -> BillStatus {
    if bill.payments.is_paid(PaymentMonth::from_date(today)) {
        return BillStatus::Paid;
    }

    let day = today.day();

    if day > bill.due_day {
        BillStatus::Overdue
    } else if bill.due_day - day <= 3 {
        BillStatus::Upcoming
    } else {
        BillStatus::Pending
    }
}
