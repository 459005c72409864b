//! Core account domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Error, user::UserId};

/// Database identifier for an account.
pub type AccountId = i64;

/// The kind of money container an account represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    /// An everyday bank account.
    Checking,
    /// A savings account.
    Savings,
    /// The spending account linked to a credit card.
    Card,
    /// Physical cash.
    Cash,
    /// An investment or brokerage account.
    Investment,
}

impl AccountKind {
    /// The kind's stored string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountKind::Checking => "checking",
            AccountKind::Savings => "savings",
            AccountKind::Card => "card",
            AccountKind::Cash => "cash",
            AccountKind::Investment => "investment",
        }
    }

    /// A human-readable label for the kind.
    pub fn label(&self) -> &'static str {
        match self {
            AccountKind::Checking => "Checking Account",
            AccountKind::Savings => "Savings Account",
            AccountKind::Card => "Credit Card",
            AccountKind::Cash => "Cash",
            AccountKind::Investment => "Investment",
        }
    }
}

impl FromStr for AccountKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "checking" => Ok(AccountKind::Checking),
            "savings" => Ok(AccountKind::Savings),
            "card" => Ok(AccountKind::Card),
            "cash" => Ok(AccountKind::Cash),
            "investment" => Ok(AccountKind::Investment),
            other => Err(Error::InvalidAccountKind(other.to_owned())),
        }
    }
}

impl Display for AccountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A money container owned by a user.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// The ID of the account.
    pub id: AccountId,
    /// The account's display name.
    pub name: String,
    /// What kind of container the account is.
    pub kind: AccountKind,
    /// The balance the account started with before any transactions.
    pub initial_balance: Decimal,
    /// Display color as a hex string.
    pub color: String,
    /// Display icon name.
    pub icon: String,
    /// Whether the account is shown in pickers and totals.
    pub active: bool,
    /// The user that owns the account.
    pub user_id: UserId,
}

/// The fields needed to create or update an account.
///
/// Display metadata defaults match the web client's pickers.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    /// The account's display name.
    pub name: String,
    /// What kind of container the account is.
    pub kind: AccountKind,
    /// The balance the account starts with.
    pub initial_balance: Decimal,
    /// Display color as a hex string.
    pub color: String,
    /// Display icon name.
    pub icon: String,
}

impl NewAccount {
    /// Create an account definition with a zero starting balance and
    /// default display metadata.
    pub fn new(name: &str, kind: AccountKind) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            initial_balance: Decimal::ZERO,
            color: "#7c5cfc".to_owned(),
            icon: "fa-wallet".to_owned(),
        }
    }

    /// Set the starting balance.
    pub fn initial_balance(mut self, initial_balance: Decimal) -> Self {
        self.initial_balance = initial_balance;
        self
    }

    /// Set the display color.
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }

    /// Set the display icon.
    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_owned();
        self
    }
}
