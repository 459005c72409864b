//! Accounts that transactions are recorded against.
//!
//! An account's balance is never stored: it is derived from the initial
//! balance and the account's transactions on every read.

mod db;
mod domain;

pub use db::{
    account_balance, create_account, create_account_table, delete_account, get_account,
    get_accounts, get_active_accounts, total_balance, update_account,
};
pub use domain::{Account, AccountId, AccountKind, NewAccount};
