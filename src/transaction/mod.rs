//! The transaction ledger: every income and expense a user records, plus
//! the tag links and filtered queries everything else derives from.

mod core;
mod query;
mod tags;

pub use core::{
    Transaction, TransactionBuilder, TransactionId, TransactionKind, attach_receipt,
    count_transactions, create_transaction, create_transaction_tables, delete_transaction,
    get_transaction, update_transaction,
};
pub(crate) use core::{map_transaction_row, validate_account, validate_category};
pub use query::{SEARCH_RESULT_LIMIT, TransactionFilter, get_transactions, search_transactions};
pub use tags::{get_transaction_tags, set_transaction_tags};
