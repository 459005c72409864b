//! Recurring bills: monthly obligations with their own per-month paid
//! tracking, distinct from the transactions they spawn when paid.

mod db;
mod domain;

pub use db::{
    BillTotals, PaymentOutcome, create_bill, create_bill_table, delete_bill, get_bill, get_bills,
    get_bills_by_kind, month_bill_totals, pay_bill, unmark_paid,
};
pub use domain::{BillId, BillStatus, NewBill, PaymentMap, PaymentMonth, RecurringBill, bill_status};
