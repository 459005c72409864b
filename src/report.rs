//! Read-time aggregation over the ledger: dashboard summaries, annual
//! reports, the financial calendar, and profile statistics.
//!
//! Everything here is recomputed from the transaction rows on each call;
//! nothing is cached or persisted.

use std::collections::{BTreeMap, HashMap};

use rusqlite::Connection;
use rust_decimal::Decimal;
use time::Date;

use crate::{
    Error,
    account::get_accounts,
    category::get_categories,
    goal::get_completed_goals,
    recurring::{BillStatus, RecurringBill, bill_status, get_bills},
    transaction::{Transaction, TransactionFilter, TransactionKind, get_transactions},
    user::UserId,
};

/// The label expense groupings use for transactions without a category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// Income and expense totals for a set of transactions.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSummary {
    /// The sum of income amounts.
    pub income: Decimal,
    /// The sum of expense amounts.
    pub expense: Decimal,
    /// Income minus expenses.
    pub net: Decimal,
}

/// Total a user's transactions under `filter`.
pub fn summarize(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<LedgerSummary, Error> {
    Ok(totals_of(&get_transactions(user_id, filter, connection)?))
}

fn totals_of(transactions: &[Transaction]) -> LedgerSummary {
    let mut income = Decimal::ZERO;
    let mut expense = Decimal::ZERO;

    for transaction in transactions {
        match transaction.kind {
            TransactionKind::Income => income += transaction.amount,
            TransactionKind::Expense => expense += transaction.amount,
        }
    }

    LedgerSummary {
        income,
        expense,
        net: income - expense,
    }
}

/// One category's share of a grouped total.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    /// The category name, or [UNCATEGORIZED_LABEL].
    pub label: String,
    /// The summed amount.
    pub total: Decimal,
}

/// Group a user's expense transactions under `filter` by category name,
/// largest first.
pub fn expenses_by_category(
    user_id: UserId,
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let filter = TransactionFilter {
        kind: Some(TransactionKind::Expense),
        ..filter.clone()
    };

    let transactions = get_transactions(user_id, &filter, connection)?;

    group_by_category(user_id, &transactions, connection)
}

fn group_by_category(
    user_id: UserId,
    transactions: &[Transaction],
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let names: HashMap<_, _> = get_categories(user_id, connection)?
        .into_iter()
        .map(|category| (category.id, category.name))
        .collect();

    let mut totals: HashMap<&str, Decimal> = HashMap::new();

    for transaction in transactions {
        let label = transaction
            .category_id
            .and_then(|category_id| names.get(&category_id))
            .map(String::as_str)
            .unwrap_or(UNCATEGORIZED_LABEL);

        *totals.entry(label).or_insert(Decimal::ZERO) += transaction.amount;
    }

    let mut grouped: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(label, total)| CategoryTotal {
            label: label.to_owned(),
            total,
        })
        .collect();

    grouped.sort_by(|a, b| b.total.cmp(&a.total).then(a.label.cmp(&b.label)));

    Ok(grouped)
}

/// One month's totals within an annual report.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthTotals {
    /// The calendar month, 1-12.
    pub month: u8,
    /// The month's income total.
    pub income: Decimal,
    /// The month's expense total.
    pub expense: Decimal,
    /// Income minus expenses for the month.
    pub net: Decimal,
}

/// A year of the ledger aggregated for the reports page.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnualReport {
    /// The year the report covers.
    pub year: i32,
    /// Totals for each of the twelve months, January first.
    pub months: Vec<MonthTotals>,
    /// The year's income total.
    pub income_total: Decimal,
    /// The year's expense total.
    pub expense_total: Decimal,
    /// The year's largest expense categories, largest first.
    pub top_expense_categories: Vec<CategoryTotal>,
    /// The year's largest income categories, largest first.
    pub top_income_categories: Vec<CategoryTotal>,
    /// The net running total after each month, January first.
    pub cumulative_net: Vec<Decimal>,
}

/// How many categories the report's top lists keep.
const TOP_CATEGORY_LIMIT: usize = 8;

/// Aggregate a year of a user's ledger.
pub fn annual_report(
    user_id: UserId,
    year: i32,
    connection: &Connection,
) -> Result<AnnualReport, Error> {
    let transactions = get_transactions(user_id, &TransactionFilter::for_year(year), connection)?;

    let mut months: Vec<MonthTotals> = (1..=12)
        .map(|month| MonthTotals {
            month,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
            net: Decimal::ZERO,
        })
        .collect();

    for transaction in &transactions {
        let entry = &mut months[usize::from(u8::from(transaction.date.month())) - 1];

        match transaction.kind {
            TransactionKind::Income => entry.income += transaction.amount,
            TransactionKind::Expense => entry.expense += transaction.amount,
        }
    }

    let mut income_total = Decimal::ZERO;
    let mut expense_total = Decimal::ZERO;
    let mut cumulative_net = Vec::with_capacity(12);
    let mut running = Decimal::ZERO;

    for entry in &mut months {
        entry.net = entry.income - entry.expense;
        income_total += entry.income;
        expense_total += entry.expense;
        running += entry.net;
        cumulative_net.push(running);
    }

    let expenses: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| transaction.kind == TransactionKind::Expense)
        .cloned()
        .collect();
    let incomes: Vec<Transaction> = transactions
        .iter()
        .filter(|transaction| transaction.kind == TransactionKind::Income)
        .cloned()
        .collect();

    let mut top_expense_categories = group_by_category(user_id, &expenses, connection)?;
    top_expense_categories.truncate(TOP_CATEGORY_LIMIT);

    let mut top_income_categories = group_by_category(user_id, &incomes, connection)?;
    top_income_categories.truncate(TOP_CATEGORY_LIMIT);

    Ok(AnnualReport {
        year,
        months,
        income_total,
        expense_total,
        top_expense_categories,
        top_income_categories,
        cumulative_net,
    })
}

/// One day of the financial calendar.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarDay {
    /// The day of the month.
    pub day: u8,
    /// The day's income total.
    pub income: Decimal,
    /// The day's expense total.
    pub expense: Decimal,
    /// The day's transactions, oldest id first.
    pub transactions: Vec<Transaction>,
}

/// A month of the financial calendar: per-day activity plus the bills
/// falling due.
#[derive(Debug, Clone, PartialEq)]
pub struct CalendarMonth {
    /// The calendar year.
    pub year: i32,
    /// The calendar month, 1-12.
    pub month: u8,
    /// Days that had transactions, in day order.
    pub days: Vec<CalendarDay>,
    /// The user's active bills; callers key them by `due_day`.
    pub bills: Vec<RecurringBill>,
}

/// Build the financial calendar for one month.
///
/// # Errors
/// Returns [Error::InvalidMonth] if `month` is outside 1-12.
pub fn calendar_month(
    user_id: UserId,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<CalendarMonth, Error> {
    let transactions =
        get_transactions(user_id, &TransactionFilter::for_month(year, month), connection)?;

    let mut days: BTreeMap<u8, CalendarDay> = BTreeMap::new();

    for transaction in transactions {
        let day = transaction.date.day();
        let entry = days.entry(day).or_insert_with(|| CalendarDay {
            day,
            income: Decimal::ZERO,
            expense: Decimal::ZERO,
            transactions: Vec::new(),
        });

        match transaction.kind {
            TransactionKind::Income => entry.income += transaction.amount,
            TransactionKind::Expense => entry.expense += transaction.amount,
        }

        entry.transactions.push(transaction);
    }

    for entry in days.values_mut() {
        entry.transactions.sort_by_key(|transaction| transaction.id);
    }

    let bills = get_bills(user_id, connection)?
        .into_iter()
        .filter(|bill| bill.active)
        .collect();

    Ok(CalendarMonth {
        year,
        month,
        days: days.into_values().collect(),
        bills,
    })
}

/// The user's active bills that are not yet paid this month, with their
/// derived status.
pub fn unpaid_bills(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<(RecurringBill, BillStatus)>, Error> {
    Ok(get_bills(user_id, connection)?
        .into_iter()
        .filter(|bill| bill.active)
        .map(|bill| {
            let status = bill_status(&bill, today);
            (bill, status)
        })
        .filter(|(_, status)| *status != BillStatus::Paid)
        .collect())
}

/// The years the user has transactions in, newest first. Falls back to the
/// current year for an empty ledger so filter pickers have a default.
pub fn transaction_years(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<Vec<i32>, Error> {
    let years: Vec<i32> = connection
        .prepare(
            "SELECT DISTINCT CAST(strftime('%Y', date) AS INTEGER) FROM \"transaction\"
             WHERE user_id = :user_id ORDER BY 1 DESC",
        )?
        .query_map(&[(":user_id", &user_id)], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    if years.is_empty() {
        return Ok(vec![today.year()]);
    }

    Ok(years)
}

/// Lifetime figures for the profile page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileStats {
    /// How many transactions the user has recorded.
    pub transaction_count: u32,
    /// The lifetime income total.
    pub income_total: Decimal,
    /// The lifetime expense total.
    pub expense_total: Decimal,
    /// How many accounts the user has.
    pub account_count: usize,
    /// How many goals the user has completed.
    pub completed_goal_count: usize,
}

/// Gather the profile page's statistics.
pub fn profile_stats(user_id: UserId, connection: &Connection) -> Result<ProfileStats, Error> {
    let summary = summarize(user_id, &TransactionFilter::default(), connection)?;
    let transaction_count =
        crate::transaction::count_transactions(user_id, connection)?;
    let account_count = get_accounts(user_id, connection)?.len();
    let completed_goal_count = get_completed_goals(user_id, connection)?.len();

    Ok(ProfileStats {
        transaction_count,
        income_total: summary.income,
        expense_total: summary.expense,
        account_count,
        completed_goal_count,
    })
}



#[cfg(test)]
mod annual_report_tests {
    use time::macros::date;

    use crate::{
        test_utils::{create_test_user, dec, get_test_connection},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::annual_report;

    #[test]
    fn months_and_cumulative_net_line_up() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_transaction(
            Transaction::build(TransactionKind::Income, dec("100"), date!(2026 - 01 - 15), ""),
            user.id,
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("40"), date!(2026 - 02 - 10), ""),
            user.id,
            &conn,
        )
        .unwrap();
        // A different year stays out of the report.
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("999"), date!(2025 - 06 - 01), ""),
            user.id,
            &conn,
        )
        .unwrap();

        let report = annual_report(user.id, 2026, &conn).unwrap();

        assert_eq!(report.months.len(), 12);
        assert_eq!(report.months[0].income, dec("100"));
        assert_eq!(report.months[1].expense, dec("40"));
        assert_eq!(report.months[1].net, dec("-40"));
        assert_eq!(report.income_total, dec("100"));
        assert_eq!(report.expense_total, dec("40"));
        assert_eq!(report.cumulative_net[0], dec("100"));
        assert_eq!(report.cumulative_net[1], dec("60"));
        assert_eq!(report.cumulative_net[11], dec("60"));
    }
}


#[cfg(test)]
mod years_and_stats_tests {
    use time::macros::date;

    use crate::{
        goal::{NewGoal, create_goal, deposit},
        test_utils::{create_test_user, dec, get_test_connection},
        transaction::{Transaction, TransactionKind, create_transaction},
    };

    use super::{profile_stats, transaction_years};

    #[test]
    fn years_are_distinct_and_newest_first() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        for year_date in [
            date!(2024 - 06 - 01),
            date!(2026 - 01 - 01),
            date!(2026 - 05 - 01),
        ] {
            create_transaction(
                Transaction::build(TransactionKind::Expense, dec("1"), year_date, ""),
                user.id,
                &conn,
            )
            .unwrap();
        }

        let years = transaction_years(user.id, date!(2026 - 08 - 01), &conn).unwrap();

        assert_eq!(years, vec![2026, 2024]);
    }

    #[test]
    fn empty_ledger_falls_back_to_current_year() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let years = transaction_years(user.id, date!(2026 - 08 - 01), &conn).unwrap();

        assert_eq!(years, vec![2026]);
    }

    #[test]
    fn profile_stats_cover_the_ledger() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_transaction(
            Transaction::build(TransactionKind::Income, dec("100"), date!(2026 - 03 - 01), ""),
            user.id,
            &conn,
        )
        .unwrap();
        create_transaction(
            Transaction::build(TransactionKind::Expense, dec("30"), date!(2026 - 03 - 02), ""),
            user.id,
            &conn,
        )
        .unwrap();
        let goal = create_goal(NewGoal::new("Done", dec("10")), user.id, &conn).unwrap();
        deposit(goal.id, user.id, dec("10"), &conn).unwrap();

        let stats = profile_stats(user.id, &conn).unwrap();

        assert_eq!(stats.transaction_count, 2);
        assert_eq!(stats.income_total, dec("100"));
        assert_eq!(stats.expense_total, dec("30"));
        // The seeded wallet account counts.
        assert_eq!(stats.account_count, 1);
        assert_eq!(stats.completed_goal_count, 1);
    }
}
