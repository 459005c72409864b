//! Monthly spending budgets per category, with consumption derived from
//! the transaction ledger on every read.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;

use crate::{
    Error,
    category::{Category, CategoryId, CategoryKind, get_categories_by_kind},
    money,
    transaction::{TransactionFilter, TransactionKind, get_transactions, validate_category},
    user::UserId,
};

/// Database identifier for a budget.
pub type BudgetId = i64;

/// A spending limit for one category in one calendar month.
#[derive(Debug, Clone, PartialEq)]
pub struct Budget {
    /// The ID of the budget.
    pub id: BudgetId,
    /// The category the budget constrains.
    pub category_id: CategoryId,
    /// The spending limit for the month.
    ///
    /// A non-positive limit is representable; it reads as 0% consumed.
    pub limit: Decimal,
    /// The calendar month, 1-12.
    pub month: u8,
    /// The calendar year.
    pub year: i32,
    /// The user that owns the budget.
    pub user_id: UserId,
}

/// A budget together with its derived consumption figures.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetStatus {
    /// The budget itself.
    pub budget: Budget,
    /// The sum of the month's expense transactions in the category.
    pub spent: Decimal,
    /// Spent over limit, clamped to [0, 100]; 0 when the limit is
    /// non-positive.
    pub percentage: Decimal,
    /// How much of the limit is left, floored at zero.
    pub remaining: Decimal,
}

/// Create the budget table and its indexes.
pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            category_id INTEGER NOT NULL,
            limit_amount TEXT NOT NULL,
            month INTEGER NOT NULL CHECK (month BETWEEN 1 AND 12),
            year INTEGER NOT NULL,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(category_id) REFERENCES category(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_budget_user_period ON budget(user_id, year, month);",
    )?;

    Ok(())
}

/// Create a budget for a category and month.
///
/// # Errors
/// This function will return an:
/// - [Error::InvalidMonth] if `month` is outside 1-12,
/// - [Error::InvalidCategory] if the category does not belong to the user.
pub fn create_budget(
    category_id: CategoryId,
    limit: Decimal,
    month: u8,
    year: i32,
    user_id: UserId,
    connection: &Connection,
) -> Result<Budget, Error> {
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidMonth(month));
    }

    validate_category(Some(category_id), user_id, connection)?;

    connection.execute(
        "INSERT INTO budget (category_id, limit_amount, month, year, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        (category_id, limit.to_string(), month, year, user_id),
    )?;

    Ok(Budget {
        id: connection.last_insert_rowid(),
        category_id,
        limit,
        month,
        year,
        user_id,
    })
}

/// Retrieve a single budget owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to
/// another user.
pub fn get_budget(
    budget_id: BudgetId,
    user_id: UserId,
    connection: &Connection,
) -> Result<Budget, Error> {
    connection
        .prepare(
            "SELECT id, category_id, limit_amount, month, year, user_id
             FROM budget WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &budget_id), (":user_id", &user_id)], map_budget_row)
        .map_err(|error| error.into())
}

/// Retrieve the user's budgets for one month.
pub fn get_budgets(
    user_id: UserId,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, category_id, limit_amount, month, year, user_id
             FROM budget WHERE user_id = ?1 AND year = ?2 AND month = ?3 ORDER BY id ASC",
        )?
        .query_map((user_id, year, month), map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(|error| error.into()))
        .collect()
}

/// Delete a budget.
///
/// # Errors
/// Returns [Error::NotFound] if the budget does not exist or belongs to
/// another user.
pub fn delete_budget(
    budget_id: BudgetId,
    user_id: UserId,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM budget WHERE id = ?1 AND user_id = ?2",
        (budget_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// The sum of the budget's month's expense transactions in its category.
pub fn budget_spent(budget: &Budget, connection: &Connection) -> Result<Decimal, Error> {
    let filter = TransactionFilter {
        kind: Some(TransactionKind::Expense),
        category_id: Some(budget.category_id),
        ..TransactionFilter::for_month(budget.year, budget.month)
    };

    let mut spent = Decimal::ZERO;

    for transaction in get_transactions(budget.user_id, &filter, connection)? {
        spent += transaction.amount;
    }

    Ok(spent)
}

/// Derive a budget's consumption figures.
pub fn budget_status(budget: Budget, connection: &Connection) -> Result<BudgetStatus, Error> {
    let spent = budget_spent(&budget, connection)?;
    let percentage = money::percentage(spent, budget.limit);
    let remaining = (budget.limit - spent).max(Decimal::ZERO);

    Ok(BudgetStatus {
        budget,
        spent,
        percentage,
        remaining,
    })
}

/// Combined limit and spend across the user's budgets for one month.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetMonthSummary {
    /// The sum of the month's budget limits.
    pub total_limit: Decimal,
    /// The sum of the month's derived spends.
    pub total_spent: Decimal,
}

/// Total up the user's budgets for one month.
pub fn month_budget_summary(
    user_id: UserId,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<BudgetMonthSummary, Error> {
    let mut total_limit = Decimal::ZERO;
    let mut total_spent = Decimal::ZERO;

    for budget in get_budgets(user_id, year, month, connection)? {
        total_limit += budget.limit;
        total_spent += budget_spent(&budget, connection)?;
    }

    Ok(BudgetMonthSummary {
        total_limit,
        total_spent,
    })
}

/// The user's expense categories that do not yet have a budget for the
/// month, i.e. the choices offered when creating one.
pub fn unbudgeted_categories(
    user_id: UserId,
    year: i32,
    month: u8,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    let budgeted: Vec<CategoryId> = get_budgets(user_id, year, month, connection)?
        .into_iter()
        .map(|budget| budget.category_id)
        .collect();

    let categories = get_categories_by_kind(user_id, CategoryKind::Expense, connection)?;

    Ok(categories
        .into_iter()
        .filter(|category| !budgeted.contains(&category.id))
        .collect())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        category_id: row.get(1)?,
        limit: money::read_amount(row, 2)?,
        month: row.get(3)?,
        year: row.get(4)?,
        user_id: row.get(5)?,
    })
}
