//! Savings goals: a target amount accumulated through deposits, with a
//! one-way completion flag.

use rusqlite::{Connection, Row};
use rust_decimal::Decimal;
use time::Date;

use crate::{Error, money, user::UserId};

/// Database identifier for a goal.
pub type GoalId = i64;

/// A savings goal.
#[derive(Debug, Clone, PartialEq)]
pub struct Goal {
    /// The ID of the goal.
    pub id: GoalId,
    /// The goal's display name.
    pub name: String,
    /// A longer description of what is being saved for.
    pub description: String,
    /// The amount to reach.
    pub target: Decimal,
    /// The amount saved so far. Never exceeds `target`.
    pub current: Decimal,
    /// An optional date to reach the goal by.
    pub deadline: Option<Date>,
    /// Display icon name.
    pub icon: String,
    /// Display color as a hex string.
    pub color: String,
    /// Whether the target has been reached. Once set it stays set, even if
    /// the figures are later edited.
    pub completed: bool,
    /// The user that owns the goal.
    pub user_id: UserId,
}

impl Goal {
    /// Saved over target, clamped to [0, 100]; 0 for a non-positive target.
    pub fn percentage(&self) -> Decimal {
        money::percentage(self.current, self.target)
    }

    /// How much is still missing, floored at zero.
    pub fn remaining(&self) -> Decimal {
        (self.target - self.current).max(Decimal::ZERO)
    }

    /// Days until the deadline, floored at zero; `None` when the goal has
    /// no deadline.
    pub fn days_remaining(&self, today: Date) -> Option<i64> {
        self.deadline
            .map(|deadline| (deadline - today).whole_days().max(0))
    }
}

/// The fields needed to create a goal.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGoal {
    /// The goal's display name.
    pub name: String,
    /// A longer description of what is being saved for.
    pub description: String,
    /// The amount to reach. Must be positive.
    pub target: Decimal,
    /// An optional date to reach the goal by.
    pub deadline: Option<Date>,
    /// Display icon name.
    pub icon: String,
    /// Display color as a hex string.
    pub color: String,
}

impl NewGoal {
    /// Create a goal definition with default display metadata.
    pub fn new(name: &str, target: Decimal) -> Self {
        Self {
            name: name.to_owned(),
            description: String::new(),
            target,
            deadline: None,
            icon: "fa-bullseye".to_owned(),
            color: "#7c5cfc".to_owned(),
        }
    }

    /// Set the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_owned();
        self
    }

    /// Set the deadline.
    pub fn deadline(mut self, deadline: Option<Date>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Set the display icon.
    pub fn icon(mut self, icon: &str) -> Self {
        self.icon = icon.to_owned();
        self
    }

    /// Set the display color.
    pub fn color(mut self, color: &str) -> Self {
        self.color = color.to_owned();
        self
    }
}

/// Create the goal table and its indexes.
pub fn create_goal_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS goal (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            target TEXT NOT NULL,
            current TEXT NOT NULL DEFAULT '0',
            deadline TEXT,
            icon TEXT NOT NULL,
            color TEXT NOT NULL,
            completed INTEGER NOT NULL DEFAULT 0,
            user_id INTEGER NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_goal_user ON goal(user_id);",
    )?;

    Ok(())
}

/// Create a goal and return it with its generated ID.
///
/// # Errors
/// This function will return an:
/// - [Error::EmptyName] if the name is blank,
/// - [Error::InvalidAmount] if the target is zero or negative.
pub fn create_goal(
    new_goal: NewGoal,
    user_id: UserId,
    connection: &Connection,
) -> Result<Goal, Error> {
    let name = new_goal.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyName);
    }

    money::require_positive(new_goal.target)?;

    connection.execute(
        "INSERT INTO goal (name, description, target, current, deadline, icon, color, completed, user_id)
         VALUES (?1, ?2, ?3, '0', ?4, ?5, ?6, 0, ?7)",
        (
            name,
            &new_goal.description,
            new_goal.target.to_string(),
            new_goal.deadline,
            &new_goal.icon,
            &new_goal.color,
            user_id,
        ),
    )?;

    Ok(Goal {
        id: connection.last_insert_rowid(),
        name: name.to_owned(),
        description: new_goal.description,
        target: new_goal.target,
        current: Decimal::ZERO,
        deadline: new_goal.deadline,
        icon: new_goal.icon,
        color: new_goal.color,
        completed: false,
        user_id,
    })
}

/// Retrieve a single goal owned by `user_id`.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to
/// another user.
pub fn get_goal(goal_id: GoalId, user_id: UserId, connection: &Connection) -> Result<Goal, Error> {
    connection
        .prepare(
            "SELECT id, name, description, target, current, deadline, icon, color, completed, user_id
             FROM goal WHERE id = :id AND user_id = :user_id",
        )?
        .query_one(&[(":id", &goal_id), (":user_id", &user_id)], map_goal_row)
        .map_err(|error| error.into())
}

/// The user's goals still being saved for, soonest deadline first
/// (deadline-less goals last).
pub fn get_active_goals(user_id: UserId, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(
            "SELECT id, name, description, target, current, deadline, icon, color, completed, user_id
             FROM goal WHERE user_id = :user_id AND completed = 0
             ORDER BY deadline IS NULL, deadline ASC, id ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

/// The user's completed goals.
pub fn get_completed_goals(user_id: UserId, connection: &Connection) -> Result<Vec<Goal>, Error> {
    connection
        .prepare(
            "SELECT id, name, description, target, current, deadline, icon, color, completed, user_id
             FROM goal WHERE user_id = :user_id AND completed = 1 ORDER BY id ASC",
        )?
        .query_map(&[(":user_id", &user_id)], map_goal_row)?
        .map(|maybe_goal| maybe_goal.map_err(|error| error.into()))
        .collect()
}

/// Put money towards a goal.
///
/// The saved amount is capped at the target; reaching the target sets the
/// completion flag, which never auto-reverts on later calls.
///
/// # Errors
/// This function will return an:
/// - [Error::InvalidAmount] if `amount` is zero or negative,
/// - [Error::NotFound] if the goal does not exist or belongs to another
///   user.
pub fn deposit(
    goal_id: GoalId,
    user_id: UserId,
    amount: Decimal,
    connection: &Connection,
) -> Result<Goal, Error> {
    money::require_positive(amount)?;

    let mut goal = get_goal(goal_id, user_id, connection)?;

    goal.current = (goal.current + amount).min(goal.target);
    goal.completed = goal.completed || goal.current >= goal.target;

    connection.execute(
        "UPDATE goal SET current = ?1, completed = ?2 WHERE id = ?3 AND user_id = ?4",
        (goal.current.to_string(), goal.completed, goal_id, user_id),
    )?;

    Ok(goal)
}

/// Delete a goal.
///
/// # Errors
/// Returns [Error::NotFound] if the goal does not exist or belongs to
/// another user.
pub fn delete_goal(goal_id: GoalId, user_id: UserId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM goal WHERE id = ?1 AND user_id = ?2",
        (goal_id, user_id),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Combined target and saved amounts across the user's active goals.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalTotals {
    /// The sum of active goals' targets.
    pub target: Decimal,
    /// The sum of active goals' saved amounts.
    pub current: Decimal,
}

/// Total up the user's active goals.
pub fn goal_totals(user_id: UserId, connection: &Connection) -> Result<GoalTotals, Error> {
    let mut totals = GoalTotals {
        target: Decimal::ZERO,
        current: Decimal::ZERO,
    };

    for goal in get_active_goals(user_id, connection)? {
        totals.target += goal.target;
        totals.current += goal.current;
    }

    Ok(totals)
}

fn map_goal_row(row: &Row) -> Result<Goal, rusqlite::Error> {
    Ok(Goal {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        target: money::read_amount(row, 3)?,
        current: money::read_amount(row, 4)?,
        deadline: row.get(5)?,
        icon: row.get(6)?,
        color: row.get(7)?,
        completed: row.get(8)?,
        user_id: row.get(9)?,
    })
}


#[cfg(test)]
mod goal_query_tests {
    use time::macros::date;

    use crate::{
        Error,
        test_utils::{create_second_user, create_test_user, dec, get_test_connection},
    };

    use super::{
        NewGoal, create_goal, delete_goal, deposit, get_active_goals, get_completed_goals,
        get_goal, goal_totals,
    };

    #[test]
    fn create_goal_rejects_non_positive_target() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);

        let result = create_goal(NewGoal::new("Trip", dec("-1")), user.id, &conn);

        assert_eq!(result, Err(Error::InvalidAmount("-1".to_owned())));
    }

    #[test]
    fn percentage_and_remaining_derive_from_amounts() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let goal = create_goal(NewGoal::new("Trip", dec("400")), user.id, &conn).unwrap();

        let updated = deposit(goal.id, user.id, dec("100"), &conn).unwrap();

        assert_eq!(updated.percentage(), dec("25"));
        assert_eq!(updated.remaining(), dec("300"));
    }

    #[test]
    fn days_remaining_floors_at_zero() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let goal = create_goal(
            NewGoal::new("Trip", dec("400")).deadline(Some(date!(2026 - 03 - 20))),
            user.id,
            &conn,
        )
        .unwrap();

        assert_eq!(goal.days_remaining(date!(2026 - 03 - 15)), Some(5));
        assert_eq!(goal.days_remaining(date!(2026 - 04 - 01)), Some(0));
        assert_eq!(
            create_goal(NewGoal::new("Other", dec("1")), user.id, &conn)
                .unwrap()
                .days_remaining(date!(2026 - 03 - 15)),
            None
        );
    }

    #[test]
    fn active_goals_are_ordered_by_deadline() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        create_goal(NewGoal::new("No deadline", dec("1")), user.id, &conn).unwrap();
        create_goal(
            NewGoal::new("Later", dec("1")).deadline(Some(date!(2026 - 12 - 01))),
            user.id,
            &conn,
        )
        .unwrap();
        create_goal(
            NewGoal::new("Soon", dec("1")).deadline(Some(date!(2026 - 04 - 01))),
            user.id,
            &conn,
        )
        .unwrap();

        let goals = get_active_goals(user.id, &conn).unwrap();

        assert_eq!(
            goals.iter().map(|goal| goal.name.as_str()).collect::<Vec<_>>(),
            ["Soon", "Later", "No deadline"]
        );
    }

    #[test]
    fn completed_goals_move_lists() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let goal = create_goal(NewGoal::new("Trip", dec("100")), user.id, &conn).unwrap();
        deposit(goal.id, user.id, dec("100"), &conn).unwrap();

        assert!(get_active_goals(user.id, &conn).unwrap().is_empty());
        assert_eq!(get_completed_goals(user.id, &conn).unwrap().len(), 1);
    }

    #[test]
    fn totals_cover_active_goals_only() {
        let conn = get_test_connection();
        let user = create_test_user(&conn);
        let trip = create_goal(NewGoal::new("Trip", dec("400")), user.id, &conn).unwrap();
        deposit(trip.id, user.id, dec("150"), &conn).unwrap();
        let done = create_goal(NewGoal::new("Done", dec("50")), user.id, &conn).unwrap();
        deposit(done.id, user.id, dec("50"), &conn).unwrap();

        let totals = goal_totals(user.id, &conn).unwrap();

        assert_eq!(totals.target, dec("400"));
        assert_eq!(totals.current, dec("150"));
    }

    #[test]
    fn goals_are_scoped_to_their_owner() {
        let conn = get_test_connection();
        let owner = create_test_user(&conn);
        let other = create_second_user(&conn);
        let goal = create_goal(NewGoal::new("Private", dec("100")), owner.id, &conn).unwrap();

        assert_eq!(Err(Error::NotFound), get_goal(goal.id, other.id, &conn));
        assert_eq!(
            Err(Error::NotFound),
            deposit(goal.id, other.id, dec("10"), &conn)
        );
        assert_eq!(Err(Error::NotFound), delete_goal(goal.id, other.id, &conn));
    }
}
