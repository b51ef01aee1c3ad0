//! Implements a SQLite backed expense store.
//!
//! The store owns the database connection and is the only way the rest of
//! the application touches expense rows. Each operation locks the connection
//! for its own duration; the lock guard guarantees release on every exit
//! path. Writer serialization is left to SQLite itself.

use std::sync::{Arc, Mutex};

use rusqlite::{Connection, Row, params_from_iter, types::Value};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    db::{CreateTable, MapRow},
    expense::{Expense, ExpenseId, NewExpense},
};

/// The number of expenses a query returns when the caller does not specify a
/// limit.
pub const DEFAULT_QUERY_LIMIT: u32 = 50;

/// The most expenses a single query will return, regardless of the limit the
/// caller asked for.
pub const MAX_QUERY_LIMIT: u32 = 1000;

/// The optional filters for querying expenses.
///
/// Each filter that is present adds one predicate to the query; absent
/// filters add nothing. Results are always ordered by date, most recent
/// first, with ties left in store order.
///
/// Filter dates are compared as `YYYY-MM-DD` text, which orders the same as
/// the calendar, so they are passed through without validation. A malformed
/// filter date matches nothing rather than producing an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    /// Only include expenses with exactly this category. An empty string is
    /// treated the same as no filter.
    pub category: Option<String>,
    /// Only include expenses dated on or after this `YYYY-MM-DD` date.
    pub start_date: Option<String>,
    /// Only include expenses dated on or before this `YYYY-MM-DD` date.
    pub end_date: Option<String>,
    /// The maximum number of expenses to return, clamped to
    /// [MAX_QUERY_LIMIT].
    pub limit: u32,
}

impl Default for ExpenseQuery {
    fn default() -> Self {
        Self {
            category: None,
            start_date: None,
            end_date: None,
            limit: DEFAULT_QUERY_LIMIT,
        }
    }
}

/// The total amount and record count for one category in a [Summary].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// The category the expenses belong to.
    pub category: String,
    /// The sum of the amounts of the matching expenses.
    pub total: f64,
    /// How many expenses matched.
    pub count: i64,
}

/// Aggregate statistics over a filtered set of expenses.
///
/// The per-category breakdown always adds up to the overall total and count:
/// both are computed over the same filter set in one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    /// The sum of the amounts of all matching expenses. Zero when nothing
    /// matched.
    pub total: f64,
    /// How many expenses matched. Zero when nothing matched.
    pub count: i64,
    /// One entry per distinct category, ordered by total descending. Empty
    /// when nothing matched.
    pub by_category: Vec<CategoryTotal>,
}

/// One optional predicate of a query: the clause text and the value bound to
/// its placeholder.
///
/// Collecting predicates into a list and iterating it once keeps the clause
/// sequence and the parameter sequence in lock-step, so filters can never be
/// bound to the wrong placeholder no matter which combination is present.
struct Predicate {
    clause: &'static str,
    value: Value,
}

/// Build the date-range predicates shared by the list query and the summary
/// query.
fn date_predicates(start_date: Option<String>, end_date: Option<String>) -> Vec<Predicate> {
    let mut predicates = Vec::new();

    if let Some(start_date) = start_date {
        predicates.push(Predicate {
            clause: "date >= ?",
            value: Value::Text(start_date),
        });
    }

    if let Some(end_date) = end_date {
        predicates.push(Predicate {
            clause: "date <= ?",
            value: Value::Text(end_date),
        });
    }

    predicates
}

/// Render a list of predicates as a WHERE clause and the parameters to bind
/// to it, in matching order.
fn where_clause(predicates: Vec<Predicate>) -> (String, Vec<Value>) {
    if predicates.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut clauses = Vec::with_capacity(predicates.len());
    let mut parameters = Vec::with_capacity(predicates.len());

    for predicate in predicates {
        clauses.push(predicate.clause);
        parameters.push(predicate.value);
    }

    (format!(" WHERE {}", clauses.join(" AND ")), parameters)
}

/// Stores expenses in a SQLite database.
#[derive(Debug, Clone)]
pub struct ExpenseStore {
    connection: Arc<Mutex<Connection>>,
}

impl ExpenseStore {
    /// Create a new store for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    /// Create a new expense in the database.
    ///
    /// The returned expense carries the ID the database assigned. IDs
    /// increase monotonically and are never reused, even after deletion.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL
    /// error.
    pub fn create(&self, new_expense: NewExpense) -> Result<Expense, Error> {
        let expense = self
            .connection
            .lock()
            .unwrap()
            .prepare(
                "INSERT INTO expense (date, amount, category, subcategory, note)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING id, date, amount, category, subcategory, note",
            )?
            .query_row(
                (
                    new_expense.date,
                    new_expense.amount,
                    new_expense.category,
                    new_expense.subcategory,
                    new_expense.note,
                ),
                Self::map_row,
            )?;

        Ok(expense)
    }

    /// Query for expenses in the database.
    ///
    /// See [ExpenseQuery] for the available filters. Results are ordered by
    /// date descending and capped at the query's limit.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL
    /// error.
    pub fn get_query(&self, query: ExpenseQuery) -> Result<Vec<Expense>, Error> {
        let mut predicates = Vec::new();

        if let Some(category) = query.category.filter(|category| !category.is_empty()) {
            predicates.push(Predicate {
                clause: "category = ?",
                value: Value::Text(category),
            });
        }

        predicates.extend(date_predicates(query.start_date, query.end_date));

        let (where_clause, mut parameters) = where_clause(predicates);
        let statement = format!(
            "SELECT id, date, amount, category, subcategory, note FROM expense{where_clause} \
             ORDER BY date DESC LIMIT ?"
        );
        parameters.push(Value::Integer(i64::from(query.limit.min(MAX_QUERY_LIMIT))));

        self.connection
            .lock()
            .unwrap()
            .prepare(&statement)?
            .query_map(params_from_iter(parameters.iter()), Self::map_row)?
            .map(|maybe_expense| maybe_expense.map_err(Error::SqlError))
            .collect()
    }

    /// Compute aggregate statistics for the expenses within the given date
    /// range.
    ///
    /// Both bounds are optional and inclusive. The per-category breakdown
    /// and the overall total are computed over the same filter set, so the
    /// breakdown always adds up to the total. An empty result set yields a
    /// total and count of zero and an empty breakdown.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL
    /// error.
    pub fn summary(
        &self,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Summary, Error> {
        let (where_clause, parameters) = where_clause(date_predicates(start_date, end_date));

        let connection = self.connection.lock().unwrap();

        let by_category = connection
            .prepare(&format!(
                "SELECT category, SUM(amount) AS total, COUNT(*) AS count \
                 FROM expense{where_clause} GROUP BY category ORDER BY total DESC"
            ))?
            .query_map(params_from_iter(parameters.iter()), |row| {
                Ok(CategoryTotal {
                    category: row.get(0)?,
                    total: row.get(1)?,
                    count: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let (total, count) = connection
            .prepare(&format!(
                "SELECT COALESCE(SUM(amount), 0), COUNT(*) FROM expense{where_clause}"
            ))?
            .query_row(params_from_iter(parameters.iter()), |row| {
                Ok((row.get::<_, f64>(0)?, row.get::<_, i64>(1)?))
            })?;

        let breakdown_total: f64 = by_category.iter().map(|entry| entry.total).sum();
        let breakdown_count: i64 = by_category.iter().map(|entry| entry.count).sum();
        debug_assert!(
            (breakdown_total - total).abs() < 1e-6,
            "per-category totals {breakdown_total} do not add up to the overall total {total}"
        );
        debug_assert_eq!(breakdown_count, count);

        Ok(Summary {
            total,
            count,
            by_category,
        })
    }

    /// Delete the expense with the given `id` from the database.
    ///
    /// # Errors
    /// This function will return an:
    /// - [Error::ExpenseNotFound] if `id` does not refer to an expense in
    ///   the database,
    /// - [Error::SqlError] if there is some other SQL error.
    pub fn delete(&self, id: ExpenseId) -> Result<(), Error> {
        let rows_deleted = self
            .connection
            .lock()
            .unwrap()
            .execute("DELETE FROM expense WHERE id = ?1", [id])?;

        if rows_deleted == 0 {
            Err(Error::ExpenseNotFound(id))
        } else {
            Ok(())
        }
    }

    /// Get the total number of expenses in the database.
    ///
    /// # Errors
    /// This function will return an [Error::SqlError] if there is an SQL
    /// error.
    pub fn count(&self) -> Result<i64, Error> {
        self.connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(id) FROM expense", [], |row| row.get(0))
            .map_err(|error| error.into())
    }
}

impl CreateTable for ExpenseStore {
    fn create_table(connection: &Connection) -> Result<(), rusqlite::Error> {
        connection.execute(
            "CREATE TABLE IF NOT EXISTS expense (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    date TEXT NOT NULL,
                    amount REAL NOT NULL,
                    category TEXT NOT NULL,
                    subcategory TEXT NOT NULL DEFAULT '',
                    note TEXT NOT NULL DEFAULT ''
                    )",
            (),
        )?;

        // Ensure the sequence starts at 1
        connection.execute(
            "INSERT OR IGNORE INTO sqlite_sequence (name, seq) VALUES ('expense', 0)",
            (),
        )?;

        Ok(())
    }
}

impl MapRow for ExpenseStore {
    type ReturnType = Expense;

    fn map_row_with_offset(row: &Row, offset: usize) -> Result<Self::ReturnType, rusqlite::Error> {
        Ok(Expense {
            id: row.get(offset)?,
            date: row.get(offset + 1)?,
            amount: row.get(offset + 2)?,
            category: row.get(offset + 3)?,
            subcategory: row.get(offset + 4)?,
            note: row.get(offset + 5)?,
        })
    }
}

#[cfg(test)]
mod expense_store_tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;

    use crate::{Error, db::initialize, expense::NewExpense};

    use super::{ExpenseQuery, ExpenseStore, MAX_QUERY_LIMIT};

    fn get_store() -> ExpenseStore {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        ExpenseStore::new(Arc::new(Mutex::new(conn)))
    }

    fn new_expense(date: &str, amount: f64, category: &str) -> NewExpense {
        NewExpense::new(date, amount, category).unwrap()
    }

    #[test]
    fn create_assigns_increasing_ids() {
        let store = get_store();

        let first = store.create(new_expense("2024-01-15", 42.50, "Food")).unwrap();
        let second = store.create(new_expense("2024-01-16", 3.00, "Transport")).unwrap();

        assert!(first.id > 0);
        assert!(second.id > first.id);
    }

    #[test]
    fn create_round_trips_fields() {
        let store = get_store();

        let created = store
            .create(
                new_expense("2024-01-15", 42.50, "Food")
                    .subcategory("Groceries")
                    .note("weekly shop"),
            )
            .unwrap();

        let expenses = store.get_query(ExpenseQuery::default()).unwrap();
        assert_eq!(expenses, vec![created.clone()]);
        assert_eq!(created.amount, 42.50);
        assert_eq!(created.category, "Food");
        assert_eq!(created.subcategory, "Groceries");
        assert_eq!(created.note, "weekly shop");
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = get_store();

        let expense = store.create(new_expense("2024-01-15", 1.0, "Food")).unwrap();
        store.delete(expense.id).unwrap();
        let next = store.create(new_expense("2024-01-16", 1.0, "Food")).unwrap();

        assert!(next.id > expense.id);
    }

    #[test]
    fn get_query_orders_by_date_descending() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 1.0, "Food")).unwrap();
        store.create(new_expense("2024-03-01", 2.0, "Food")).unwrap();
        store.create(new_expense("2024-02-20", 3.0, "Food")).unwrap();

        let expenses = store.get_query(ExpenseQuery::default()).unwrap();

        let amounts: Vec<f64> = expenses.iter().map(|expense| expense.amount).collect();
        assert_eq!(amounts, vec![2.0, 3.0, 1.0]);
    }

    #[test]
    fn get_query_filters_by_category() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 1.0, "Food")).unwrap();
        store.create(new_expense("2024-01-11", 2.0, "Transport")).unwrap();

        let expenses = store
            .get_query(ExpenseQuery {
                category: Some("Food".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].category, "Food");
    }

    #[test]
    fn get_query_treats_empty_category_as_no_filter() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 1.0, "Food")).unwrap();
        store.create(new_expense("2024-01-11", 2.0, "Transport")).unwrap();

        let expenses = store
            .get_query(ExpenseQuery {
                category: Some(String::new()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(expenses.len(), 2);
    }

    #[test]
    fn get_query_filters_by_date_range() {
        let store = get_store();

        store.create(new_expense("2024-01-01", 1.0, "Food")).unwrap();
        store.create(new_expense("2024-01-15", 2.0, "Food")).unwrap();
        store.create(new_expense("2024-01-31", 3.0, "Food")).unwrap();
        store.create(new_expense("2024-02-01", 4.0, "Food")).unwrap();

        let expenses = store
            .get_query(ExpenseQuery {
                start_date: Some("2024-01-02".to_string()),
                end_date: Some("2024-01-31".to_string()),
                ..Default::default()
            })
            .unwrap();

        let amounts: Vec<f64> = expenses.iter().map(|expense| expense.amount).collect();
        assert_eq!(amounts, vec![3.0, 2.0]);
    }

    #[test]
    fn get_query_combines_all_filters() {
        let store = get_store();

        // In range but wrong category.
        store.create(new_expense("2024-01-15", 1.0, "Transport")).unwrap();
        // Right category but out of range.
        store.create(new_expense("2023-12-31", 2.0, "Food")).unwrap();
        store.create(new_expense("2024-02-01", 3.0, "Food")).unwrap();
        // Matches everything.
        store.create(new_expense("2024-01-20", 4.0, "Food")).unwrap();
        store.create(new_expense("2024-01-05", 5.0, "Food")).unwrap();

        let expenses = store
            .get_query(ExpenseQuery {
                category: Some("Food".to_string()),
                start_date: Some("2024-01-01".to_string()),
                end_date: Some("2024-01-31".to_string()),
                limit: 50,
            })
            .unwrap();

        let amounts: Vec<f64> = expenses.iter().map(|expense| expense.amount).collect();
        assert_eq!(amounts, vec![4.0, 5.0]);
    }

    #[test]
    fn get_query_respects_limit() {
        let store = get_store();

        for day in 1..=9 {
            store
                .create(new_expense(&format!("2024-01-0{day}"), day as f64, "Food"))
                .unwrap();
        }

        let expenses = store
            .get_query(ExpenseQuery {
                limit: 5,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(expenses.len(), 5);
    }

    #[test]
    fn get_query_clamps_oversized_limit() {
        let store = get_store();

        for _ in 0..(MAX_QUERY_LIMIT + 5) {
            store.create(new_expense("2024-01-15", 1.0, "Food")).unwrap();
        }

        let expenses = store
            .get_query(ExpenseQuery {
                limit: u32::MAX,
                ..Default::default()
            })
            .unwrap();

        assert_eq!(expenses.len(), MAX_QUERY_LIMIT as usize);
    }

    #[test]
    fn summary_breakdown_adds_up_to_total() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 10.25, "Food")).unwrap();
        store.create(new_expense("2024-01-11", 20.50, "Food")).unwrap();
        store.create(new_expense("2024-01-12", 5.00, "Transport")).unwrap();
        store.create(new_expense("2024-01-13", 100.75, "Rent")).unwrap();

        let summary = store.summary(None, None).unwrap();

        let breakdown_total: f64 = summary.by_category.iter().map(|entry| entry.total).sum();
        let breakdown_count: i64 = summary.by_category.iter().map(|entry| entry.count).sum();
        assert!((breakdown_total - summary.total).abs() < 1e-9);
        assert_eq!(breakdown_count, summary.count);
        assert_eq!(summary.count, 4);
    }

    #[test]
    fn summary_orders_categories_by_total_descending() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 10.0, "Food")).unwrap();
        store.create(new_expense("2024-01-11", 20.0, "Food")).unwrap();
        store.create(new_expense("2024-01-12", 5.0, "Transport")).unwrap();
        store.create(new_expense("2024-01-13", 100.0, "Rent")).unwrap();

        let summary = store.summary(None, None).unwrap();

        let categories: Vec<&str> = summary
            .by_category
            .iter()
            .map(|entry| entry.category.as_str())
            .collect();
        assert_eq!(categories, vec!["Rent", "Food", "Transport"]);
    }

    #[test]
    fn summary_applies_date_range() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 10.0, "Food")).unwrap();
        store.create(new_expense("2024-02-10", 20.0, "Food")).unwrap();
        store.create(new_expense("2024-03-10", 40.0, "Food")).unwrap();

        let summary = store
            .summary(Some("2024-02-01".to_string()), Some("2024-02-29".to_string()))
            .unwrap();

        assert_eq!(summary.total, 20.0);
        assert_eq!(summary.count, 1);
        assert_eq!(summary.by_category.len(), 1);
        assert_eq!(summary.by_category[0].count, 1);
    }

    #[test]
    fn summary_of_empty_range_is_zero() {
        let store = get_store();

        store.create(new_expense("2024-01-10", 10.0, "Food")).unwrap();

        let summary = store
            .summary(Some("2030-01-01".to_string()), Some("2030-12-31".to_string()))
            .unwrap();

        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.by_category, vec![]);
    }

    #[test]
    fn summary_of_empty_store_is_zero() {
        let store = get_store();

        let summary = store.summary(None, None).unwrap();

        assert_eq!(summary.total, 0.0);
        assert_eq!(summary.count, 0);
        assert_eq!(summary.by_category, vec![]);
    }

    #[test]
    fn count_counts_all_expenses() {
        let store = get_store();

        store.create(new_expense("2024-01-15", 1.0, "Food")).unwrap();
        store.create(new_expense("2024-01-16", 2.0, "Transport")).unwrap();

        assert_eq!(store.count(), Ok(2));
    }

    #[test]
    fn delete_removes_expense() {
        let store = get_store();

        let expense = store.create(new_expense("2024-01-15", 1.0, "Food")).unwrap();

        assert_eq!(store.delete(expense.id), Ok(()));
        assert_eq!(store.count(), Ok(0));
    }

    #[test]
    fn delete_fails_twice_for_same_id() {
        let store = get_store();

        let expense = store.create(new_expense("2024-01-15", 1.0, "Food")).unwrap();

        store.delete(expense.id).unwrap();
        let first_retry = store.delete(expense.id);
        let second_retry = store.delete(expense.id);

        assert_eq!(first_retry, Err(Error::ExpenseNotFound(expense.id)));
        assert_eq!(second_retry, Err(Error::ExpenseNotFound(expense.id)));
    }

    #[test]
    fn delete_fails_on_unknown_id() {
        let store = get_store();

        assert_eq!(store.delete(1337), Err(Error::ExpenseNotFound(1337)));
    }
}
