//! The callable operations ("tools") that make up the service's public
//! contract.
//!
//! Every tool takes named arguments and returns a [ToolResponse]: a JSON
//! object with a `status` field of `"ok"` or `"error"`. Validation errors,
//! missing records and SQL failures all surface through the same error
//! shape; no tool terminates the process on a recoverable failure.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    expense::{Expense, ExpenseId, NewExpense},
    store::{DEFAULT_QUERY_LIMIT, ExpenseQuery, ExpenseStore, Summary},
};

/// The result envelope every tool returns.
///
/// Serializes the payload fields alongside a `status` tag, e.g.
/// `{"status": "ok", "id": 7}` or
/// `{"status": "error", "message": "amount must be positive, got 0"}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolResponse<T> {
    /// The tool succeeded and produced a payload.
    Ok(T),
    /// The tool failed; `message` says why in human-readable terms.
    Error {
        /// A description of what went wrong.
        message: String,
    },
}

impl<T> ToolResponse<T> {
    fn error(error: Error) -> Self {
        ToolResponse::Error {
            message: error.to_string(),
        }
    }
}

impl<T> From<Result<T, Error>> for ToolResponse<T> {
    fn from(result: Result<T, Error>) -> Self {
        match result {
            Ok(payload) => ToolResponse::Ok(payload),
            Err(error) => ToolResponse::error(error),
        }
    }
}

/// The arguments for [add_expense].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddExpenseArgs {
    /// The day the money was spent, in `YYYY-MM-DD` format.
    pub date: String,
    /// How much money was spent. Must be positive.
    pub amount: f64,
    /// The main category of the expense, e.g. "Food".
    pub category: String,
    /// An optional finer-grained category.
    #[serde(default)]
    pub subcategory: String,
    /// An optional free-text note.
    #[serde(default)]
    pub note: String,
}

/// The payload returned by a successful [add_expense] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseAdded {
    /// The ID the store assigned to the new expense.
    pub id: ExpenseId,
}

/// The arguments for [get_expenses].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetExpensesArgs {
    /// Only include expenses with exactly this category.
    #[serde(default)]
    pub category: Option<String>,
    /// Only include expenses on or after this `YYYY-MM-DD` date.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Only include expenses on or before this `YYYY-MM-DD` date.
    #[serde(default)]
    pub end_date: Option<String>,
    /// The maximum number of expenses to return.
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    DEFAULT_QUERY_LIMIT
}

/// The payload returned by a successful [get_expenses] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseList {
    /// The matching expenses, most recent date first.
    pub expenses: Vec<Expense>,
    /// How many expenses were returned.
    pub count: usize,
}

/// The arguments for [get_expense_summary].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GetExpenseSummaryArgs {
    /// Only include expenses on or after this `YYYY-MM-DD` date.
    #[serde(default)]
    pub start_date: Option<String>,
    /// Only include expenses on or before this `YYYY-MM-DD` date.
    #[serde(default)]
    pub end_date: Option<String>,
}

/// The arguments for [delete_expense].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DeleteExpenseArgs {
    /// The ID of the expense to delete.
    pub expense_id: ExpenseId,
}

/// The payload returned by a successful [delete_expense] call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpenseDeleted {
    /// A confirmation naming the deleted expense.
    pub message: String,
}

/// Add a new expense entry to the database.
///
/// The date and amount are validated before the store is touched; on
/// validation failure nothing is written. On success the payload carries the
/// ID the store assigned.
pub fn add_expense(store: &ExpenseStore, args: AddExpenseArgs) -> ToolResponse<ExpenseAdded> {
    let new_expense = match NewExpense::new(&args.date, args.amount, &args.category) {
        Ok(new_expense) => new_expense.subcategory(&args.subcategory).note(&args.note),
        Err(error) => return ToolResponse::error(error),
    };

    store
        .create(new_expense)
        .map(|expense| ExpenseAdded { id: expense.id })
        .into()
}

/// Retrieve expenses with optional category and date-range filters.
///
/// Filter values are passed through to the store as-is; dates compare as
/// `YYYY-MM-DD` text, so a malformed filter matches nothing rather than
/// erroring.
pub fn get_expenses(store: &ExpenseStore, args: GetExpensesArgs) -> ToolResponse<ExpenseList> {
    store
        .get_query(ExpenseQuery {
            category: args.category,
            start_date: args.start_date,
            end_date: args.end_date,
            limit: args.limit,
        })
        .map(|expenses| ExpenseList {
            count: expenses.len(),
            expenses,
        })
        .into()
}

/// Get summary statistics for the expenses within an optional date range.
///
/// The payload carries the overall total and count plus a per-category
/// breakdown that adds up to them.
pub fn get_expense_summary(
    store: &ExpenseStore,
    args: GetExpenseSummaryArgs,
) -> ToolResponse<Summary> {
    store.summary(args.start_date, args.end_date).into()
}

/// Delete an expense by its ID.
///
/// Reports an error when no expense has the given ID; a repeated delete of
/// the same ID reports the same error again.
pub fn delete_expense(
    store: &ExpenseStore,
    args: DeleteExpenseArgs,
) -> ToolResponse<ExpenseDeleted> {
    store
        .delete(args.expense_id)
        .map(|()| ExpenseDeleted {
            message: format!("Deleted expense {}", args.expense_id),
        })
        .into()
}
