//! This file defines the `Expense` model and the validated builder used to
//! create one.
//!
//! Validation happens here, before any database interaction: the date must
//! be a real calendar date written exactly as `YYYY-MM-DD`, and the amount
//! must be strictly positive. Records that reach the store are therefore
//! always well-formed.

use serde::{Deserialize, Serialize};
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};

use crate::Error;

/// Alias for the type used for expense row IDs in the database.
pub type ExpenseId = i64;

/// The date format used for expense entries, e.g. "2024-01-15".
const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Parse an expense date from text in `YYYY-MM-DD` format.
///
/// The whole input must match: extra characters, surrounding whitespace,
/// other separators and impossible calendar dates are all rejected.
///
/// # Errors
/// Returns an [Error::InvalidDateFormat] containing the rejected text.
pub fn parse_date(text: &str) -> Result<Date, Error> {
    Date::parse(text, DATE_FORMAT).map_err(|_| Error::InvalidDateFormat(text.to_string()))
}

/// A single spending record.
///
/// To create a new `Expense`, pass a [NewExpense] to
/// [ExpenseStore::create](crate::store::ExpenseStore::create). Expenses are
/// read-only once created; the only mutation is deletion by ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// The ID of the expense. Assigned by the store, never reused after
    /// deletion.
    pub id: ExpenseId,
    /// The day the money was spent.
    pub date: Date,
    /// How much money was spent. Always greater than zero.
    pub amount: f64,
    /// The main category of the expense, e.g. "Food" or "Transport".
    pub category: String,
    /// An optional finer-grained category, e.g. "Groceries".
    pub subcategory: String,
    /// An optional free-text note.
    pub note: String,
}

/// An expense that has passed validation but has not been given an ID by the
/// store yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// The day the money was spent.
    pub date: Date,
    /// How much money was spent.
    pub amount: f64,
    /// The main category of the expense.
    pub category: String,
    /// An optional finer-grained category.
    pub subcategory: String,
    /// An optional free-text note.
    pub note: String,
}

impl NewExpense {
    /// Create a new expense from the required fields, validating them.
    ///
    /// `subcategory` and `note` default to the empty string and can be set
    /// with the builder functions of the same name.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::InvalidDateFormat] if `date` is not a valid `YYYY-MM-DD`
    ///   date,
    /// - [Error::NonPositiveAmount] if `amount` is zero or negative.
    pub fn new(date: &str, amount: f64, category: &str) -> Result<Self, Error> {
        let date = parse_date(date)?;

        if amount <= 0.0 {
            return Err(Error::NonPositiveAmount(amount));
        }

        Ok(Self {
            date,
            amount,
            category: category.to_string(),
            subcategory: String::new(),
            note: String::new(),
        })
    }

    /// Set the subcategory of the expense.
    pub fn subcategory(mut self, subcategory: &str) -> Self {
        self.subcategory = subcategory.to_string();
        self
    }

    /// Set the note of the expense.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.to_string();
        self
    }
}
