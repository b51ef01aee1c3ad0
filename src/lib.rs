//! Outlay is a small record-keeping service for monetary expenses.
//!
//! The library persists expense entries in a SQLite database and answers
//! filtered queries and aggregate summaries over them. Its public contract
//! is a set of callable operations ("tools", see [tools]) intended for an
//! external agent or orchestrator rather than a human-facing UI. A thin
//! axum transport ([routing]) exposes each tool as a POST endpoint.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

pub mod app_state;
pub mod db;
pub mod expense;
pub mod routing;
pub mod store;
pub mod tools;

pub use app_state::AppState;
pub use db::initialize as initialize_db;
pub use expense::{Expense, ExpenseId, NewExpense};
pub use routing::build_router;
pub use store::ExpenseStore;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The date string for a new expense did not match the `YYYY-MM-DD`
    /// pattern, or named an impossible calendar date.
    #[error("date \"{0}\" must be a valid date in YYYY-MM-DD format")]
    InvalidDateFormat(String),

    /// The amount for a new expense was zero or negative.
    ///
    /// Expenses record money spent, so every amount must be strictly
    /// positive.
    #[error("amount must be positive, got {0}")]
    NonPositiveAmount(f64),

    /// Tried to delete an expense that is not in the database.
    ///
    /// Deleting the same ID twice reports this error both times; deletion is
    /// not idempotent from the caller's perspective.
    #[error("no expense found with ID {0}")]
    ExpenseNotFound(expense::ExpenseId),

    /// An unhandled/unexpected SQL error.
    ///
    /// Every query an operation runs either returns a row by construction
    /// (`INSERT ... RETURNING`, aggregates) or detects missing records from
    /// the affected-row count, so any SQL error that reaches this point is
    /// unexpected.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        tracing::error!("an unhandled SQL error occurred: {}", value);
        Error::SqlError(value)
    }
}
