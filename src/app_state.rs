//! Implements a struct that holds the state shared by the tool endpoints.

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::{Error, db::initialize, store::ExpenseStore};

/// The state of the tool server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The expense store backing every tool.
    pub store: ExpenseStore,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for
    /// the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        let connection = Arc::new(Mutex::new(db_connection));

        Ok(Self {
            store: ExpenseStore::new(connection),
        })
    }
}

#[cfg(test)]
mod app_state_tests {
    use rusqlite::Connection;

    use super::AppState;

    #[test]
    fn new_initializes_schema() {
        let conn = Connection::open_in_memory().unwrap();

        let state = AppState::new(conn).unwrap();

        assert_eq!(state.store.count(), Ok(0));
    }
}
