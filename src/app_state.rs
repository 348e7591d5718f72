//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::{Error, db::initialize};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(db_connection: Connection) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            db_connection: Arc::new(Mutex::new(db_connection)),
        })
    }

    /// Close the database connection.
    ///
    /// Should be called once the server has stopped. If other clones of the state are still
    /// alive the connection is left open and closed when the last clone is dropped.
    ///
    /// # Errors
    /// Returns an error if SQLite could not close the connection cleanly.
    pub fn close(self) -> Result<(), Error> {
        let mutex = match Arc::try_unwrap(self.db_connection) {
            Ok(mutex) => mutex,
            Err(_) => {
                tracing::warn!("database connection is still shared, deferring close");
                return Ok(());
            }
        };

        let connection = mutex.into_inner().map_err(|_| Error::DatabaseLock)?;
        connection
            .close()
            .map_err(|(_, error)| Error::from(error))?;
        tracing::info!("Closed database connection");

        Ok(())
    }
}

/// Lock the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLock] if the mutex was poisoned by a panicking thread.
pub(crate) fn lock_connection(
    db_connection: &Mutex<Connection>,
) -> Result<MutexGuard<'_, Connection>, Error> {
    db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLock
    })
}
