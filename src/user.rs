//! Code for creating the user table and resolving statement owners.

use std::fmt::Display;

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The owner of user-scoped statements.
///
/// Users are identified by their email address, the name is informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The user's display name.
    pub name: String,
    /// The user's email address, unique across all users.
    pub email: String,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE
                )",
        (),
    )?;

    Ok(())
}

/// Get the user whose email is `email`, or `None` if there is no such user.
///
/// # Errors
///
/// Returns an [Error::Database] if an SQL related error occurred.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<Option<User>, Error> {
    connection
        .prepare("SELECT id, name, email FROM user WHERE email = :email")?
        .query_row(&[(":email", &email)], map_row)
        .optional()
        .map_err(Error::from)
}

/// Find the user with `email`, creating one named `name` if none exists.
///
/// An existing user keeps its stored name, only the email identifies a user.
///
/// # Errors
///
/// Returns an [Error::Validation] if the email is blank, or if a new user would be created with
/// a blank name, and an [Error::Database] if an SQL related error occurred.
pub fn get_or_create_user(name: &str, email: &str, connection: &Connection) -> Result<User, Error> {
    let email = email.trim();
    if email.is_empty() {
        return Err(Error::Validation("user email cannot be empty".to_owned()));
    }

    if let Some(user) = get_user_by_email(email, connection)? {
        tracing::debug!("Reusing existing user {}", user.id);
        return Ok(user);
    }

    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Validation("user name cannot be empty".to_owned()));
    }

    connection.execute(
        "INSERT INTO user (name, email) VALUES (?1, ?2)",
        (name, email),
    )?;
    let id = UserId::new(connection.last_insert_rowid());
    tracing::info!("Created user {id}");

    Ok(User {
        id,
        name: name.to_owned(),
        email: email.to_owned(),
    })
}

fn map_row(row: &Row) -> Result<User, rusqlite::Error> {
    Ok(User {
        id: UserId::new(row.get(0)?),
        name: row.get(1)?,
        email: row.get(2)?,
    })
}
