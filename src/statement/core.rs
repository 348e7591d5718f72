//! The statement aggregate: statements, their line items and classifications.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, database_id::DatabaseId, user::UserId};

/// Which partition of statements an operation works on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerScope {
    /// Statements that do not belong to any user.
    Unscoped,
    /// Statements owned by the user with this email.
    User(String),
}

impl OwnerScope {
    /// Build the scope from an optional owner email.
    pub fn from_email(email: Option<&str>) -> Self {
        match email {
            Some(email) => OwnerScope::User(email.trim().to_owned()),
            None => OwnerScope::Unscoped,
        }
    }

    /// Whether line items are matched on their date as well as their description.
    ///
    /// User-scoped statements may hold the same description on different days.
    pub fn matches_item_date(&self) -> bool {
        matches!(self, OwnerScope::User(_))
    }
}

/// Identifies a single statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementKey {
    /// The period reference, e.g. "012025".
    pub reference: String,
    /// The owner of the statement.
    pub scope: OwnerScope,
}

impl StatementKey {
    /// Create a key for `reference` in `scope`.
    ///
    /// Surrounding whitespace is removed from the reference and the owner email.
    pub fn new(reference: &str, scope: OwnerScope) -> Self {
        let scope = match scope {
            OwnerScope::User(email) => OwnerScope::User(email.trim().to_owned()),
            OwnerScope::Unscoped => OwnerScope::Unscoped,
        };

        Self {
            reference: reference.trim().to_owned(),
            scope,
        }
    }

    /// Check that the key can identify a statement.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the reference or the owner email is blank.
    pub fn validate(&self) -> Result<(), Error> {
        if self.reference.trim().is_empty() {
            return Err(Error::Validation("reference cannot be empty".to_owned()));
        }

        match &self.scope {
            OwnerScope::User(email) if email.trim().is_empty() => {
                Err(Error::Validation("user email cannot be empty".to_owned()))
            }
            _ => Ok(()),
        }
    }
}

/// A period's expense statement with all of its line items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    /// The ID of the statement.
    pub id: DatabaseId,
    /// The period reference, e.g. "012025".
    pub reference: String,
    /// The total value declared for the period.
    #[serde(rename = "totalvalue")]
    pub total_value: f64,
    /// The owning user, if the statement is user-scoped.
    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// The line items in insertion order.
    #[serde(rename = "CartDetails", default)]
    pub items: Vec<LineItem>,
}

/// One dated entry of a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// The ID of the line item.
    pub id: DatabaseId,
    /// The day the expense happened.
    pub date: Date,
    /// What the expense was for.
    pub description: String,
    /// The amount spent.
    pub value: f64,
    /// The statement the line item belongs to.
    #[serde(rename = "referenceId")]
    pub statement_id: DatabaseId,
    /// The category label of the line item.
    #[serde(rename = "Classification")]
    pub classification: Option<Classification>,
}

/// The category label attached to a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// The ID of the classification.
    pub id: DatabaseId,
    /// The category label, e.g. "Food".
    #[serde(rename = "classification")]
    pub label: String,
    /// The line item this classification belongs to.
    #[serde(rename = "itemId")]
    pub item_id: DatabaseId,
}

/// A validated line item that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLineItem {
    pub date: Date,
    pub description: String,
    pub value: f64,
    pub classification: String,
}

/// Create the statement, line item and classification tables.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_statement_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS statement (
            id INTEGER PRIMARY KEY,
            reference TEXT NOT NULL,
            total_value REAL NOT NULL,
            user_id INTEGER,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE UNIQUE INDEX IF NOT EXISTS idx_statement_key
            ON statement(reference, IFNULL(user_id, 0));

        CREATE TABLE IF NOT EXISTS line_item (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            description TEXT NOT NULL,
            value REAL NOT NULL,
            statement_id INTEGER NOT NULL,
            FOREIGN KEY(statement_id) REFERENCES statement(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_line_item_match
            ON line_item(statement_id, description, date);

        CREATE TABLE IF NOT EXISTS classification (
            id INTEGER PRIMARY KEY,
            label TEXT NOT NULL,
            item_id INTEGER NOT NULL UNIQUE,
            FOREIGN KEY(item_id) REFERENCES line_item(id) ON UPDATE CASCADE ON DELETE CASCADE
        );",
    )?;

    Ok(())
}

/// Find the ID of the statement for `reference` owned by `user_id`.
///
/// `None` for `user_id` looks up an unscoped statement.
pub(crate) fn find_statement_id(
    reference: &str,
    user_id: Option<UserId>,
    connection: &Connection,
) -> Result<Option<DatabaseId>, Error> {
    connection
        .query_row(
            "SELECT id FROM statement WHERE reference = ?1 AND user_id IS ?2",
            (reference, user_id.map(|id| id.as_i64())),
            |row| row.get(0),
        )
        .optional()
        .map_err(Error::from)
}

/// Find the line item of `statement_id` matching `item`.
///
/// Items are matched on description, and also on date when `match_date` is set.
pub(crate) fn find_line_item_id(
    statement_id: DatabaseId,
    item: &NewLineItem,
    match_date: bool,
    connection: &Connection,
) -> Result<Option<DatabaseId>, Error> {
    let found = if match_date {
        connection
            .query_row(
                "SELECT id FROM line_item
                WHERE statement_id = ?1 AND description = ?2 AND date = ?3
                ORDER BY id LIMIT 1",
                (statement_id, &item.description, item.date),
                |row| row.get(0),
            )
            .optional()?
    } else {
        connection
            .query_row(
                "SELECT id FROM line_item
                WHERE statement_id = ?1 AND description = ?2
                ORDER BY id LIMIT 1",
                (statement_id, &item.description),
                |row| row.get(0),
            )
            .optional()?
    };

    Ok(found)
}

/// Insert `items` and one classification per item under `statement_id`.
pub(crate) fn insert_line_items(
    statement_id: DatabaseId,
    items: &[NewLineItem],
    connection: &Connection,
) -> Result<(), Error> {
    let mut insert_item = connection.prepare(
        "INSERT INTO line_item (date, description, value, statement_id)
        VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut insert_classification =
        connection.prepare("INSERT INTO classification (label, item_id) VALUES (?1, ?2)")?;

    for item in items {
        let item_id =
            insert_item.insert((item.date, &item.description, item.value, statement_id))?;
        insert_classification.execute((&item.classification, item_id))?;
    }

    Ok(())
}

/// Set the label of the classification of `item_id`, creating it if it is missing.
pub(crate) fn upsert_classification(
    item_id: DatabaseId,
    label: &str,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        "INSERT INTO classification (label, item_id) VALUES (?1, ?2)
        ON CONFLICT(item_id) DO UPDATE SET label = excluded.label",
        (label, item_id),
    )?;

    Ok(())
}

/// Retrieve the line items of `statement_id`, with their classification, in insertion order.
pub(crate) fn get_line_items(
    statement_id: DatabaseId,
    connection: &Connection,
) -> Result<Vec<LineItem>, Error> {
    connection
        .prepare(
            "SELECT i.id, i.date, i.description, i.value, i.statement_id, c.id, c.label
            FROM line_item i
            LEFT JOIN classification c ON c.item_id = i.id
            WHERE i.statement_id = :statement_id
            ORDER BY i.id ASC",
        )?
        .query_map(&[(":statement_id", &statement_id)], map_line_item_row)?
        .map(|maybe_item| maybe_item.map_err(Error::from))
        .collect()
}

/// Map a row of `id, reference, total_value, user_id` to a statement without items.
pub(crate) fn map_statement_row(row: &Row) -> Result<Statement, rusqlite::Error> {
    let raw_user_id: Option<i64> = row.get(3)?;

    Ok(Statement {
        id: row.get(0)?,
        reference: row.get(1)?,
        total_value: row.get(2)?,
        user_id: raw_user_id.map(UserId::new),
        items: Vec::new(),
    })
}

fn map_line_item_row(row: &Row) -> Result<LineItem, rusqlite::Error> {
    let id = row.get(0)?;
    let classification_id: Option<DatabaseId> = row.get(5)?;
    let classification = match classification_id {
        Some(classification_id) => Some(Classification {
            id: classification_id,
            label: row.get(6)?,
            item_id: id,
        }),
        None => None,
    };

    Ok(LineItem {
        id,
        date: row.get(1)?,
        description: row.get(2)?,
        value: row.get(3)?,
        statement_id: row.get(4)?,
        classification,
    })
}
