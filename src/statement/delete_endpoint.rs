//! Defines the endpoints for deleting statements and line items.
//!
//! Deleting something that does not exist is not an error, the response message says nothing was
//! found instead.

use axum::{
    Json,
    extract::{Path, State},
};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    app_state::lock_connection,
    database_id::DatabaseId,
    statement::{
        StatementState,
        core::{OwnerScope, StatementKey},
        query::find_statement_id_by_key,
    },
};

type RowsAffected = usize;

/// The response to deleting a line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteItemResponse {
    /// The ID from the request.
    pub id: DatabaseId,
    /// Whether the line item was deleted or not found.
    #[serde(rename = "resposta")]
    pub message: String,
}

/// The response to deleting a statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteStatementResponse {
    /// The reference from the request.
    pub reference: String,
    /// Whether the statement was deleted or not found.
    #[serde(rename = "resposta")]
    pub message: String,
}

/// A route handler for deleting a line item and its classification.
pub async fn delete_line_item_endpoint(
    State(state): State<StatementState>,
    Path(item_id): Path<DatabaseId>,
) -> Result<Json<DeleteItemResponse>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let message = match delete_line_item(item_id, &connection)? {
        0 => format!("Nenhum registro encontrado com ID {item_id}."),
        _ => format!("Registro com ID {item_id} foi excluído com sucesso."),
    };
    tracing::info!("{message}");

    Ok(Json(DeleteItemResponse {
        id: item_id,
        message,
    }))
}

/// A route handler for deleting an unscoped statement and everything it holds.
pub async fn delete_statement_endpoint(
    State(state): State<StatementState>,
    Path(ref_key): Path<String>,
) -> Result<Json<DeleteStatementResponse>, Error> {
    delete_statement_response(&state, StatementKey::new(&ref_key, OwnerScope::Unscoped))
}

/// A route handler for deleting a user's statement and everything it holds.
pub async fn delete_user_statement_endpoint(
    State(state): State<StatementState>,
    Path((ref_key, email)): Path<(String, String)>,
) -> Result<Json<DeleteStatementResponse>, Error> {
    delete_statement_response(&state, StatementKey::new(&ref_key, OwnerScope::User(email)))
}

fn delete_statement_response(
    state: &StatementState,
    key: StatementKey,
) -> Result<Json<DeleteStatementResponse>, Error> {
    key.validate()?;
    let connection = lock_connection(&state.db_connection)?;

    let message = match delete_statement(&key, &connection)? {
        0 => format!("Nenhum registro encontrado com ID {}.", key.reference),
        _ => format!("Extrato {} foi excluído com sucesso.", key.reference),
    };
    tracing::info!("{message}");

    Ok(Json(DeleteStatementResponse {
        reference: key.reference,
        message,
    }))
}

/// Delete the line item `id` together with its classification.
///
/// Returns the number of line items deleted, zero if there was no such item.
pub fn delete_line_item(id: DatabaseId, connection: &Connection) -> Result<RowsAffected, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    transaction.execute("DELETE FROM classification WHERE item_id = ?1", [id])?;
    let rows_affected = transaction.execute("DELETE FROM line_item WHERE id = ?1", [id])?;

    transaction.commit()?;

    Ok(rows_affected)
}

/// Delete the statement matching `key` with all of its line items and classifications.
///
/// Rows are removed child first in one transaction. Returns the number of statements deleted,
/// zero if there was no such statement.
pub fn delete_statement(key: &StatementKey, connection: &Connection) -> Result<RowsAffected, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let Some(statement_id) = find_statement_id_by_key(key, &transaction)? else {
        return Ok(0);
    };

    transaction.execute(
        "DELETE FROM classification
        WHERE item_id IN (SELECT id FROM line_item WHERE statement_id = ?1)",
        [statement_id],
    )?;
    transaction.execute(
        "DELETE FROM line_item WHERE statement_id = ?1",
        [statement_id],
    )?;
    let rows_affected =
        transaction.execute("DELETE FROM statement WHERE id = ?1", [statement_id])?;

    transaction.commit()?;

    Ok(rows_affected)
}
