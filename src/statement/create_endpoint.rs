//! Defines the endpoint for creating a statement or merging items into an existing one.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    app_state::lock_connection,
    database_id::DatabaseId,
    statement::{
        StatementState,
        core::{
            find_line_item_id, find_statement_id, insert_line_items, upsert_classification,
        },
        form::{CartForm, CartRequest, parse_items},
    },
    user::get_or_create_user,
};

/// A route handler for creating a statement, responds with a confirmation message.
pub async fn create_statement_endpoint(
    State(state): State<StatementState>,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Json<String>, Error> {
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let reference = request.cart.key().reference;
    let connection = lock_connection(&state.db_connection)?;

    create_or_upsert_statement(&request.cart, &connection).map_err(|error| {
        tracing::error!("Could not create statement {reference}: {error}");
        error
    })?;

    Ok(Json(format!("Registros criados referente ao {reference}")))
}

/// Create the statement described by `cart`, or merge `cart` into the existing statement with the
/// same key.
///
/// When the form has a user the statement belongs to that user, who is created if needed.
/// A new statement gets all items with their classifications. For an existing statement the total
/// value is replaced and each item either updates the value and classification of the item with
/// the same description (and date, for user-scoped statements) or is added.
///
/// Everything happens in one transaction, so either the whole form is applied or nothing is.
///
/// # Errors
/// Returns a:
/// - [Error::MalformedDate] if an item date is not a valid `DD/MM/YYYY` date,
/// - [Error::Validation] if the reference, user email or a new user's name is blank,
/// - [Error::Database] if there is some other SQL error.
pub fn create_or_upsert_statement(
    cart: &CartForm,
    connection: &Connection,
) -> Result<DatabaseId, Error> {
    let key = cart.key();
    key.validate()?;
    let items = parse_items(&cart.items)?;
    let match_date = key.scope.matches_item_date();

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    let user_id = match &cart.user {
        Some(user) => Some(get_or_create_user(&user.name, &user.email, &transaction)?.id),
        None => None,
    };

    let statement_id = match find_statement_id(&key.reference, user_id, &transaction)? {
        None => {
            transaction.execute(
                "INSERT INTO statement (reference, total_value, user_id) VALUES (?1, ?2, ?3)",
                (
                    &key.reference,
                    cart.header.total_value,
                    user_id.map(|id| id.as_i64()),
                ),
            )?;
            let statement_id = transaction.last_insert_rowid();
            insert_line_items(statement_id, &items, &transaction)?;
            tracing::info!(
                "Created statement {} with {} items",
                key.reference,
                items.len()
            );

            statement_id
        }
        Some(statement_id) => {
            transaction.execute(
                "UPDATE statement SET total_value = ?1 WHERE id = ?2",
                (cart.header.total_value, statement_id),
            )?;

            for item in &items {
                match find_line_item_id(statement_id, item, match_date, &transaction)? {
                    Some(item_id) => {
                        transaction.execute(
                            "UPDATE line_item SET value = ?1 WHERE id = ?2",
                            (item.value, item_id),
                        )?;
                        upsert_classification(item_id, &item.classification, &transaction)?;
                    }
                    None => {
                        insert_line_items(statement_id, std::slice::from_ref(item), &transaction)?
                    }
                }
            }
            tracing::info!(
                "Merged {} items into existing statement {}",
                items.len(),
                key.reference
            );

            statement_id
        }
    };

    transaction.commit()?;

    Ok(statement_id)
}
