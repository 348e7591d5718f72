//! Defines the endpoint for updating the values and labels of an existing statement.

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
        RECORD_NOT_FOUND, StatementState,
        core::{NewLineItem, StatementKey, find_line_item_id},
        form::{CartForm, CartRequest, parse_items},
        query::find_statement_id_by_key,
    },
};

/// A route handler for updating a statement, responds with a confirmation message.
pub async fn edit_statement_endpoint(
    State(state): State<StatementState>,
    payload: Result<Json<CartRequest>, JsonRejection>,
) -> Result<Json<&'static str>, Error> {
    let Json(request) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let connection = lock_connection(&state.db_connection)?;

    update_statement(&request.cart, &connection)?;

    Ok(Json("Atualização bem-sucedida!"))
}

/// Update the total value of the statement described by `cart` and the value and classification
/// of each of its items.
///
/// The statement and every item must already exist. Items are matched by description, and also
/// by date for user-scoped statements. Only the total value, the item values and the
/// classification labels change. The update is all or nothing: if any item cannot be found the
/// changes made so far are rolled back and the error is returned.
///
/// # Errors
/// Returns a:
/// - [Error::NotFound] if the statement or one of the items does not exist,
/// - [Error::MalformedDate] if an item date is not a valid `DD/MM/YYYY` date,
/// - [Error::Validation] if the reference or user email is blank,
/// - [Error::Database] if there is some other SQL error.
pub fn update_statement(cart: &CartForm, connection: &Connection) -> Result<(), Error> {
    let key = cart.key();
    key.validate()?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Immediate)?;

    // Dropping the transaction on error rolls back every change made so far.
    match apply_update(&key, cart, &transaction) {
        Ok(item_count) => {
            transaction.commit()?;
            tracing::info!(
                "Updated statement {} and {item_count} items",
                key.reference
            );
            Ok(())
        }
        Err(error) => {
            tracing::warn!(
                "Rolled back update of statement {}: {error}",
                key.reference
            );
            Err(error)
        }
    }
}

fn apply_update(
    key: &StatementKey,
    cart: &CartForm,
    connection: &Connection,
) -> Result<usize, Error> {
    let statement_id = find_statement_id_by_key(key, connection)?
        .ok_or_else(|| Error::NotFound(RECORD_NOT_FOUND.to_owned()))?;

    connection.execute(
        "UPDATE statement SET total_value = ?1 WHERE id = ?2",
        (cart.header.total_value, statement_id),
    )?;

    let items = parse_items(&cart.items)?;
    let match_date = key.scope.matches_item_date();

    for item in &items {
        update_item(statement_id, item, match_date, connection)?;
    }

    Ok(items.len())
}

fn update_item(
    statement_id: DatabaseId,
    item: &NewLineItem,
    match_date: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let item_not_found =
        || Error::NotFound(format!("CartDetail {} não encontrado", item.description));

    let item_id = find_line_item_id(statement_id, item, match_date, connection)?
        .ok_or_else(item_not_found)?;

    connection.execute(
        "UPDATE line_item SET value = ?1 WHERE id = ?2",
        (item.value, item_id),
    )?;

    let rows_affected = connection.execute(
        "UPDATE classification SET label = ?1 WHERE item_id = ?2",
        (&item.classification, item_id),
    )?;
    if rows_affected == 0 {
        return Err(item_not_found());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, extract::State};
    use rusqlite::Connection;

    use crate::{
        Error, initialize_db,
        statement::{
            RECORD_NOT_FOUND, StatementState,
            core::{OwnerScope, Statement, StatementKey},
            create_or_upsert_statement,
            form::{CartForm, CartRequest, HeaderForm, ItemForm, UserForm},
            get_statement,
        },
    };

    use super::{edit_statement_endpoint, update_statement};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).expect("Could not initialize database");
        connection
    }

    fn item(date: &str, description: &str, value: f64, classification: &str) -> ItemForm {
        ItemForm {
            date: date.to_owned(),
            description: description.to_owned(),
            value,
            classification: classification.to_owned(),
        }
    }

    fn cart(total_value: f64, email: Option<&str>, items: Vec<ItemForm>) -> CartForm {
        CartForm {
            header: HeaderForm {
                reference: "012025".to_owned(),
                total_value,
            },
            user: email.map(|email| UserForm {
                name: "Ana".to_owned(),
                email: email.to_owned(),
            }),
            items,
        }
    }

    fn seed(email: Option<&str>, connection: &Connection) -> Statement {
        let form = cart(
            600.0,
            email,
            vec![
                item("05/01/2025", "Groceries", 500.0, "Food"),
                item("10/01/2025", "Bus", 100.0, "Transport"),
            ],
        );
        create_or_upsert_statement(&form, connection).expect("Could not create test statement");

        get_statement(&form.key(), connection).unwrap().unwrap()
    }

    fn unscoped_key() -> StatementKey {
        StatementKey::new("012025", OwnerScope::Unscoped)
    }

    #[test]
    fn updates_total_values_and_labels() {
        let connection = get_test_db_connection();
        let before = seed(None, &connection);

        update_statement(
            &cart(
                650.0,
                None,
                vec![
                    item("05/01/2025", "Groceries", 520.0, "Supermarket"),
                    item("10/01/2025", "Bus", 130.0, "Commute"),
                ],
            ),
            &connection,
        )
        .unwrap();

        let after = get_statement(&unscoped_key(), &connection).unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.total_value, 650.0);
        assert_eq!(after.items[0].value, 520.0);
        assert_eq!(after.items[1].value, 130.0);
        assert_eq!(
            after.items[0].classification.as_ref().unwrap().label,
            "Supermarket"
        );
        assert_eq!(
            after.items[1].classification.as_ref().unwrap().label,
            "Commute"
        );
    }

    #[test]
    fn only_value_fields_change() {
        let connection = get_test_db_connection();
        let before = seed(None, &connection);

        // Unscoped items match on description only, so the date in the form is ignored.
        update_statement(
            &cart(600.0, None, vec![item("28/01/2025", "Groceries", 1.0, "Food")]),
            &connection,
        )
        .unwrap();

        let after = get_statement(&unscoped_key(), &connection).unwrap().unwrap();
        assert_eq!(after.reference, before.reference);
        assert_eq!(after.items[0].date, before.items[0].date);
        assert_eq!(after.items[0].description, before.items[0].description);
        assert_eq!(after.items[0].value, 1.0);
    }

    #[test]
    fn missing_statement_is_not_found_and_changes_nothing() {
        let connection = get_test_db_connection();
        let before = seed(None, &connection);
        let mut form = cart(1.0, None, vec![item("05/01/2025", "Groceries", 1.0, "X")]);
        form.header.reference = "022025".to_owned();

        let result = update_statement(&form, &connection);

        assert_eq!(result, Err(Error::NotFound(RECORD_NOT_FOUND.to_owned())));
        let after = get_statement(&unscoped_key(), &connection).unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn missing_item_rolls_back_every_change() {
        let connection = get_test_db_connection();
        let before = seed(None, &connection);

        let result = update_statement(
            &cart(
                999.0,
                None,
                vec![
                    item("05/01/2025", "Groceries", 1.0, "Changed"),
                    item("10/01/2025", "Bus", 2.0, "Changed"),
                    item("11/01/2025", "Taxi", 3.0, "Changed"),
                ],
            ),
            &connection,
        );

        assert_eq!(
            result,
            Err(Error::NotFound("CartDetail Taxi não encontrado".to_owned()))
        );
        let after = get_statement(&unscoped_key(), &connection).unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn malformed_date_rolls_back_every_change() {
        let connection = get_test_db_connection();
        let before = seed(None, &connection);

        let result = update_statement(
            &cart(999.0, None, vec![item("5-1-2025", "Groceries", 1.0, "X")]),
            &connection,
        );

        assert_eq!(result, Err(Error::MalformedDate("5-1-2025".to_owned())));
        let after = get_statement(&unscoped_key(), &connection).unwrap().unwrap();
        assert_eq!(after, before);
    }

    #[test]
    fn user_scope_requires_matching_owner() {
        let connection = get_test_db_connection();
        let before = seed(Some("ana@example.com"), &connection);

        let result = update_statement(
            &cart(
                1.0,
                Some("bob@example.com"),
                vec![item("05/01/2025", "Groceries", 1.0, "X")],
            ),
            &connection,
        );

        assert!(matches!(result, Err(Error::NotFound(_))));
        let key = StatementKey::new("012025", OwnerScope::User("ana@example.com".to_owned()));
        assert_eq!(get_statement(&key, &connection).unwrap().unwrap(), before);
    }

    #[test]
    fn user_scope_matches_items_by_date() {
        let connection = get_test_db_connection();
        seed(Some("ana@example.com"), &connection);

        let wrong_day = update_statement(
            &cart(
                1.0,
                Some("ana@example.com"),
                vec![item("06/01/2025", "Groceries", 1.0, "X")],
            ),
            &connection,
        );
        let right_day = update_statement(
            &cart(
                1.0,
                Some("ana@example.com"),
                vec![item("05/01/2025", "Groceries", 1.0, "X")],
            ),
            &connection,
        );

        assert!(matches!(wrong_day, Err(Error::NotFound(_))));
        assert_eq!(right_day, Ok(()));
    }

    #[tokio::test]
    async fn endpoint_surfaces_errors_after_rollback() {
        let state = StatementState {
            db_connection: Arc::new(Mutex::new(get_test_db_connection())),
        };
        let request = CartRequest {
            cart: cart(1.0, None, Vec::new()),
        };

        let response = edit_statement_endpoint(State(state), Ok(Json(request))).await;

        assert_eq!(
            response.map(|Json(message)| message),
            Err(Error::NotFound(RECORD_NOT_FOUND.to_owned()))
        );
    }

    #[tokio::test]
    async fn endpoint_confirms_update() {
        let connection = get_test_db_connection();
        seed(None, &connection);
        let state = StatementState {
            db_connection: Arc::new(Mutex::new(connection)),
        };
        let request = CartRequest {
            cart: cart(1.0, None, vec![item("05/01/2025", "Groceries", 1.0, "X")]),
        };

        let response = edit_statement_endpoint(State(state), Ok(Json(request))).await;

        assert_eq!(
            response.map(|Json(message)| message),
            Ok("Atualização bem-sucedida!")
        );
    }
}
