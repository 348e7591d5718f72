//! Lookups of statements by reference key.

use rusqlite::{Connection, OptionalExtension, params_from_iter, types::Value};

use crate::{
    Error,
    database_id::DatabaseId,
    statement::core::{OwnerScope, Statement, StatementKey, get_line_items, map_statement_row},
};

/// Build a query over the statements whose reference is one of `references` in `scope`.
///
/// `select` is the column list, the statement table is aliased as `s`.
fn scoped_query(select: &str, references: &[&str], scope: &OwnerScope) -> (String, Vec<Value>) {
    let placeholders = vec!["?"; references.len()].join(", ");
    let mut params: Vec<Value> = references
        .iter()
        .map(|reference| Value::Text((*reference).to_owned()))
        .collect();

    let query = match scope {
        OwnerScope::Unscoped => format!(
            "SELECT {select} FROM statement s
            WHERE s.reference IN ({placeholders}) AND s.user_id IS NULL"
        ),
        OwnerScope::User(email) => {
            params.push(Value::Text(email.clone()));
            format!(
                "SELECT {select} FROM statement s
                INNER JOIN user u ON u.id = s.user_id
                WHERE s.reference IN ({placeholders}) AND u.email = ?"
            )
        }
    };

    (query, params)
}

/// Count the statements matching `key`.
///
/// Zero means the statement does not exist.
pub fn count_statements(key: &StatementKey, connection: &Connection) -> Result<i64, Error> {
    let (query, params) = scoped_query("COUNT(*)", &[key.reference.as_str()], &key.scope);

    connection
        .query_row(&query, params_from_iter(params), |row| row.get(0))
        .map_err(Error::from)
}

/// Find the ID of the statement matching `key`.
///
/// For user-scoped keys the owner's email must match.
pub(crate) fn find_statement_id_by_key(
    key: &StatementKey,
    connection: &Connection,
) -> Result<Option<DatabaseId>, Error> {
    let (query, params) = scoped_query("s.id", &[key.reference.as_str()], &key.scope);

    connection
        .query_row(&query, params_from_iter(params), |row| row.get(0))
        .optional()
        .map_err(Error::from)
}

/// Retrieve the statement matching `key` with all line items and classifications.
///
/// Returns `Ok(None)` if there is no such statement.
pub fn get_statement(
    key: &StatementKey,
    connection: &Connection,
) -> Result<Option<Statement>, Error> {
    let statements = get_statements(&[key.reference.as_str()], &key.scope, connection)?;

    Ok(statements.into_iter().next())
}

/// Retrieve every statement in `scope` whose reference is any of `references`, each with all
/// line items and classifications.
///
/// Statements are returned in insertion order.
pub fn get_statements(
    references: &[&str],
    scope: &OwnerScope,
    connection: &Connection,
) -> Result<Vec<Statement>, Error> {
    if references.is_empty() {
        return Ok(Vec::new());
    }

    let (query, params) = scoped_query(
        "s.id, s.reference, s.total_value, s.user_id",
        references,
        scope,
    );
    let query = format!("{query} ORDER BY s.id ASC");

    let mut statements = connection
        .prepare(&query)?
        .query_map(params_from_iter(params), map_statement_row)?
        .collect::<Result<Vec<Statement>, rusqlite::Error>>()?;

    for statement in &mut statements {
        statement.items = get_line_items(statement.id, connection)?;
    }

    Ok(statements)
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;
    use time::macros::date;

    use crate::{
        initialize_db,
        statement::{
            CartForm, HeaderForm, ItemForm, UserForm,
            core::{OwnerScope, StatementKey},
            create_or_upsert_statement,
        },
    };

    use super::{count_statements, get_statement, get_statements};

    fn get_test_db_connection() -> Connection {
        let connection = Connection::open_in_memory().unwrap();
        initialize_db(&connection).expect("Could not initialize database");
        connection
    }

    fn cart(reference: &str, email: Option<&str>) -> CartForm {
        CartForm {
            header: HeaderForm {
                reference: reference.to_owned(),
                total_value: 500.0,
            },
            user: email.map(|email| UserForm {
                name: "Ana".to_owned(),
                email: email.to_owned(),
            }),
            items: vec![ItemForm {
                date: "05/01/2025".to_owned(),
                description: "Groceries".to_owned(),
                value: 500.0,
                classification: "Food".to_owned(),
            }],
        }
    }

    #[test]
    fn count_is_zero_for_missing_reference() {
        let connection = get_test_db_connection();

        let count = count_statements(
            &StatementKey::new("nonexistent-ref", OwnerScope::Unscoped),
            &connection,
        );

        assert_eq!(count, Ok(0));
    }

    #[test]
    fn count_respects_owner() {
        let connection = get_test_db_connection();
        create_or_upsert_statement(&cart("012025", Some("ana@example.com")), &connection).unwrap();

        let own = StatementKey::new("012025", OwnerScope::User("ana@example.com".to_owned()));
        let other = StatementKey::new("012025", OwnerScope::User("bob@example.com".to_owned()));
        let unscoped = StatementKey::new("012025", OwnerScope::Unscoped);

        assert_eq!(count_statements(&own, &connection), Ok(1));
        assert_eq!(count_statements(&other, &connection), Ok(0));
        assert_eq!(count_statements(&unscoped, &connection), Ok(0));
    }

    #[test]
    fn get_statement_returns_full_tree() {
        let connection = get_test_db_connection();
        create_or_upsert_statement(&cart("012025", None), &connection).unwrap();

        let key = StatementKey::new("012025", OwnerScope::Unscoped);

        let statement = get_statement(&key, &connection)
            .unwrap()
            .expect("statement should exist");

        assert_eq!(statement.reference, "012025");
        assert_eq!(statement.total_value, 500.0);
        assert_eq!(statement.user_id, None);
        assert_eq!(statement.items.len(), 1);
        let item = &statement.items[0];
        assert_eq!(item.date, date!(2025 - 01 - 05));
        assert_eq!(item.value, 500.0);
        assert_eq!(item.statement_id, statement.id);
        assert_eq!(item.classification.as_ref().unwrap().label, "Food");
    }

    #[test]
    fn get_statement_returns_none_when_missing() {
        let connection = get_test_db_connection();

        let got = get_statement(&StatementKey::new("012025", OwnerScope::Unscoped), &connection);

        assert_eq!(got, Ok(None));
    }

    #[test]
    fn get_statements_matches_any_reference() {
        let connection = get_test_db_connection();
        for reference in ["012025", "022025", "032025"] {
            create_or_upsert_statement(&cart(reference, None), &connection).unwrap();
        }

        let statements =
            get_statements(&["012025", "032025", "122030"], &OwnerScope::Unscoped, &connection)
                .unwrap();

        let references: Vec<&str> = statements.iter().map(|s| s.reference.as_str()).collect();
        assert_eq!(references, ["012025", "032025"]);
        assert!(statements.iter().all(|s| s.items.len() == 1));
    }

    #[test]
    fn get_statements_filters_by_owner() {
        let connection = get_test_db_connection();
        create_or_upsert_statement(&cart("012025", Some("ana@example.com")), &connection).unwrap();
        create_or_upsert_statement(&cart("022025", Some("bob@example.com")), &connection).unwrap();

        let statements = get_statements(
            &["012025", "022025"],
            &OwnerScope::User("ana@example.com".to_owned()),
            &connection,
        )
        .unwrap();

        assert_eq!(statements.len(), 1);
        assert_eq!(statements[0].reference, "012025");
        assert!(statements[0].user_id.is_some());
    }

    #[test]
    fn get_statements_with_no_references_is_empty() {
        let connection = get_test_db_connection();

        assert_eq!(
            get_statements(&[], &OwnerScope::Unscoped, &connection),
            Ok(Vec::new())
        );
    }
}
