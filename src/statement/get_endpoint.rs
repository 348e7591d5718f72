//! Defines the endpoints for looking up statements.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    app_state::lock_connection,
    statement::{
        StatementState,
        core::{OwnerScope, Statement, StatementKey},
        form::RefKeyForm,
        query::{count_statements, get_statement, get_statements},
    },
};

/// The body sent when a requested statement does not exist.
const STATEMENT_MISSING: &str = "Registro não encontrado!";

/// A route handler for getting an unscoped statement with its line items.
pub async fn get_statement_endpoint(
    State(state): State<StatementState>,
    Path(ref_key): Path<String>,
) -> Response {
    statement_response(&state, StatementKey::new(&ref_key, OwnerScope::Unscoped))
}

/// A route handler for getting a user's statement with its line items.
pub async fn get_user_statement_endpoint(
    State(state): State<StatementState>,
    Path((ref_key, email)): Path<(String, String)>,
) -> Response {
    statement_response(&state, StatementKey::new(&ref_key, OwnerScope::User(email)))
}

fn statement_response(state: &StatementState, key: StatementKey) -> Response {
    let result = lock_connection(&state.db_connection)
        .and_then(|connection| get_statement(&key, &connection));

    match result {
        Ok(Some(statement)) => (StatusCode::OK, Json(statement)).into_response(),
        Ok(None) => (StatusCode::BAD_REQUEST, STATEMENT_MISSING).into_response(),
        Err(error) => {
            tracing::error!("Could not get statement {}: {error}", key.reference);
            error.into_response()
        }
    }
}

/// A route handler for counting the unscoped statements with a reference.
pub async fn check_ref_key_endpoint(
    State(state): State<StatementState>,
    Path(ref_key): Path<String>,
) -> Result<Json<i64>, Error> {
    count_response(&state, StatementKey::new(&ref_key, OwnerScope::Unscoped))
}

/// A route handler for counting a user's statements with a reference.
pub async fn check_user_ref_key_endpoint(
    State(state): State<StatementState>,
    Path((ref_key, email)): Path<(String, String)>,
) -> Result<Json<i64>, Error> {
    count_response(&state, StatementKey::new(&ref_key, OwnerScope::User(email)))
}

fn count_response(state: &StatementState, key: StatementKey) -> Result<Json<i64>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    count_statements(&key, &connection).map(Json)
}

/// A route handler for getting every unscoped statement for a list of references.
pub async fn year_detail_endpoint(
    State(state): State<StatementState>,
    payload: Result<Json<Vec<RefKeyForm>>, JsonRejection>,
) -> Result<Json<Vec<Statement>>, Error> {
    year_detail_response(&state, OwnerScope::Unscoped, payload)
}

/// A route handler for getting every statement of a user for a list of references.
pub async fn year_detail_user_endpoint(
    State(state): State<StatementState>,
    Path(email): Path<String>,
    payload: Result<Json<Vec<RefKeyForm>>, JsonRejection>,
) -> Result<Json<Vec<Statement>>, Error> {
    year_detail_response(&state, OwnerScope::from_email(Some(&email)), payload)
}

fn year_detail_response(
    state: &StatementState,
    scope: OwnerScope,
    payload: Result<Json<Vec<RefKeyForm>>, JsonRejection>,
) -> Result<Json<Vec<Statement>>, Error> {
    let Json(ref_keys) = payload.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let references: Vec<&str> = ref_keys.iter().map(|form| form.refkey.trim()).collect();
    let connection = lock_connection(&state.db_connection)?;

    get_statements(&references, &scope, &connection).map(Json)
}
