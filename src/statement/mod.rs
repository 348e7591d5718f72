//! Statements (a month of card spending), their line items and the classification of each item.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::AppState;

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod form;
mod get_endpoint;
mod query;

pub use core::{
    Classification, LineItem, OwnerScope, Statement, StatementKey, create_statement_tables,
};
pub use create_endpoint::{create_or_upsert_statement, create_statement_endpoint};
pub use delete_endpoint::{
    delete_line_item, delete_line_item_endpoint, delete_statement, delete_statement_endpoint,
    delete_user_statement_endpoint,
};
pub use edit_endpoint::{edit_statement_endpoint, update_statement};
pub use form::{CartForm, HeaderForm, ItemForm, UserForm};
pub use get_endpoint::{
    check_ref_key_endpoint, check_user_ref_key_endpoint, get_statement_endpoint,
    get_user_statement_endpoint, year_detail_endpoint, year_detail_user_endpoint,
};
pub use query::{count_statements, get_statement, get_statements};

/// The message for a statement that does not exist.
pub const RECORD_NOT_FOUND: &str = "Registro não encontrado";

/// The state needed by the statement endpoints.
#[derive(Debug, Clone)]
pub struct StatementState {
    /// The database connection for managing statements.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for StatementState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}
