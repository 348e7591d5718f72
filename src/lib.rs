//! Cart is a small REST backend for tracking household expense statements.
//!
//! A statement ("cart") is identified by a period reference key, e.g. "012025", and holds a
//! total value plus dated line items, each tagged with exactly one classification label.
//! Statements may optionally be scoped to a user identified by email.
//!
//! This library provides the JSON API router, the application state and the data operations
//! behind it.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde::Serialize;
use tokio::signal;

mod app_state;
mod database_id;
mod date;
mod db;
mod endpoints;
mod logging;
mod not_found;
mod routing;
mod statement;
mod user;

pub use app_state::AppState;
pub use database_id::DatabaseId;
pub use date::parse_input_date;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::{build_router, cors_layer};
pub use statement::{
    CartForm, Classification, HeaderForm, ItemForm, LineItem, OwnerScope, Statement, StatementKey,
    UserForm, count_statements, create_or_upsert_statement, delete_line_item, delete_statement,
    get_statement, get_statements, update_statement,
};
pub use user::{User, UserId, get_or_create_user, get_user_by_email};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A date string could not be parsed as a `DD/MM/YYYY` calendar date.
    #[error("invalid date \"{0}\", expected a valid date in the format DD/MM/YYYY")]
    MalformedDate(String),

    /// A statement or line item key did not match any record.
    ///
    /// The string is the message shown to the client.
    #[error("{0}")]
    NotFound(String),

    /// A unique constraint was violated, e.g. a second statement for the same reference.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// The request was missing a required field or had a field with an invalid value.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    Database(rusqlite::Error),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLock,

    /// An error that does not fit any of the other kinds.
    #[error("an unknown error occurred: {0}")]
    Unknown(String),
}

impl Error {
    /// The name of the error kind as reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MalformedDate(_) => "MalformedDateError",
            Error::NotFound(_) => "NotFoundError",
            Error::DuplicateKey(_) => "DuplicateKeyError",
            Error::Validation(_) => "ValidationError",
            Error::Database(_) | Error::DatabaseLock => "DatabaseError",
            Error::Unknown(_) => "UnknownError",
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed, 1555 for a PRIMARY KEY.
            rusqlite::Error::SqliteFailure(sql_error, Some(desc))
                if sql_error.extended_code == 2067 || sql_error.extended_code == 1555 =>
            {
                Error::DuplicateKey(desc)
            }
            // Code 1299 occurs when a NOT NULL constraint failed, 275 for a CHECK.
            rusqlite::Error::SqliteFailure(sql_error, Some(desc))
                if sql_error.extended_code == 1299 || sql_error.extended_code == 275 =>
            {
                Error::Validation(desc)
            }
            rusqlite::Error::QueryReturnedNoRows => {
                Error::NotFound(statement::RECORD_NOT_FOUND.to_owned())
            }
            error @ rusqlite::Error::SqliteFailure(..) => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::Database(error)
            }
            error => {
                tracing::error!("an unexpected database error occurred: {}", error);
                Error::Unknown(error.to_string())
            }
        }
    }
}

/// The JSON body sent to the client when a request fails.
#[derive(Debug, Serialize)]
struct ErrorBody {
    name: &'static str,
    message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Database(_) | Error::DatabaseLock | Error::Unknown(_) => {
                tracing::error!("An unexpected error occurred: {}", self);
            }
            _ => tracing::debug!("Request failed: {}", self),
        }

        // Clients expect every failure as a 400.
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                name: self.kind(),
                message: self.to_string(),
            }),
        )
            .into_response()
    }
}
