//! Application router configuration.

use axum::{
    Router,
    http::{HeaderValue, Method, header::CONTENT_TYPE},
    routing::{delete, get, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::{
    AppState, endpoints,
    not_found::get_404_not_found,
    statement::{
        check_ref_key_endpoint, check_user_ref_key_endpoint, create_statement_endpoint,
        delete_line_item_endpoint, delete_statement_endpoint, delete_user_statement_endpoint,
        edit_statement_endpoint, get_statement_endpoint, get_user_statement_endpoint,
        year_detail_endpoint, year_detail_user_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(endpoints::CART_ROOT, get(get_banner))
        .route(endpoints::CART_ITEMS, get(get_statement_endpoint))
        .route(endpoints::USER_CART_ITEMS, get(get_user_statement_endpoint))
        .route(endpoints::CHECK_REF_KEY, get(check_ref_key_endpoint))
        .route(
            endpoints::USER_CHECK_REF_KEY,
            get(check_user_ref_key_endpoint),
        )
        .route(endpoints::CREATE_CART, post(create_statement_endpoint))
        .route(endpoints::YEAR_DETAIL, post(year_detail_endpoint))
        .route(endpoints::USER_YEAR_DETAIL, post(year_detail_user_endpoint))
        .route(endpoints::UPDATE_CART, put(edit_statement_endpoint))
        .route(endpoints::DELETE_LINE_ITEM, delete(delete_line_item_endpoint))
        .route(endpoints::DELETE_STATEMENT, delete(delete_statement_endpoint))
        .route(
            endpoints::DELETE_USER_STATEMENT,
            delete(delete_user_statement_endpoint),
        )
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Build the CORS policy for browser clients served from `allowed_origins`.
///
/// Only GET, POST, PUT and DELETE with a `content-type` header are allowed. Origins that are not
/// valid header values are skipped.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!("Ignoring invalid allowed origin {origin:?}: {error}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
}

/// Let clients check that the API is up.
async fn get_banner() -> &'static str {
    "API de extratos executando!"
}
