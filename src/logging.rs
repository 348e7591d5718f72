//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{HeaderValue, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::Error;

/// The number of bytes of a body that are logged at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body that is buffered for logging, the same as axum's default body limit.
pub const REQUEST_BODY_LIMIT: usize = 2 * 1024 * 1024;

const REDACTED_FIELD: &str = "email";

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If the request or response body is longer than [LOG_BODY_LENGTH_LIMIT] bytes, it is
/// truncated and the full body is logged at the `debug` level.
/// Email addresses in JSON request bodies are redacted.
///
/// Bodies are passed on byte for byte. Requests with a body larger than [REQUEST_BODY_LIMIT]
/// are rejected with a validation error.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, REQUEST_BODY_LIMIT).await {
        Ok(body_bytes) => body_bytes,
        Err(error) => {
            tracing::warn!("Could not read request body: {error}");
            return Error::Validation(format!(
                "request body could not be read or is larger than {REQUEST_BODY_LIMIT} bytes"
            ))
            .into_response();
        }
    };

    let body_text = display_text(&body_bytes);
    if is_json(parts.headers.get(CONTENT_TYPE)) {
        log_request(&parts, &redact_json_field(&body_text, REDACTED_FIELD));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, Body::from(body_bytes));
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(body_bytes) => body_bytes,
        Err(error) => {
            tracing::warn!("Could not read response body: {error}");
            return Response::from_parts(parts, Body::empty());
        }
    };
    log_response(&parts, &display_text(&body_bytes));

    Response::from_parts(parts, Body::from(body_bytes))
}

/// A copy of `bytes` for the logs, invalid UTF-8 is replaced.
fn display_text(bytes: &Bytes) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn is_json(content_type: Option<&HeaderValue>) -> bool {
    content_type
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Replace the value of every `field_name` in the JSON document `json_text`, at any depth.
///
/// Text that is not valid JSON is returned unchanged.
fn redact_json_field(json_text: &str, field_name: &str) -> String {
    let Ok(mut document) = serde_json::from_str::<Value>(json_text) else {
        return json_text.to_owned();
    };

    redact_value(&mut document, field_name);

    document.to_string()
}

fn redact_value(value: &mut Value, field_name: &str) {
    match value {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                if key == field_name {
                    *child = Value::String("********".to_owned());
                } else {
                    redact_value(child, field_name);
                }
            }
        }
        Value::Array(values) => {
            for child in values {
                redact_value(child, field_name);
            }
        }
        _ => {}
    }
}

/// Cut `body` to at most [LOG_BODY_LENGTH_LIMIT] bytes without splitting a character.
fn truncate(body: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(body.len());
    while !body.is_char_boundary(end) {
        end -= 1;
    }

    &body[..end]
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {} {}\nbody: {:}...",
            parts.method,
            parts.uri,
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!(
            "Received request: {} {}\nbody: {body:?}",
            parts.method,
            parts.uri
        );
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Sending response: {}\nbody: {:}...",
            parts.status,
            truncate(body)
        );
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {}\nbody: {body:?}", parts.status);
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Bytes, http::HeaderValue, middleware};
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::{Value, json};

    use crate::{AppState, build_router, endpoints};

    use super::{
        LOG_BODY_LENGTH_LIMIT, REQUEST_BODY_LIMIT, is_json, logging_middleware, redact_json_field,
        truncate,
    };

    fn get_test_server() -> TestServer {
        let connection = Connection::open_in_memory().unwrap();
        let state = AppState::new(connection).expect("Could not create app state");
        let app = build_router(state).layer(middleware::from_fn(logging_middleware));

        TestServer::try_new(app).expect("Could not create test server.")
    }

    fn cart_bytes(description: &[u8]) -> Bytes {
        let mut body = br#"{"cart": {"header": {"reference": "012025", "totalvalue": 5.0}, "Items": [{"date": "05/01/2025", "description": ""#.to_vec();
        body.extend_from_slice(description);
        body.extend_from_slice(br#"", "value": 5.0, "classification": "Food"}]}}"#);

        Bytes::from(body)
    }

    #[tokio::test]
    async fn forwards_body_unchanged() {
        let server = get_test_server();

        server
            .post(endpoints::CREATE_CART)
            .content_type("application/json")
            .bytes(cart_bytes("Café".as_bytes()))
            .await
            .assert_status_ok();

        let statement = server.get("/Cart/CartItems/012025").await.json::<Value>();
        assert_eq!(statement["CartDetails"][0]["description"], "Café");
    }

    #[tokio::test]
    async fn invalid_utf8_body_is_rejected() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CREATE_CART)
            .content_type("application/json")
            .bytes(cart_bytes(b"Caf\xFF"))
            .await;

        response.assert_status_bad_request();
        server
            .get("/Cart/CheckRefKey/012025")
            .await
            .assert_json(&json!(0));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let server = get_test_server();

        let response = server
            .post(endpoints::CREATE_CART)
            .content_type("application/json")
            .bytes(cart_bytes(&vec![b'a'; REQUEST_BODY_LIMIT]))
            .await;

        response.assert_status_bad_request();
        assert_eq!(response.json::<Value>()["name"], "ValidationError");
    }

    #[test]
    fn redacts_nested_email() {
        let body = json!({
            "cart": {
                "header": {"reference": "012025", "totalvalue": 10.0},
                "user": {"name": "Ana", "email": "ana@example.com"},
            }
        })
        .to_string();

        let redacted: Value = serde_json::from_str(&redact_json_field(&body, "email")).unwrap();

        assert_eq!(redacted["cart"]["user"]["email"], "********");
        assert_eq!(redacted["cart"]["user"]["name"], "Ana");
        assert_eq!(redacted["cart"]["header"]["reference"], "012025");
    }

    #[test]
    fn redacts_email_inside_arrays() {
        let body = json!([{"email": "a@example.com"}, {"email": "b@example.com"}]).to_string();

        let redacted = redact_json_field(&body, "email");

        assert!(!redacted.contains("example.com"));
    }

    #[test]
    fn leaves_invalid_json_unchanged() {
        let body = "email=ana@example.com";

        assert_eq!(redact_json_field(body, "email"), body);
    }

    #[test]
    fn detects_json_content_type() {
        assert!(is_json(Some(&HeaderValue::from_static("application/json"))));
        assert!(is_json(Some(&HeaderValue::from_static(
            "application/json; charset=utf-8"
        ))));
        assert!(!is_json(Some(&HeaderValue::from_static("text/plain"))));
        assert!(!is_json(None));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let body = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&body);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(body.starts_with(truncated));
    }
}
