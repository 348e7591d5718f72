use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use serde_json::json;

pub async fn get_404_not_found(uri: Uri) -> Response {
    tracing::debug!("No route for {uri}");

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "name": "NotFoundError",
            "message": format!("Rota {} não encontrada", uri.path()),
        })),
    )
        .into_response()
}
