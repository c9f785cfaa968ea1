use axum::{
    http::{Method, StatusCode, Uri},
    response::IntoResponse,
    Json,
};

use crate::utils::ErrorResponse;

/// Fallback for every unmatched route
pub async fn global_404_handler(method: Method, uri: Uri) -> impl IntoResponse {
    let message = format!("No route for {method} {uri}");
    tracing::debug!("{message}");
    let body = ErrorResponse {
        success: false,
        kind: "NOT_FOUND".to_owned(),
        message,
        attempts_left: None,
    };
    (StatusCode::NOT_FOUND, Json(body))
}
