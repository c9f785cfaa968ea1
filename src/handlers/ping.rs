use axum::Json;

use crate::models::GenericResponse;

pub fn ping_message() -> String {
    format!("payment_otp_service v{} is up", env!("CARGO_PKG_VERSION"))
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/api/v1/ping",
    responses(
        (status = 200, description = "Service is up", body = GenericResponse)
    ),
    tag = "Debugging API"
)]
pub async fn ping_handler() -> Json<GenericResponse> {
    Json(GenericResponse {
        success: true,
        message: ping_message(),
    })
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode, routing::get, Router};
    use tower::ServiceExt; // for `oneshot` and `ready`

    use super::*;

    #[tokio::test]
    async fn test_ping_reports_version() {
        let app = Router::new().route("/ping", get(ping_handler));
        let req = Request::builder().uri("/ping").body(Body::empty()).unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = hyper::body::to_bytes(res.into_body()).await.unwrap();
        let res: GenericResponse = serde_json::from_slice(&body).unwrap();
        assert!(res.success);
        assert!(res.message.ends_with("is up"));
        assert!(res.message.contains(env!("CARGO_PKG_VERSION")));
    }
}
