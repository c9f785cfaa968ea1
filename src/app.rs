use axum::{
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{constants::*, handlers::*, state::AppState, swagger::ApiDoc};

pub fn build_app(state: AppState) -> Router {
    tracing::debug!("Initializing the app");
    let api = Router::new()
        .route("/ping", get(ping_handler))
        .route("/payments/:payment_id/otp", post(initiate_payment_handler))
        .route("/payments/:payment_id/confirm", post(confirm_payment_handler))
        .route("/payments/:payment_id/cancel", post(cancel_payment_handler))
        .route("/retailers/:retailer_id/otps", get(active_otps_handler))
        .route(
            "/users/:user_id/devices",
            get(get_devices_handler).post(register_device_handler),
        )
        .route(
            "/users/:user_id/devices/unregister",
            post(unregister_device_handler),
        )
        .route(
            "/users/:user_id/devices/heartbeat",
            post(device_heartbeat_handler),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .fallback(global_404_handler)
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
