use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    devices::UnregisterResult,
    models::{DeviceTokenReq, DevicesRes, GenericResponse, RegisterDeviceReq},
    state::AppState,
    utils::{AppError, ErrorResponse, ValidatedBody},
};

#[utoipa::path(
    get,
    path = "/api/v1/users/{userId}/devices",
    params(("userId" = String, Path, description = "User identifier")),
    responses(
        (status = 200, description = "Registered devices", body = DevicesRes),
    ),
    tag = "Device API"
)]
pub async fn get_devices_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<DevicesRes>, AppError> {
    let devices = state.devices.devices(&user_id).await?;
    let res = DevicesRes {
        success: true,
        data: devices,
    };
    Ok(Json(res))
}

/// Register a push token
///
/// Registering a token the user already has refreshes it instead of adding another entry.
#[utoipa::path(
    post,
    path = "/api/v1/users/{userId}/devices",
    params(("userId" = String, Path, description = "User identifier")),
    request_body = RegisterDeviceReq,
    responses(
        (status = 200, description = "Device registered", body = GenericResponse),
        (status = 400, description = "Invalid body", body = ErrorResponse),
    ),
    tag = "Device API"
)]
pub async fn register_device_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedBody(body): ValidatedBody<RegisterDeviceReq>,
) -> Result<Json<GenericResponse>, AppError> {
    state
        .devices
        .register(&user_id, &body.token, &body.user_agent)
        .await?;
    let res = GenericResponse {
        success: true,
        message: "Device registered".to_owned(),
    };
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{userId}/devices/unregister",
    params(("userId" = String, Path, description = "User identifier")),
    request_body = DeviceTokenReq,
    responses(
        (status = 200, description = "Token removed or was not registered", body = UnregisterResult),
    ),
    tag = "Device API"
)]
pub async fn unregister_device_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedBody(body): ValidatedBody<DeviceTokenReq>,
) -> Result<Json<UnregisterResult>, AppError> {
    let res = state.devices.unregister(&user_id, &body.token).await?;
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/api/v1/users/{userId}/devices/heartbeat",
    params(("userId" = String, Path, description = "User identifier")),
    request_body = DeviceTokenReq,
    responses(
        (status = 200, description = "Heartbeat recorded", body = GenericResponse),
    ),
    tag = "Device API"
)]
pub async fn device_heartbeat_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    ValidatedBody(body): ValidatedBody<DeviceTokenReq>,
) -> Result<Json<GenericResponse>, AppError> {
    let touched = state.devices.touch(&user_id, &body.token).await?;
    let message = if touched {
        "Heartbeat recorded"
    } else {
        "Device is not registered"
    };
    let res = GenericResponse {
        success: true,
        message: message.to_owned(),
    };
    Ok(Json(res))
}
