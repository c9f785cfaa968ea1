use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    models::{
        ActiveOtpsRes, CancelPaymentRes, ConfirmPaymentReq, ConfirmPaymentRes,
        InitiatePaymentReq, InitiatePaymentRes,
    },
    state::AppState,
    utils::{AppError, ErrorResponse, ValidatedBody},
};

/// Issue and send an OTP for a payment
///
/// Issues a fresh code (superseding an active one) and delivers it to the retailer by push, falling back to SMS.
/// The dispatch report tells which channel was used; a failed delivery does not fail the request.
#[utoipa::path(
    post,
    path = "/api/v1/payments/{paymentId}/otp",
    params(("paymentId" = String, Path, description = "Payment identifier")),
    request_body = InitiatePaymentReq,
    responses(
        (status = 200, description = "OTP issued", body = InitiatePaymentRes),
        (status = 404, description = "Payment not found", body = ErrorResponse),
        (status = 409, description = "Payment can not receive an OTP in its current state", body = ErrorResponse),
    ),
    tag = "Payment API"
)]
pub async fn initiate_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    ValidatedBody(body): ValidatedBody<InitiatePaymentReq>,
) -> Result<Json<InitiatePaymentRes>, AppError> {
    let outcome = state
        .flow
        .initiate(
            &payment_id,
            &body.retailer_id,
            body.amount,
            &body.line_worker_name,
        )
        .await?;
    let res = InitiatePaymentRes {
        success: true,
        payment_id: outcome.payment_id,
        state: outcome.state,
        expires_at: outcome.expires_at,
        dispatch: outcome.dispatch,
    };
    Ok(Json(res))
}

/// Confirm a payment with the OTP the retailer received
#[utoipa::path(
    post,
    path = "/api/v1/payments/{paymentId}/confirm",
    params(("paymentId" = String, Path, description = "Payment identifier")),
    request_body = ConfirmPaymentReq,
    responses(
        (status = 200, description = "Payment completed", body = ConfirmPaymentRes),
        (status = 400, description = "Wrong code, attemptsLeft tells how many tries remain", body = ErrorResponse),
        (status = 404, description = "No code issued or code already used", body = ErrorResponse),
        (status = 409, description = "Payment is not awaiting a code", body = ErrorResponse),
        (status = 410, description = "Code expired", body = ErrorResponse),
        (status = 429, description = "Too many wrong attempts", body = ErrorResponse),
    ),
    tag = "Payment API"
)]
pub async fn confirm_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
    ValidatedBody(body): ValidatedBody<ConfirmPaymentReq>,
) -> Result<Json<ConfirmPaymentRes>, AppError> {
    let outcome = state.flow.confirm(&payment_id, &body.code).await?;
    let res = ConfirmPaymentRes {
        success: true,
        payment_id: outcome.payment_id,
        state: outcome.state,
        notifications: outcome.notifications,
    };
    Ok(Json(res))
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/{paymentId}/cancel",
    params(("paymentId" = String, Path, description = "Payment identifier")),
    responses(
        (status = 200, description = "Payment cancelled", body = CancelPaymentRes),
        (status = 409, description = "Payment already completed or cancelled", body = ErrorResponse),
    ),
    tag = "Payment API"
)]
pub async fn cancel_payment_handler(
    State(state): State<AppState>,
    Path(payment_id): Path<String>,
) -> Result<Json<CancelPaymentRes>, AppError> {
    let outcome = state.flow.cancel(&payment_id).await?;
    let res = CancelPaymentRes {
        success: true,
        payment_id: outcome.payment_id,
        state: outcome.state,
    };
    Ok(Json(res))
}

/// Active OTPs of a retailer, without the codes
#[utoipa::path(
    get,
    path = "/api/v1/retailers/{retailerId}/otps",
    params(("retailerId" = String, Path, description = "Retailer identifier")),
    responses(
        (status = 200, description = "Active OTPs", body = ActiveOtpsRes),
    ),
    tag = "Debugging API"
)]
pub async fn active_otps_handler(
    State(state): State<AppState>,
    Path(retailer_id): Path<String>,
) -> Result<Json<ActiveOtpsRes>, AppError> {
    let records = state.otp_store.active_otps_for_retailer(&retailer_id).await?;
    let res = ActiveOtpsRes {
        success: true,
        data: records.into_iter().map(Into::into).collect(),
    };
    Ok(Json(res))
}
