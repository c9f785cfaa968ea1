use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::ping::ping_handler,
        crate::handlers::payment::initiate_payment_handler,
        crate::handlers::payment::confirm_payment_handler,
        crate::handlers::payment::cancel_payment_handler,
        crate::handlers::payment::active_otps_handler,
        crate::handlers::device::get_devices_handler,
        crate::handlers::device::register_device_handler,
        crate::handlers::device::unregister_device_handler,
        crate::handlers::device::device_heartbeat_handler,
    ),
    components(
        schemas(
            crate::models::InitiatePaymentReq,
            crate::models::ConfirmPaymentReq,
            crate::models::RegisterDeviceReq,
            crate::models::DeviceTokenReq,

            crate::models::GenericResponse,
            crate::models::InitiatePaymentRes,
            crate::models::ConfirmPaymentRes,
            crate::models::CancelPaymentRes,
            crate::models::ActiveOtpsRes,
            crate::models::DevicesRes,
            crate::devices::UnregisterResult,
            crate::utils::ErrorResponse,

            crate::models::PaymentState,
            crate::models::OtpSummary,
            crate::models::DeviceRecord,
            crate::notification::DispatchReport,
            crate::notification::CompletionReport,
            crate::notification::ChannelOutcome,
            crate::notification::ChannelStatus,
            crate::notification::Channel,
        )
    ),
    tags(
        (name = "Debugging API", description = "API for debugging purposes"),
        (name = "Payment API", description = "OTP confirmation of collected payments"),
        (name = "Device API", description = "Push device registration")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_payment_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/payments/{paymentId}/confirm"));
        assert!(doc.paths.paths.contains_key("/api/v1/users/{userId}/devices"));
    }
}
