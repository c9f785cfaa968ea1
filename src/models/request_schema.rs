use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentReq {
    #[validate(length(min = 1))]
    pub retailer_id: String,

    #[validate(range(min = 0.01))]
    pub amount: f64,

    #[validate(length(min = 1, max = 100))]
    pub line_worker_name: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ConfirmPaymentReq {
    // compared verbatim with the stored code, no trimming
    #[validate(length(min = 1, max = 12))]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDeviceReq {
    #[validate(length(min = 1))]
    pub token: String,

    #[serde(default)]
    #[validate(length(max = 512))]
    pub user_agent: String,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct DeviceTokenReq {
    #[validate(length(min = 1))]
    pub token: String,
}
