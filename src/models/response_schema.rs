use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{DeviceRecord, OtpSummary, PaymentState};
use crate::notification::{CompletionReport, DispatchReport};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InitiatePaymentRes {
    pub success: bool,
    pub payment_id: String,
    pub state: PaymentState,
    pub expires_at: i64,
    pub dispatch: DispatchReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRes {
    pub success: bool,
    pub payment_id: String,
    pub state: PaymentState,
    pub notifications: CompletionReport,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelPaymentRes {
    pub success: bool,
    pub payment_id: String,
    pub state: PaymentState,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActiveOtpsRes {
    pub success: bool,
    pub data: Vec<OtpSummary>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DevicesRes {
    pub success: bool,
    pub data: Vec<DeviceRecord>,
}
