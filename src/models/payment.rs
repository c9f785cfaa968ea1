use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::utils::deserialize_flexible_ts;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[allow(non_camel_case_types)]
pub enum PaymentState {
    INITIATED,
    OTP_SENT,
    OTP_VERIFIED,
    COMPLETED,
    CANCELLED,
}

impl PaymentState {
    pub fn to_bson(&self) -> anyhow::Result<Bson> {
        let bson = mongodb::bson::to_bson(self)?;
        Ok(bson)
    }

    /// Field stamped with the instant the payment entered this state
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            Self::INITIATED => "initiatedAt",
            Self::OTP_SENT => "otpSentAt",
            Self::OTP_VERIFIED => "otpVerifiedAt",
            Self::COMPLETED => "completedAt",
            Self::CANCELLED => "cancelledAt",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::COMPLETED | Self::CANCELLED)
    }
}

/// Payment document owned by the payment management side.
/// Only the fields this service consumes are mapped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub retailer_id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub total_paid: f64,
    pub state: PaymentState,

    #[serde(default, deserialize_with = "deserialize_flexible_ts")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,

    #[serde(default, deserialize_with = "deserialize_flexible_ts")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<i64>,
}
