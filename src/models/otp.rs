use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One time code bound to a single payment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OtpRecord {
    pub payment_id: String,
    pub retailer_id: String,
    pub code: String,
    pub amount: f64,
    pub line_worker_name: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub is_used: bool,
    pub attempts: u32,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<i64>,

    #[serde(default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalidated_at: Option<i64>,
}

impl OtpRecord {
    pub fn new(
        payment_id: &str,
        retailer_id: &str,
        code: &str,
        amount: f64,
        line_worker_name: &str,
        now: i64,
        validity_ms: i64,
    ) -> Self {
        Self {
            payment_id: payment_id.to_owned(),
            retailer_id: retailer_id.to_owned(),
            code: code.to_owned(),
            amount,
            line_worker_name: line_worker_name.to_owned(),
            created_at: now,
            expires_at: now + validity_ms,
            is_used: false,
            attempts: 0,
            used_at: None,
            invalidated_at: None,
        }
    }

    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    pub fn is_exhausted(&self, ceiling: u32) -> bool {
        self.attempts >= ceiling
    }

    /// unused, unexpired and still accepting attempts
    pub fn is_active(&self, now: i64, ceiling: u32) -> bool {
        !self.is_used && !self.is_expired(now) && !self.is_exhausted(ceiling)
    }
}

/// Diagnostic view of an OTP record, the code itself is never exposed
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OtpSummary {
    pub payment_id: String,
    pub retailer_id: String,
    pub amount: f64,
    pub line_worker_name: String,
    pub created_at: i64,
    pub expires_at: i64,
    pub attempts: u32,
}

impl From<OtpRecord> for OtpSummary {
    fn from(record: OtpRecord) -> Self {
        Self {
            payment_id: record.payment_id,
            retailer_id: record.retailer_id,
            amount: record.amount,
            line_worker_name: record.line_worker_name,
            created_at: record.created_at,
            expires_at: record.expires_at,
            attempts: record.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_is_active_until_expiry() {
        let otp = OtpRecord::new("P1", "R1", "482913", 1500.0, "Suresh", 1_000, 600_000);
        assert_eq!(otp.expires_at, 601_000);
        assert_eq!(otp.attempts, 0);
        assert!(!otp.is_used);
        assert!(otp.is_active(601_000, 3));
        assert!(!otp.is_active(601_001, 3));
    }

    #[test]
    fn test_exhausted_record_is_inert() {
        let mut otp = OtpRecord::new("P1", "R1", "482913", 1500.0, "Suresh", 0, 600_000);
        otp.attempts = 3;
        assert!(otp.is_exhausted(3));
        assert!(!otp.is_active(10, 3));
    }
}
