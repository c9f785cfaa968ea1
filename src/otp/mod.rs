use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    config::OtpSettings,
    models::OtpRecord,
    utils::{generate_otp, Clock},
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryOtpRepository;
pub use mongo::MongoOtpRepository;

#[derive(Debug, thiserror::Error)]
pub enum OtpError {
    #[error("no otp found for this payment")]
    NotFound,
    #[error("otp has already been used")]
    AlreadyUsed,
    #[error("otp has expired, request a new one")]
    Expired,
    #[error("too many wrong attempts, contact support")]
    AttemptsExhausted,
    #[error("wrong otp, {attempts_left} attempts left")]
    InvalidCode { attempts_left: u32 },
    #[error("an active otp already exists for this payment")]
    DuplicateActiveOtp,
    #[error("otp storage error")]
    Storage(#[from] anyhow::Error),
}

impl OtpError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyUsed => "ALREADY_USED",
            Self::Expired => "EXPIRED",
            Self::AttemptsExhausted => "ATTEMPTS_EXHAUSTED",
            Self::InvalidCode { .. } => "INVALID_CODE",
            Self::DuplicateActiveOtp => "DUPLICATE_ACTIVE_OTP",
            Self::Storage(_) => "INTERNAL",
        }
    }
}

/// Persistence primitives for OTP records.
/// Every method is a single atomic operation on one document.
#[async_trait]
pub trait OtpRepository: Send + Sync {
    /// Insert `record` unless an active code exists for the same payment.
    /// Returns `false` when an active one was found.
    async fn insert_if_no_active(
        &self,
        record: &OtpRecord,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<bool>;

    /// Mark the active record used when `code` matches
    async fn consume(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>>;

    /// Increment attempts of the active record when `code` does not match
    async fn charge_attempt(
        &self,
        payment_id: &str,
        code: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Option<OtpRecord>>;

    /// Most recently created record for the payment, active or not
    async fn latest(&self, payment_id: &str) -> anyhow::Result<Option<OtpRecord>>;

    async fn active_for_retailer(
        &self,
        retailer_id: &str,
        now: i64,
        ceiling: u32,
    ) -> anyhow::Result<Vec<OtpRecord>>;

    /// Expire every unused record of the payment, returns how many changed
    async fn invalidate(&self, payment_id: &str, now: i64) -> anyhow::Result<u64>;
}

pub struct OtpStore {
    repo: Arc<dyn OtpRepository>,
    clock: Arc<dyn Clock>,
    settings: OtpSettings,
}

impl OtpStore {
    pub fn new(repo: Arc<dyn OtpRepository>, clock: Arc<dyn Clock>, settings: OtpSettings) -> Self {
        Self {
            repo,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &OtpSettings {
        &self.settings
    }

    /// Generate and persist a new code for the payment
    pub async fn issue(
        &self,
        payment_id: &str,
        retailer_id: &str,
        amount: f64,
        line_worker_name: &str,
    ) -> Result<OtpRecord, OtpError> {
        let code = generate_otp(self.settings.length);
        self.issue_code(payment_id, retailer_id, amount, line_worker_name, &code)
            .await
    }

    async fn issue_code(
        &self,
        payment_id: &str,
        retailer_id: &str,
        amount: f64,
        line_worker_name: &str,
        code: &str,
    ) -> Result<OtpRecord, OtpError> {
        let now = self.clock.now_ms();
        let record = OtpRecord::new(
            payment_id,
            retailer_id,
            code,
            amount,
            line_worker_name,
            now,
            self.settings.validity_ms(),
        );
        let inserted = self
            .repo
            .insert_if_no_active(&record, now, self.settings.max_attempts)
            .await?;
        if !inserted {
            tracing::debug!("active otp already exists for payment {payment_id}");
            return Err(OtpError::DuplicateActiveOtp);
        }
        tracing::debug!("otp issued for payment {payment_id}");
        Ok(record)
    }

    /// Check a submitted code against the payment's record.
    /// The success and the failure paths are each one conditional update, so
    /// concurrent submissions can neither both succeed nor skip an attempt.
    pub async fn verify(&self, payment_id: &str, code: &str) -> Result<OtpRecord, OtpError> {
        let now = self.clock.now_ms();
        let ceiling = self.settings.max_attempts;
        if let Some(record) = self.repo.consume(payment_id, code, now, ceiling).await? {
            tracing::debug!("otp verified for payment {payment_id}");
            return Ok(record);
        }
        if let Some(record) = self
            .repo
            .charge_attempt(payment_id, code, now, ceiling)
            .await?
        {
            let attempts_left = ceiling.saturating_sub(record.attempts);
            tracing::debug!("wrong otp for payment {payment_id}, {attempts_left} attempts left");
            return Err(OtpError::InvalidCode { attempts_left });
        }
        // neither update matched, the record is missing or inert
        let record = self
            .repo
            .latest(payment_id)
            .await?
            .ok_or(OtpError::NotFound)?;
        // expiry wins over every other state, a used code past its window reads as expired
        let err = if record.is_expired(now) {
            OtpError::Expired
        } else if record.is_used {
            OtpError::AlreadyUsed
        } else if record.is_exhausted(ceiling) {
            OtpError::AttemptsExhausted
        } else {
            // superseded between the updates and the read
            OtpError::InvalidCode {
                attempts_left: ceiling.saturating_sub(record.attempts),
            }
        };
        tracing::debug!("otp rejected for payment {payment_id}: {err}");
        Err(err)
    }

    /// Latest record of the payment when it was consumed with `code`
    pub async fn consumed_with(
        &self,
        payment_id: &str,
        code: &str,
    ) -> Result<Option<OtpRecord>, OtpError> {
        let record = self.repo.latest(payment_id).await?;
        Ok(record.filter(|rec| rec.is_used && rec.code == code))
    }

    pub async fn active_otps_for_retailer(
        &self,
        retailer_id: &str,
    ) -> Result<Vec<OtpRecord>, OtpError> {
        let now = self.clock.now_ms();
        let records = self
            .repo
            .active_for_retailer(retailer_id, now, self.settings.max_attempts)
            .await?;
        Ok(records)
    }

    pub async fn invalidate(&self, payment_id: &str) -> Result<u64, OtpError> {
        let now = self.clock.now_ms();
        let count = self.repo.invalidate(payment_id, now).await?;
        if count > 0 {
            tracing::debug!("invalidated {count} otp(s) for payment {payment_id}");
        }
        Ok(count)
    }
}
