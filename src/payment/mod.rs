use async_trait::async_trait;
use std::sync::Arc;

use crate::{
    directory::Directory,
    models::{OtpRecord, Payment, PaymentState},
    notification::{
        CompletionNotice, CompletionReport, DispatchReport, NotificationDispatcher, OtpNotice,
    },
    otp::{OtpError, OtpStore},
    utils::Clock,
};

pub mod memory;
pub mod mongo;

pub use memory::MemoryPaymentRepository;
pub use mongo::MongoPaymentRepository;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("payment {0} not found")]
    PaymentNotFound(String),
    #[error("payment {payment_id} is {state:?}")]
    InvalidState {
        payment_id: String,
        state: PaymentState,
    },
    #[error("payment {payment_id} belongs to another retailer")]
    RetailerMismatch { payment_id: String },
    #[error(transparent)]
    Otp(#[from] OtpError),
    #[error("payment flow error")]
    Internal(#[from] anyhow::Error),
}

impl FlowError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::InvalidState { .. } => "INVALID_STATE",
            Self::RetailerMismatch { .. } => "RETAILER_MISMATCH",
            Self::Otp(err) => err.kind(),
            Self::Internal(_) => "INTERNAL",
        }
    }
}

/// Access to payment documents owned by the payment management side.
/// Only the state and its timestamps are ever written.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn find(&self, payment_id: &str) -> anyhow::Result<Option<Payment>>;

    /// Move the payment to `to` only if it currently is in one of `from`
    async fn transition(
        &self,
        payment_id: &str,
        from: &[PaymentState],
        to: PaymentState,
        now: i64,
    ) -> anyhow::Result<bool>;
}

#[derive(Debug)]
pub struct InitiateOutcome {
    pub payment_id: String,
    pub state: PaymentState,
    pub expires_at: i64,
    pub dispatch: DispatchReport,
}

#[derive(Debug)]
pub struct ConfirmOutcome {
    pub payment_id: String,
    pub state: PaymentState,
    pub notifications: CompletionReport,
}

#[derive(Debug)]
pub struct CancelOutcome {
    pub payment_id: String,
    pub state: PaymentState,
}

const INITIATABLE: [PaymentState; 2] = [PaymentState::INITIATED, PaymentState::OTP_SENT];
const CANCELLABLE: [PaymentState; 3] = [
    PaymentState::INITIATED,
    PaymentState::OTP_SENT,
    PaymentState::OTP_VERIFIED,
];

pub struct PaymentFlow {
    otp_store: Arc<OtpStore>,
    dispatcher: Arc<NotificationDispatcher>,
    payments: Arc<dyn PaymentRepository>,
    directory: Arc<Directory>,
    clock: Arc<dyn Clock>,
}

impl PaymentFlow {
    pub fn new(
        otp_store: Arc<OtpStore>,
        dispatcher: Arc<NotificationDispatcher>,
        payments: Arc<dyn PaymentRepository>,
        directory: Arc<Directory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            otp_store,
            dispatcher,
            payments,
            directory,
            clock,
        }
    }

    async fn load(&self, payment_id: &str) -> Result<Payment, FlowError> {
        self.payments
            .find(payment_id)
            .await?
            .ok_or_else(|| FlowError::PaymentNotFound(payment_id.to_owned()))
    }

    async fn invalid_state(&self, payment_id: &str) -> FlowError {
        match self.load(payment_id).await {
            Ok(payment) => FlowError::InvalidState {
                payment_id: payment_id.to_owned(),
                state: payment.state,
            },
            Err(err) => err,
        }
    }

    /// Issue a code for the payment and send it to the retailer.
    /// The payment moves to OTP_SENT whatever the delivery outcome.
    pub async fn initiate(
        &self,
        payment_id: &str,
        retailer_id: &str,
        amount: f64,
        line_worker_name: &str,
    ) -> Result<InitiateOutcome, FlowError> {
        let payment = self.load(payment_id).await?;
        if !INITIATABLE.contains(&payment.state) {
            return Err(FlowError::InvalidState {
                payment_id: payment_id.to_owned(),
                state: payment.state,
            });
        }
        if payment.retailer_id != retailer_id {
            return Err(FlowError::RetailerMismatch {
                payment_id: payment_id.to_owned(),
            });
        }

        let otp = match self
            .otp_store
            .issue(payment_id, retailer_id, amount, line_worker_name)
            .await
        {
            Err(OtpError::DuplicateActiveOtp) => {
                // resend supersedes the previous code
                self.otp_store.invalidate(payment_id).await?;
                self.otp_store
                    .issue(payment_id, retailer_id, amount, line_worker_name)
                    .await?
            }
            result => result?,
        };

        let notice = OtpNotice {
            retailer_id: retailer_id.to_owned(),
            retailer_name: self.directory.display_name(retailer_id).await,
            payment_id: payment_id.to_owned(),
            code: otp.code.clone(),
            amount,
            line_worker_name: line_worker_name.to_owned(),
            validity_mins: self.otp_store.settings().validity_mins,
        };
        let dispatch = self.dispatcher.send_otp(&notice).await;
        if let Some(err) = dispatch.error() {
            tracing::warn!("otp for payment {payment_id} not delivered: {err}");
        }

        let now = self.clock.now_ms();
        let moved = self
            .payments
            .transition(payment_id, &INITIATABLE, PaymentState::OTP_SENT, now)
            .await?;
        if !moved {
            // cancelled or completed while the code was being sent
            self.otp_store.invalidate(payment_id).await?;
            return Err(self.invalid_state(payment_id).await);
        }
        tracing::info!("payment {payment_id} moved to OTP_SENT");

        Ok(InitiateOutcome {
            payment_id: payment_id.to_owned(),
            state: PaymentState::OTP_SENT,
            expires_at: otp.expires_at,
            dispatch,
        })
    }

    /// Verify the submitted code and complete the payment.
    /// Verification errors are returned as the OTP store reports them. A code is
    /// only consumed while the payment awaits one, and a payment left in
    /// OTP_VERIFIED by an interrupted confirm is finished by resubmitting its code.
    pub async fn confirm(&self, payment_id: &str, code: &str) -> Result<ConfirmOutcome, FlowError> {
        let payment = self.load(payment_id).await?;
        let otp = match payment.state {
            PaymentState::OTP_SENT | PaymentState::OTP_VERIFIED => {
                self.verify_or_resume(payment_id, code).await?
            }
            PaymentState::INITIATED => {
                return Err(FlowError::InvalidState {
                    payment_id: payment_id.to_owned(),
                    state: payment.state,
                });
            }
            PaymentState::COMPLETED | PaymentState::CANCELLED => {
                // codes of a finished payment are inert, report why
                self.otp_store.verify(payment_id, code).await?;
                return Err(self.invalid_state(payment_id).await);
            }
        };

        // false when an earlier confirm already verified the payment
        self.payments
            .transition(
                payment_id,
                &[PaymentState::OTP_SENT],
                PaymentState::OTP_VERIFIED,
                self.clock.now_ms(),
            )
            .await?;
        let completed = self
            .payments
            .transition(
                payment_id,
                &[PaymentState::OTP_VERIFIED],
                PaymentState::COMPLETED,
                self.clock.now_ms(),
            )
            .await?;
        if !completed {
            let err = match self.invalid_state(payment_id).await {
                // a concurrent confirm with the same code got there first
                FlowError::InvalidState {
                    state: PaymentState::COMPLETED,
                    ..
                } => FlowError::Otp(OtpError::AlreadyUsed),
                err => err,
            };
            return Err(err);
        }
        tracing::info!("payment {payment_id} completed");

        let (retailer_name, wholesaler_name) = tokio::join!(
            self.directory.display_name(&otp.retailer_id),
            self.directory.display_name(&payment.tenant_id),
        );
        let notice = CompletionNotice {
            payment_id: payment_id.to_owned(),
            retailer_id: otp.retailer_id.clone(),
            retailer_name,
            wholesaler_id: payment.tenant_id.clone(),
            wholesaler_name,
            amount: otp.amount,
            line_worker_name: otp.line_worker_name.clone(),
        };
        let notifications = self.dispatcher.send_payment_completion(&notice).await;

        Ok(ConfirmOutcome {
            payment_id: payment_id.to_owned(),
            state: PaymentState::COMPLETED,
            notifications,
        })
    }

    async fn verify_or_resume(&self, payment_id: &str, code: &str) -> Result<OtpRecord, FlowError> {
        match self.otp_store.verify(payment_id, code).await {
            Ok(otp) => Ok(otp),
            Err(err @ (OtpError::AlreadyUsed | OtpError::Expired)) => {
                match self.otp_store.consumed_with(payment_id, code).await? {
                    Some(otp) => {
                        tracing::info!("resuming completion of payment {payment_id}");
                        Ok(otp)
                    }
                    None => Err(err.into()),
                }
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn cancel(&self, payment_id: &str) -> Result<CancelOutcome, FlowError> {
        let payment = self.load(payment_id).await?;
        if payment.state.is_terminal() {
            return Err(FlowError::InvalidState {
                payment_id: payment_id.to_owned(),
                state: payment.state,
            });
        }
        let now = self.clock.now_ms();
        let moved = self
            .payments
            .transition(payment_id, &CANCELLABLE, PaymentState::CANCELLED, now)
            .await?;
        if !moved {
            return Err(self.invalid_state(payment_id).await);
        }
        self.otp_store.invalidate(payment_id).await?;
        tracing::info!("payment {payment_id} cancelled");
        Ok(CancelOutcome {
            payment_id: payment_id.to_owned(),
            state: PaymentState::CANCELLED,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicBool, Ordering},
        time::Duration,
    };

    use super::*;
    use crate::{
        cache::NoopCache,
        config::OtpSettings,
        devices::{DeviceRegistry, MemoryDeviceRepository},
        directory::MemoryDirectoryRepository,
        models::Profile,
        notification::{Channel, MockPushGateway, MockSmsGateway},
        otp::MemoryOtpRepository,
        utils::ManualClock,
    };

    /// Payment store whose next move to COMPLETED fails when armed
    struct FlakyPayments {
        inner: Arc<MemoryPaymentRepository>,
        fail_completion: AtomicBool,
    }

    #[async_trait]
    impl PaymentRepository for FlakyPayments {
        async fn find(&self, payment_id: &str) -> anyhow::Result<Option<Payment>> {
            self.inner.find(payment_id).await
        }

        async fn transition(
            &self,
            payment_id: &str,
            from: &[PaymentState],
            to: PaymentState,
            now: i64,
        ) -> anyhow::Result<bool> {
            if to == PaymentState::COMPLETED && self.fail_completion.swap(false, Ordering::SeqCst) {
                anyhow::bail!("connection reset while completing {payment_id}");
            }
            self.inner.transition(payment_id, from, to, now).await
        }
    }

    struct Fixture {
        flow: PaymentFlow,
        otp_store: Arc<OtpStore>,
        payments: Arc<MemoryPaymentRepository>,
        clock: Arc<ManualClock>,
    }

    async fn fixture(sms: MockSmsGateway) -> Fixture {
        fixture_with(sms, false).await
    }

    async fn fixture_with(sms: MockSmsGateway, fail_completion: bool) -> Fixture {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let otp_store = Arc::new(OtpStore::new(
            Arc::new(MemoryOtpRepository::new()),
            clock.clone(),
            OtpSettings::default(),
        ));
        let devices = Arc::new(DeviceRegistry::new(
            Arc::new(MemoryDeviceRepository::new()),
            clock.clone(),
        ));
        let profiles = Arc::new(MemoryDirectoryRepository::new());
        profiles
            .insert(Profile {
                id: "R1".to_owned(),
                name: "Sharma Stores".to_owned(),
                phone: Some("9876543210".to_owned()),
            })
            .await;
        profiles
            .insert(Profile {
                id: "W1".to_owned(),
                name: "Gupta Traders".to_owned(),
                phone: Some("9123456789".to_owned()),
            })
            .await;
        let directory = Arc::new(Directory::new(
            profiles,
            Arc::new(NoopCache),
            Duration::from_secs(60),
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            devices,
            directory.clone(),
            Arc::new(MockPushGateway::new()),
            Arc::new(sms),
            false,
        ));
        let payments = Arc::new(MemoryPaymentRepository::new());
        payments
            .insert(Payment {
                id: "P1".to_owned(),
                retailer_id: "R1".to_owned(),
                tenant_id: "W1".to_owned(),
                total_paid: 1500.0,
                state: PaymentState::INITIATED,
                created_at: None,
                updated_at: None,
            })
            .await;
        let flaky = Arc::new(FlakyPayments {
            inner: payments.clone(),
            fail_completion: AtomicBool::new(fail_completion),
        });
        let flow = PaymentFlow::new(
            otp_store.clone(),
            dispatcher,
            flaky,
            directory,
            clock.clone(),
        );
        Fixture {
            flow,
            otp_store,
            payments,
            clock,
        }
    }

    fn sms_ok() -> MockSmsGateway {
        let mut sms = MockSmsGateway::new();
        sms.expect_send().returning(|_, _| Ok(true));
        sms
    }

    async fn issued_code(fx: &Fixture) -> String {
        let active = fx.otp_store.active_otps_for_retailer("R1").await.unwrap();
        active[0].code.clone()
    }

    async fn state_of(fx: &Fixture) -> PaymentState {
        fx.payments.find("P1").await.unwrap().unwrap().state
    }

    #[tokio::test]
    async fn test_initiate_then_confirm() {
        let fx = fixture(sms_ok()).await;
        let outcome = fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        assert_eq!(outcome.state, PaymentState::OTP_SENT);
        assert_eq!(outcome.dispatch.channel, Some(Channel::Sms));
        assert_eq!(state_of(&fx).await, PaymentState::OTP_SENT);

        let code = issued_code(&fx).await;
        let confirmed = fx.flow.confirm("P1", &code).await.unwrap();
        assert_eq!(confirmed.state, PaymentState::COMPLETED);
        assert_eq!(confirmed.notifications.retailer_result.success, true);
        assert_eq!(confirmed.notifications.wholesaler_result.success, true);
        assert_eq!(state_of(&fx).await, PaymentState::COMPLETED);

        let again = fx.flow.confirm("P1", &code).await;
        assert!(matches!(again, Err(FlowError::Otp(OtpError::AlreadyUsed))));
    }

    #[tokio::test]
    async fn test_initiate_moves_state_even_when_delivery_fails() {
        let mut sms = MockSmsGateway::new();
        sms.expect_send().returning(|_, _| Ok(false));
        let fx = fixture(sms).await;
        let outcome = fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        assert_eq!(outcome.dispatch.success, false);
        assert_eq!(state_of(&fx).await, PaymentState::OTP_SENT);
    }

    #[tokio::test]
    async fn test_resend_supersedes_previous_code() {
        let fx = fixture(sms_ok()).await;
        fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let first = issued_code(&fx).await;
        fx.clock.advance_ms(1_000);
        fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let active = fx.otp_store.active_otps_for_retailer("R1").await.unwrap();
        assert_eq!(active.len(), 1);
        let second = active[0].code.clone();
        if first != second {
            let old = fx.flow.confirm("P1", &first).await;
            assert!(matches!(old, Err(FlowError::Otp(OtpError::InvalidCode { .. }))));
        }
        assert!(fx.flow.confirm("P1", &second).await.is_ok());
    }

    #[tokio::test]
    async fn test_confirm_errors_are_not_reinterpreted() {
        let fx = fixture(sms_ok()).await;
        fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let code = issued_code(&fx).await;
        let wrong = if code == "000000" { "111111" } else { "000000" };
        let result = fx.flow.confirm("P1", wrong).await;
        assert!(matches!(
            result,
            Err(FlowError::Otp(OtpError::InvalidCode { attempts_left: 2 }))
        ));
        fx.clock.advance_mins(11);
        let result = fx.flow.confirm("P1", &code).await;
        assert!(matches!(result, Err(FlowError::Otp(OtpError::Expired))));
        assert_eq!(state_of(&fx).await, PaymentState::OTP_SENT);
    }

    #[tokio::test]
    async fn test_initiate_checks_payment() {
        let fx = fixture(sms_ok()).await;
        let missing = fx.flow.initiate("P9", "R1", 10.0, "Suresh").await;
        assert!(matches!(missing, Err(FlowError::PaymentNotFound(_))));
        let mismatch = fx.flow.initiate("P1", "R2", 10.0, "Suresh").await;
        assert!(matches!(mismatch, Err(FlowError::RetailerMismatch { .. })));
    }

    #[tokio::test]
    async fn test_cancel_invalidates_code() {
        let fx = fixture(sms_ok()).await;
        fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let code = issued_code(&fx).await;
        let cancelled = fx.flow.cancel("P1").await.unwrap();
        assert_eq!(cancelled.state, PaymentState::CANCELLED);
        let result = fx.flow.confirm("P1", &code).await;
        assert!(matches!(result, Err(FlowError::Otp(OtpError::Expired))));
        let again = fx.flow.cancel("P1").await;
        assert!(matches!(
            again,
            Err(FlowError::InvalidState {
                state: PaymentState::CANCELLED,
                ..
            })
        ));
        let reinit = fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await;
        assert!(matches!(reinit, Err(FlowError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_confirm_before_otp_sent_keeps_code() {
        let fx = fixture(sms_ok()).await;
        // code already delivered while the payment is still INITIATED
        fx.otp_store.issue("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let code = issued_code(&fx).await;
        let early = fx.flow.confirm("P1", &code).await;
        assert!(matches!(
            early,
            Err(FlowError::InvalidState {
                state: PaymentState::INITIATED,
                ..
            })
        ));

        let sent = fx
            .payments
            .transition("P1", &INITIATABLE, PaymentState::OTP_SENT, 0)
            .await
            .unwrap();
        assert!(sent);
        let confirmed = fx.flow.confirm("P1", &code).await.unwrap();
        assert_eq!(confirmed.state, PaymentState::COMPLETED);
        assert_eq!(state_of(&fx).await, PaymentState::COMPLETED);
    }

    #[tokio::test]
    async fn test_interrupted_completion_is_resumed() {
        let fx = fixture_with(sms_ok(), true).await;
        fx.flow.initiate("P1", "R1", 1500.0, "Suresh").await.unwrap();
        let code = issued_code(&fx).await;

        let interrupted = fx.flow.confirm("P1", &code).await;
        assert!(matches!(interrupted, Err(FlowError::Internal(_))));
        assert_eq!(state_of(&fx).await, PaymentState::OTP_VERIFIED);

        let wrong = if code == "000000" { "111111" } else { "000000" };
        let result = fx.flow.confirm("P1", wrong).await;
        assert!(matches!(result, Err(FlowError::Otp(OtpError::AlreadyUsed))));

        let resumed = fx.flow.confirm("P1", &code).await.unwrap();
        assert_eq!(resumed.state, PaymentState::COMPLETED);
        assert_eq!(resumed.notifications.wholesaler_result.success, true);
        assert_eq!(state_of(&fx).await, PaymentState::COMPLETED);

        let again = fx.flow.confirm("P1", &code).await;
        assert!(matches!(again, Err(FlowError::Otp(OtpError::AlreadyUsed))));
    }
}
