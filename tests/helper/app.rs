use async_trait::async_trait;
use axum::Router;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use payment_otp_service::{
    app::build_app,
    config::{AppConfig, OtpSettings, StoreBackend},
    devices::MemoryDeviceRepository,
    directory::MemoryDirectoryRepository,
    models::{Payment, PaymentState, Profile},
    notification::{GatewayError, PushGateway, PushMessage, PushReceipt, SmsGateway},
    otp::{MemoryOtpRepository, OtpRepository},
    payment::MemoryPaymentRepository,
    state::{AppState, Gateways, Repositories},
    utils::ManualClock,
};

pub const START_MS: i64 = 1_700_000_000_000;

/// Push gateway that accepts only the tokens it is told about
#[derive(Default)]
pub struct StubPush {
    reachable: Mutex<Vec<String>>,
    pub sent: Mutex<Vec<PushMessage>>,
}

impl StubPush {
    pub fn make_reachable(&self, token: &str) {
        self.reachable.lock().unwrap().push(token.to_owned());
    }
}

#[async_trait]
impl PushGateway for StubPush {
    async fn send(&self, message: &PushMessage) -> Result<PushReceipt, GatewayError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.reachable.lock().unwrap().contains(&message.token) {
            let message_id = format!("projects/test/messages/{}", message.token);
            return Ok(PushReceipt { message_id });
        }
        Err(GatewayError::Rejected("UNREGISTERED".to_owned()))
    }
}

#[derive(Default)]
pub struct RecordingSms {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SmsGateway for RecordingSms {
    async fn send(&self, phone: &str, message: &str) -> Result<bool, GatewayError> {
        let mut sent = self.sent.lock().unwrap();
        sent.push((phone.to_owned(), message.to_owned()));
        Ok(true)
    }
}

pub struct TestApp {
    pub app: Router,
    pub clock: Arc<ManualClock>,
    pub otps: Arc<MemoryOtpRepository>,
    pub push: Arc<StubPush>,
    pub sms: Arc<RecordingSms>,
}

impl TestApp {
    /// Code of the latest OTP issued for the payment
    pub async fn issued_code(&self, payment_id: &str) -> String {
        let record = self.otps.latest(payment_id).await.unwrap().unwrap();
        record.code
    }
}

fn test_config() -> AppConfig {
    AppConfig {
        port: 0,
        backend: StoreBackend::Memory,
        database: None,
        otp: OtpSettings::default(),
        firebase: None,
        sms: None,
        sms_dev_mode: false,
        directory_cache_ttl: Duration::from_secs(60),
        cache_sweep_interval: Duration::from_secs(60),
    }
}

/// App on in-memory storage with payment P1 of retailer R1 to wholesaler W1
pub async fn build_test_app() -> TestApp {
    let clock = Arc::new(ManualClock::new(START_MS));
    let otps = Arc::new(MemoryOtpRepository::new());
    let payments = Arc::new(MemoryPaymentRepository::new());
    for (id, state) in [("P1", PaymentState::INITIATED), ("P2", PaymentState::COMPLETED)] {
        payments
            .insert(Payment {
                id: id.to_owned(),
                retailer_id: "R1".to_owned(),
                tenant_id: "W1".to_owned(),
                total_paid: 1500.0,
                state,
                created_at: Some(START_MS),
                updated_at: None,
            })
            .await;
    }
    let directory = Arc::new(MemoryDirectoryRepository::new());
    for (id, name, phone) in [
        ("R1", "Sharma Stores", "+91-98765-43210"),
        ("W1", "Gupta Traders", "9123456789"),
    ] {
        directory
            .insert(Profile {
                id: id.to_owned(),
                name: name.to_owned(),
                phone: Some(phone.to_owned()),
            })
            .await;
    }
    let repos = Repositories {
        otps: otps.clone(),
        devices: Arc::new(MemoryDeviceRepository::new()),
        payments,
        directory,
    };
    let push = Arc::new(StubPush::default());
    let sms = Arc::new(RecordingSms::default());
    let gateways = Gateways {
        push: push.clone(),
        sms: sms.clone(),
    };
    let state = AppState::new(&test_config(), repos, gateways, clock.clone());
    TestApp {
        app: build_app(state),
        clock,
        otps,
        push,
        sms,
    }
}
