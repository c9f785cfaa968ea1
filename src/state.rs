use mockall_double::double;
use std::sync::Arc;

#[double]
use crate::database::AppDatabase;
use crate::{
    cache::{Cache, MemoryCache},
    config::{AppConfig, StoreBackend},
    devices::{DeviceRegistry, DeviceRepository, MemoryDeviceRepository, MongoDeviceRepository},
    directory::{
        Directory, DirectoryRepository, MemoryDirectoryRepository, MongoDirectoryRepository,
    },
    models::Profile,
    notification::{
        FcmPushGateway, HttpSmsGateway, NotificationDispatcher, PushGateway, SmsGateway,
    },
    otp::{MemoryOtpRepository, MongoOtpRepository, OtpRepository, OtpStore},
    payment::{MemoryPaymentRepository, MongoPaymentRepository, PaymentFlow, PaymentRepository},
    utils::{Clock, SystemClock},
};

/// Storage behind every service
pub struct Repositories {
    pub otps: Arc<dyn OtpRepository>,
    pub devices: Arc<dyn DeviceRepository>,
    pub payments: Arc<dyn PaymentRepository>,
    pub directory: Arc<dyn DirectoryRepository>,
}

impl Repositories {
    pub fn mongo(db: Arc<AppDatabase>) -> Self {
        Self {
            otps: Arc::new(MongoOtpRepository::new(db.clone())),
            devices: Arc::new(MongoDeviceRepository::new(db.clone())),
            payments: Arc::new(MongoPaymentRepository::new(db.clone())),
            directory: Arc::new(MongoDirectoryRepository::new(db)),
        }
    }

    pub fn memory() -> Self {
        Self {
            otps: Arc::new(MemoryOtpRepository::new()),
            devices: Arc::new(MemoryDeviceRepository::new()),
            payments: Arc::new(MemoryPaymentRepository::new()),
            directory: Arc::new(MemoryDirectoryRepository::new()),
        }
    }
}

pub struct Gateways {
    pub push: Arc<dyn PushGateway>,
    pub sms: Arc<dyn SmsGateway>,
}

impl Gateways {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            push: Arc::new(FcmPushGateway::new(config.firebase.clone())),
            sms: Arc::new(HttpSmsGateway::new(config.sms.clone())),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub otp_store: Arc<OtpStore>,
    pub devices: Arc<DeviceRegistry>,
    pub flow: Arc<PaymentFlow>,
    pub profile_cache: Arc<dyn Cache<Profile>>,
}

impl AppState {
    pub fn new(
        config: &AppConfig,
        repos: Repositories,
        gateways: Gateways,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let profile_cache: Arc<dyn Cache<Profile>> = Arc::new(MemoryCache::new());
        let otp_store = Arc::new(OtpStore::new(repos.otps, clock.clone(), config.otp));
        let devices = Arc::new(DeviceRegistry::new(repos.devices, clock.clone()));
        let directory = Arc::new(Directory::new(
            repos.directory,
            profile_cache.clone(),
            config.directory_cache_ttl,
        ));
        let dispatcher = Arc::new(NotificationDispatcher::new(
            devices.clone(),
            directory.clone(),
            gateways.push,
            gateways.sms,
            config.sms_dev_mode,
        ));
        let flow = Arc::new(PaymentFlow::new(
            otp_store.clone(),
            dispatcher,
            repos.payments,
            directory,
            clock,
        ));
        Self {
            otp_store,
            devices,
            flow,
            profile_cache,
        }
    }

    /// Wire the services against the configured backend
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let repos = match config.backend {
            StoreBackend::Memory => {
                tracing::warn!("using in-memory storage, data is lost on restart");
                Repositories::memory()
            }
            StoreBackend::Mongo => {
                let db_config = config
                    .database
                    .clone()
                    .ok_or_else(|| anyhow::anyhow!("MONGODB_URI is not set"))?;
                let db = AppDatabase::new(db_config).await?;
                Repositories::mongo(Arc::new(db))
            }
        };
        let gateways = Gateways::from_config(config);
        Ok(Self::new(config, repos, gateways, Arc::new(SystemClock)))
    }
}
