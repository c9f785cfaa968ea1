use base64::{engine::general_purpose::STANDARD, Engine};
use std::time::Duration;

use crate::constants::*;

/// Which persistence backend the services are wired against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub uri: String,
    pub min_pool_size: u32,
    pub max_pool_size: u32,
}

/// Validity and attempt ceiling applied to every issued code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpSettings {
    pub length: u32,
    pub validity_mins: i64,
    pub max_attempts: u32,
}

impl Default for OtpSettings {
    fn default() -> Self {
        Self {
            length: OTP_LENGTH,
            validity_mins: OTP_VALIDITY_MINS,
            max_attempts: OTP_MAX_ATTEMPTS,
        }
    }
}

impl OtpSettings {
    /// Build settings from raw values, out of range ones fall back to the defaults.
    /// Codes must fit the submitted code limit of 12 chars and every code needs
    /// a validity window and at least one attempt.
    pub fn sanitized(length: u32, validity_mins: i64, max_attempts: u32) -> Self {
        let length = if (1..=OTP_MAX_LENGTH).contains(&length) {
            length
        } else {
            tracing::warn!("OTP_LENGTH {length} out of range, using {OTP_LENGTH}");
            OTP_LENGTH
        };
        let validity_mins = if validity_mins > 0 {
            validity_mins
        } else {
            tracing::warn!("OTP_VALIDITY_MINS {validity_mins} out of range, using {OTP_VALIDITY_MINS}");
            OTP_VALIDITY_MINS
        };
        let max_attempts = if max_attempts > 0 {
            max_attempts
        } else {
            tracing::warn!("OTP_MAX_ATTEMPTS must be positive, using {OTP_MAX_ATTEMPTS}");
            OTP_MAX_ATTEMPTS
        };
        Self {
            length,
            validity_mins,
            max_attempts,
        }
    }

    pub fn validity_ms(&self) -> i64 {
        self.validity_mins * 60 * 1000
    }
}

/// Firebase service account used to mint FCM access tokens
#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub url: String,
    pub api_key: String,
    pub sender_id: String,
    pub country_code: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub backend: StoreBackend,
    pub database: Option<DatabaseConfig>,
    pub otp: OtpSettings,
    pub firebase: Option<FirebaseConfig>,
    pub sms: Option<SmsConfig>,
    pub sms_dev_mode: bool,
    pub directory_cache_ttl: Duration,
    pub cache_sweep_interval: Duration,
}

impl AppConfig {
    /// Read every setting from the environment, falling back to defaults.
    /// Gateway credentials are optional: a missing set is reported per message
    /// as a configuration fault rather than refusing to start.
    pub fn from_env() -> Self {
        let backend = match env_str("STORE_BACKEND").as_deref() {
            Some("memory") => StoreBackend::Memory,
            _ => StoreBackend::Mongo,
        };
        let database = env_str("MONGODB_URI").map(|uri| DatabaseConfig {
            uri,
            min_pool_size: env_parse("MONGODB_MIN_POOL_SIZE").unwrap_or(MONGO_MIN_POOL_SIZE),
            max_pool_size: env_parse("MONGODB_MAX_POOL_SIZE").unwrap_or(MONGO_MAX_POOL_SIZE),
        });
        let otp = OtpSettings::sanitized(
            env_parse("OTP_LENGTH").unwrap_or(OTP_LENGTH),
            env_parse("OTP_VALIDITY_MINS").unwrap_or(OTP_VALIDITY_MINS),
            env_parse("OTP_MAX_ATTEMPTS").unwrap_or(OTP_MAX_ATTEMPTS),
        );
        Self {
            port: env_parse("PORT").unwrap_or(DEFAULT_PORT),
            backend,
            database,
            otp,
            firebase: firebase_from_env(),
            sms: sms_from_env(),
            sms_dev_mode: env_parse("SMS_DEV_MODE").unwrap_or(false),
            directory_cache_ttl: Duration::from_secs(
                env_parse("DIRECTORY_CACHE_TTL_SECS").unwrap_or(DIRECTORY_CACHE_TTL_SECS),
            ),
            cache_sweep_interval: Duration::from_secs(
                env_parse("CACHE_SWEEP_INTERVAL_SECS").unwrap_or(CACHE_SWEEP_INTERVAL_SECS),
            ),
        }
    }
}

fn firebase_from_env() -> Option<FirebaseConfig> {
    let project_id = env_str("FIREBASE_PROJECT_ID")?;
    let client_email = env_str("FIREBASE_CLIENT_EMAIL")?;
    let private_key = match env_str("FIREBASE_PRIVATE_KEY") {
        // keys pasted into .env files usually carry escaped newlines
        Some(key) => key.replace("\\n", "\n"),
        None => {
            let encoded = env_str("FIREBASE_PRIVATE_KEY_BASE64")?;
            decode_private_key(&encoded)?
        }
    };
    Some(FirebaseConfig {
        project_id,
        client_email,
        private_key,
    })
}

fn sms_from_env() -> Option<SmsConfig> {
    Some(SmsConfig {
        url: env_str("SMS_GATEWAY_URL")?,
        api_key: env_str("SMS_GATEWAY_API_KEY")?,
        sender_id: env_str("SMS_SENDER_ID").unwrap_or_default(),
        country_code: env_str("SMS_COUNTRY_CODE")
            .unwrap_or_else(|| SMS_DEFAULT_COUNTRY_CODE.to_owned()),
    })
}

fn decode_private_key(encoded: &str) -> Option<String> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|err| tracing::error!("FIREBASE_PRIVATE_KEY_BASE64 is not valid base64: {err}"))
        .ok()?;
    String::from_utf8(bytes).ok()
}

fn env_str(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|val| !val.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_str(key).and_then(|val| val.trim().parse::<T>().ok())
}
