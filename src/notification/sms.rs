use async_trait::async_trait;
use serde::Serialize;

use super::{GatewayError, SmsGateway};
use crate::config::SmsConfig;

#[derive(Debug, Serialize)]
struct SmsPayload<'a> {
    sender: &'a str,
    to: String,
    message: &'a str,
}

fn recipient(config: &SmsConfig, phone: &str) -> String {
    format!("+{}{}", config.country_code, phone)
}

/// Text message delivery through an HTTP gateway taking a JSON body
pub struct HttpSmsGateway {
    client: reqwest::Client,
    config: Option<SmsConfig>,
}

impl HttpSmsGateway {
    pub fn new(config: Option<SmsConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }
}

#[async_trait]
impl SmsGateway for HttpSmsGateway {
    async fn send(&self, phone: &str, message: &str) -> Result<bool, GatewayError> {
        let config = self.config.as_ref().ok_or_else(|| {
            GatewayError::Configuration("sms gateway is not configured".to_owned())
        })?;
        let payload = SmsPayload {
            sender: &config.sender_id,
            to: recipient(config, phone),
            message,
        };
        let res = self
            .client
            .post(&config.url)
            .header("x-api-key", &config.api_key)
            .json(&payload)
            .send()
            .await?;
        if !res.status().is_success() {
            tracing::warn!("sms gateway returned {}", res.status());
        }
        Ok(res.status().is_success())
    }
}
