use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, sync::Arc};
use utoipa::ToSchema;

#[cfg(test)]
use mockall::automock;

use crate::{
    constants::*,
    devices::DeviceRegistry,
    directory::Directory,
    utils::{format_currency, normalize_phone, replace_placeholders},
};

mod google_auth_token;
pub mod push_message;
pub mod sms;

pub use push_message::FcmPushGateway;
pub use sms::HttpSmsGateway;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway not configured: {0}")]
    Configuration(String),
    #[error("gateway unreachable: {0}")]
    Transport(String),
    #[error("gateway rejected the message: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// What the push gateway is asked to deliver
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PushReceipt {
    pub message_id: String,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, message: &PushMessage) -> Result<PushReceipt, GatewayError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SmsGateway: Send + Sync {
    /// `phone` is a normalized 10 digit number. `Ok(false)` means the gateway refused it.
    async fn send(&self, phone: &str, message: &str) -> Result<bool, GatewayError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelStatus {
    NotAttempted,
    Skipped,
    Delivered,
    DevModeDelivery,
    Failed,
    ConfigurationFault,
}

/// Result of one delivery channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChannelOutcome {
    pub status: ChannelStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ChannelOutcome {
    fn with(status: ChannelStatus, message_id: Option<String>, reason: Option<String>) -> Self {
        Self {
            status,
            message_id,
            reason,
        }
    }

    pub fn not_attempted() -> Self {
        Self::with(ChannelStatus::NotAttempted, None, None)
    }

    pub fn skipped(reason: &str) -> Self {
        Self::with(ChannelStatus::Skipped, None, Some(reason.to_owned()))
    }

    pub fn delivered(message_id: Option<String>) -> Self {
        Self::with(ChannelStatus::Delivered, message_id, None)
    }

    pub fn dev_mode() -> Self {
        let reason = "sms gateway not configured, message logged only".to_owned();
        Self::with(ChannelStatus::DevModeDelivery, None, Some(reason))
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::with(ChannelStatus::Failed, None, Some(reason.into()))
    }

    pub fn configuration_fault(reason: impl Into<String>) -> Self {
        Self::with(ChannelStatus::ConfigurationFault, None, Some(reason.into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    Push,
    Sms,
    DevMode,
}

/// Aggregate outcome of one dispatch to one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub success: bool,
    pub channel: Option<Channel>,
    pub fallback_to_sms: bool,
    pub push: ChannelOutcome,
    pub sms: ChannelOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    #[error("message could not be delivered on any channel")]
    DeliveryFailed,
    #[error("notification gateway is not configured")]
    ConfigurationFault,
}

impl DispatchReport {
    fn by_push(receipt: PushReceipt) -> Self {
        Self {
            success: true,
            channel: Some(Channel::Push),
            fallback_to_sms: false,
            push: ChannelOutcome::delivered(Some(receipt.message_id)),
            sms: ChannelOutcome::not_attempted(),
        }
    }

    fn after_fallback(push: ChannelOutcome, sms: ChannelOutcome) -> Self {
        let channel = match sms.status {
            ChannelStatus::Delivered => Some(Channel::Sms),
            ChannelStatus::DevModeDelivery => Some(Channel::DevMode),
            _ => None,
        };
        Self {
            success: channel.is_some(),
            channel,
            fallback_to_sms: true,
            push,
            sms,
        }
    }

    /// Terminal error of the dispatch, only when no channel delivered
    pub fn error(&self) -> Option<DispatchError> {
        if self.success {
            return None;
        }
        if self.sms.status == ChannelStatus::ConfigurationFault {
            return Some(DispatchError::ConfigurationFault);
        }
        Some(DispatchError::DeliveryFailed)
    }
}

/// Both sides of a completed payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub retailer_result: DispatchReport,
    pub wholesaler_result: DispatchReport,
}

#[derive(Debug, Clone)]
pub struct OtpNotice {
    pub retailer_id: String,
    pub retailer_name: String,
    pub payment_id: String,
    pub code: String,
    pub amount: f64,
    pub line_worker_name: String,
    pub validity_mins: i64,
}

#[derive(Debug, Clone)]
pub struct CompletionNotice {
    pub payment_id: String,
    pub retailer_id: String,
    pub retailer_name: String,
    pub wholesaler_id: String,
    pub wholesaler_name: String,
    pub amount: f64,
    pub line_worker_name: String,
}

fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(key, val)| (key.to_string(), val.to_string()))
        .collect()
}

/// Delivers messages to users by push, falling back to SMS.
/// Channel failures never escape as errors, they are reported per channel.
pub struct NotificationDispatcher {
    devices: Arc<DeviceRegistry>,
    directory: Arc<Directory>,
    push: Arc<dyn PushGateway>,
    sms: Arc<dyn SmsGateway>,
    sms_dev_mode: bool,
}

impl NotificationDispatcher {
    pub fn new(
        devices: Arc<DeviceRegistry>,
        directory: Arc<Directory>,
        push: Arc<dyn PushGateway>,
        sms: Arc<dyn SmsGateway>,
        sms_dev_mode: bool,
    ) -> Self {
        Self {
            devices,
            directory,
            push,
            sms,
            sms_dev_mode,
        }
    }

    pub async fn send_otp(&self, notice: &OtpNotice) -> DispatchReport {
        let amount = format_currency(notice.amount);
        let validity = notice.validity_mins.to_string();
        let body = replace_placeholders(
            OTP_MESSAGE_TEMPLATE,
            &values(&[
                ("retailerName", notice.retailer_name.as_str()),
                ("amount", amount.as_str()),
                ("lineWorkerName", notice.line_worker_name.as_str()),
                ("code", notice.code.as_str()),
                ("validityMins", validity.as_str()),
            ]),
        );
        let data = values(&[
            ("type", EVENT_OTP),
            ("paymentId", notice.payment_id.as_str()),
            ("amount", amount.as_str()),
        ]);
        let report = self
            .dispatch(&notice.retailer_id, OTP_PUSH_TITLE, &body, data)
            .await;
        tracing::info!(
            "otp for payment {} dispatched: success={} channel={:?}",
            notice.payment_id,
            report.success,
            report.channel
        );
        report
    }

    /// Notify retailer and wholesaler concurrently; one failing does not affect the other
    pub async fn send_payment_completion(&self, notice: &CompletionNotice) -> CompletionReport {
        let amount = format_currency(notice.amount);
        let retailer_body = replace_placeholders(
            RETAILER_COMPLETION_TEMPLATE,
            &values(&[
                ("amount", amount.as_str()),
                ("wholesalerName", notice.wholesaler_name.as_str()),
                ("lineWorkerName", notice.line_worker_name.as_str()),
            ]),
        );
        let wholesaler_body = replace_placeholders(
            WHOLESALER_COMPLETION_TEMPLATE,
            &values(&[
                ("retailerName", notice.retailer_name.as_str()),
                ("amount", amount.as_str()),
                ("lineWorkerName", notice.line_worker_name.as_str()),
                ("paymentId", notice.payment_id.as_str()),
            ]),
        );
        let data = values(&[
            ("type", EVENT_PAYMENT_COMPLETED),
            ("paymentId", notice.payment_id.as_str()),
            ("amount", amount.as_str()),
        ]);
        let (retailer_result, wholesaler_result) = tokio::join!(
            self.dispatch(
                &notice.retailer_id,
                COMPLETION_PUSH_TITLE,
                &retailer_body,
                data.clone()
            ),
            self.dispatch(
                &notice.wholesaler_id,
                COMPLETION_PUSH_TITLE,
                &wholesaler_body,
                data
            ),
        );
        CompletionReport {
            retailer_result,
            wholesaler_result,
        }
    }

    async fn dispatch(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        data: HashMap<String, String>,
    ) -> DispatchReport {
        let push = match self.devices.most_recent_active(user_id).await {
            Ok(Some(device)) => {
                let message = PushMessage {
                    token: device.token,
                    title: title.to_owned(),
                    body: body.to_owned(),
                    data,
                };
                match self.push.send(&message).await {
                    Ok(receipt) => {
                        tracing::debug!("push delivered to {user_id}: {}", receipt.message_id);
                        return DispatchReport::by_push(receipt);
                    }
                    Err(GatewayError::Configuration(reason)) => {
                        tracing::error!("push gateway misconfigured: {reason}");
                        ChannelOutcome::configuration_fault(reason)
                    }
                    Err(err) => {
                        tracing::warn!("push to {user_id} failed: {err}");
                        ChannelOutcome::failed(err.to_string())
                    }
                }
            }
            Ok(None) => ChannelOutcome::skipped("no active device"),
            Err(err) => {
                tracing::warn!("device lookup for {user_id} failed: {err:?}");
                ChannelOutcome::skipped("device lookup failed")
            }
        };
        let sms = self.send_sms(user_id, body).await;
        DispatchReport::after_fallback(push, sms)
    }

    async fn send_sms(&self, user_id: &str, body: &str) -> ChannelOutcome {
        let phone = match self.directory.profile(user_id).await {
            Ok(profile) => profile
                .and_then(|profile| profile.phone)
                .and_then(|phone| normalize_phone(&phone)),
            Err(err) => {
                tracing::warn!("profile lookup for {user_id} failed: {err:?}");
                return ChannelOutcome::failed("profile lookup failed");
            }
        };
        let Some(phone) = phone else {
            tracing::warn!("no usable phone number for {user_id}");
            return ChannelOutcome::failed("no valid phone number");
        };
        match self.sms.send(&phone, body).await {
            Ok(true) => ChannelOutcome::delivered(None),
            Ok(false) => {
                tracing::warn!("sms to {user_id} refused by gateway");
                ChannelOutcome::failed("sms gateway refused the message")
            }
            Err(GatewayError::Configuration(_)) if self.sms_dev_mode => {
                tracing::warn!("sms gateway not configured, dev mode delivery to {phone}: {body}");
                ChannelOutcome::dev_mode()
            }
            Err(GatewayError::Configuration(reason)) => {
                tracing::error!("sms gateway misconfigured: {reason}");
                ChannelOutcome::configuration_fault(reason)
            }
            Err(err) => {
                tracing::warn!("sms to {user_id} failed: {err}");
                ChannelOutcome::failed(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        cache::NoopCache,
        devices::MemoryDeviceRepository,
        directory::MemoryDirectoryRepository,
        models::Profile,
        utils::ManualClock,
    };

    struct Fixture {
        devices: Arc<DeviceRegistry>,
        directory: Arc<Directory>,
        profiles: Arc<MemoryDirectoryRepository>,
    }

    async fn fixture() -> Fixture {
        let clock = Arc::new(ManualClock::new(0));
        let devices = Arc::new(DeviceRegistry::new(
            Arc::new(MemoryDeviceRepository::new()),
            clock,
        ));
        let profiles = Arc::new(MemoryDirectoryRepository::new());
        for (id, name, phone) in [
            ("R1", "Sharma Stores", "+91 98765 43210"),
            ("W1", "Gupta Traders", "09123456789"),
        ] {
            profiles
                .insert(Profile {
                    id: id.to_owned(),
                    name: name.to_owned(),
                    phone: Some(phone.to_owned()),
                })
                .await;
        }
        let directory = Arc::new(Directory::new(
            profiles.clone(),
            Arc::new(NoopCache),
            Duration::from_secs(60),
        ));
        Fixture {
            devices,
            directory,
            profiles,
        }
    }

    fn otp_notice() -> OtpNotice {
        OtpNotice {
            retailer_id: "R1".to_owned(),
            retailer_name: "Sharma Stores".to_owned(),
            payment_id: "P1".to_owned(),
            code: "482913".to_owned(),
            amount: 1500.0,
            line_worker_name: "Suresh".to_owned(),
            validity_mins: 10,
        }
    }

    fn dispatcher(
        fx: &Fixture,
        push: MockPushGateway,
        sms: MockSmsGateway,
        dev_mode: bool,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(
            fx.devices.clone(),
            fx.directory.clone(),
            Arc::new(push),
            Arc::new(sms),
            dev_mode,
        )
    }

    #[tokio::test]
    async fn test_no_device_skips_push_and_uses_normalized_phone() {
        let fx = fixture().await;
        let mut push = MockPushGateway::new();
        push.expect_send().times(0);
        let mut sms = MockSmsGateway::new();
        sms.expect_send()
            .withf(|phone, message| phone == "9876543210" && message.contains("482913"))
            .times(1)
            .returning(|_, _| Ok(true));
        let report = dispatcher(&fx, push, sms, false).send_otp(&otp_notice()).await;
        assert_eq!(report.success, true);
        assert_eq!(report.channel, Some(Channel::Sms));
        assert_eq!(report.fallback_to_sms, true);
        assert_eq!(report.push.status, ChannelStatus::Skipped);
        assert_eq!(report.sms.status, ChannelStatus::Delivered);
        assert_eq!(report.error(), None);
    }

    #[tokio::test]
    async fn test_push_success_does_not_touch_sms() {
        let fx = fixture().await;
        fx.devices.register("R1", "tok-A", "android").await.unwrap();
        let mut push = MockPushGateway::new();
        push.expect_send()
            .withf(|message| {
                message.token == "tok-A"
                    && message.title == OTP_PUSH_TITLE
                    && message.body.contains("482913")
                    && message.body.contains("₹1,500.00")
                    && message.data.get("paymentId").map(String::as_str) == Some("P1")
            })
            .times(1)
            .returning(|_| {
                Ok(PushReceipt {
                    message_id: "projects/demo/messages/1".to_owned(),
                })
            });
        let mut sms = MockSmsGateway::new();
        sms.expect_send().times(0);
        let report = dispatcher(&fx, push, sms, false).send_otp(&otp_notice()).await;
        assert_eq!(report.success, true);
        assert_eq!(report.channel, Some(Channel::Push));
        assert_eq!(report.fallback_to_sms, false);
        assert_eq!(report.push.message_id.as_deref(), Some("projects/demo/messages/1"));
        assert_eq!(report.sms.status, ChannelStatus::NotAttempted);
    }

    #[tokio::test]
    async fn test_push_failure_falls_back_to_sms() {
        let fx = fixture().await;
        fx.devices.register("R1", "tok-A", "android").await.unwrap();
        let mut push = MockPushGateway::new();
        push.expect_send()
            .times(1)
            .returning(|_| Err(GatewayError::Rejected("UNREGISTERED".to_owned())));
        let mut sms = MockSmsGateway::new();
        sms.expect_send().times(1).returning(|_, _| Ok(true));
        let report = dispatcher(&fx, push, sms, false).send_otp(&otp_notice()).await;
        assert_eq!(report.success, true);
        assert_eq!(report.channel, Some(Channel::Sms));
        assert_eq!(report.push.status, ChannelStatus::Failed);
    }

    #[tokio::test]
    async fn test_both_channels_failing_is_delivery_failed() {
        let fx = fixture().await;
        fx.devices.register("R1", "tok-A", "android").await.unwrap();
        let mut push = MockPushGateway::new();
        push.expect_send()
            .times(1)
            .returning(|_| Err(GatewayError::Transport("timeout".to_owned())));
        let mut sms = MockSmsGateway::new();
        sms.expect_send().times(1).returning(|_, _| Ok(false));
        let report = dispatcher(&fx, push, sms, false).send_otp(&otp_notice()).await;
        assert_eq!(report.success, false);
        assert_eq!(report.channel, None);
        assert_eq!(report.fallback_to_sms, true);
        assert_eq!(report.error(), Some(DispatchError::DeliveryFailed));
    }

    #[tokio::test]
    async fn test_unconfigured_sms_is_configuration_fault() {
        let fx = fixture().await;
        let mut sms = MockSmsGateway::new();
        sms.expect_send()
            .times(1)
            .returning(|_, _| Err(GatewayError::Configuration("missing api key".to_owned())));
        let report = dispatcher(&fx, MockPushGateway::new(), sms, false)
            .send_otp(&otp_notice())
            .await;
        assert_eq!(report.success, false);
        assert_eq!(report.fallback_to_sms, true);
        assert_eq!(report.sms.status, ChannelStatus::ConfigurationFault);
        assert_eq!(report.error(), Some(DispatchError::ConfigurationFault));
    }

    #[tokio::test]
    async fn test_unconfigured_sms_in_dev_mode() {
        let fx = fixture().await;
        let mut sms = MockSmsGateway::new();
        sms.expect_send()
            .times(1)
            .returning(|_, _| Err(GatewayError::Configuration("missing api key".to_owned())));
        let report = dispatcher(&fx, MockPushGateway::new(), sms, true)
            .send_otp(&otp_notice())
            .await;
        assert_eq!(report.success, true);
        assert_eq!(report.channel, Some(Channel::DevMode));
        assert_eq!(report.sms.status, ChannelStatus::DevModeDelivery);
    }

    #[tokio::test]
    async fn test_missing_phone_fails_sms_leg() {
        let fx = fixture().await;
        fx.profiles
            .insert(Profile {
                id: "R1".to_owned(),
                name: "Sharma Stores".to_owned(),
                phone: Some("12345".to_owned()),
            })
            .await;
        let mut sms = MockSmsGateway::new();
        sms.expect_send().times(0);
        let report = dispatcher(&fx, MockPushGateway::new(), sms, false)
            .send_otp(&otp_notice())
            .await;
        assert_eq!(report.success, false);
        assert_eq!(report.sms.status, ChannelStatus::Failed);
        assert_eq!(report.error(), Some(DispatchError::DeliveryFailed));
    }

    #[tokio::test]
    async fn test_completion_reaches_both_parties_independently() {
        let fx = fixture().await;
        fx.devices.register("W1", "tok-W", "web").await.unwrap();
        let mut push = MockPushGateway::new();
        push.expect_send()
            .withf(|message| message.token == "tok-W" && message.body.contains("Sharma Stores"))
            .times(1)
            .returning(|_| Err(GatewayError::Transport("timeout".to_owned())));
        let mut sms = MockSmsGateway::new();
        // retailer has no device and reaches sms, wholesaler's sms refuses
        sms.expect_send()
            .withf(|phone, message| phone == "9876543210" && message.contains("Gupta Traders"))
            .times(1)
            .returning(|_, _| Ok(true));
        sms.expect_send()
            .withf(|phone, _| phone == "9123456789")
            .times(1)
            .returning(|_, _| Ok(false));
        let notice = CompletionNotice {
            payment_id: "P1".to_owned(),
            retailer_id: "R1".to_owned(),
            retailer_name: "Sharma Stores".to_owned(),
            wholesaler_id: "W1".to_owned(),
            wholesaler_name: "Gupta Traders".to_owned(),
            amount: 1500.0,
            line_worker_name: "Suresh".to_owned(),
        };
        let report = dispatcher(&fx, push, sms, false)
            .send_payment_completion(&notice)
            .await;
        assert_eq!(report.retailer_result.success, true);
        assert_eq!(report.retailer_result.channel, Some(Channel::Sms));
        assert_eq!(report.wholesaler_result.success, false);
        assert_eq!(report.wholesaler_result.push.status, ChannelStatus::Failed);
        assert_eq!(
            report.wholesaler_result.error(),
            Some(DispatchError::DeliveryFailed)
        );
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = DispatchReport::after_fallback(
            ChannelOutcome::skipped("no active device"),
            ChannelOutcome::delivered(None),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["fallbackToSms"], true);
        assert_eq!(value["channel"], "sms");
        assert_eq!(value["push"]["status"], "SKIPPED");
    }
}
