use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::Mutex;

use super::{
    google_auth_token::GoogleAuthToken, GatewayError, PushGateway, PushMessage, PushReceipt,
};
use crate::{config::FirebaseConfig, constants::*};

#[derive(Debug, Serialize)]
struct PushMessageNotification<'a> {
    title: &'a str,
    body: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushAndroid {
    priority: &'static str,
}

#[derive(Debug, Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: PushMessageNotification<'a>,
    data: &'a HashMap<String, String>,
    android: PushAndroid,
}

#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    message: FcmMessage<'a>,
}

impl<'a> PushPayload<'a> {
    fn new(msg: &'a PushMessage) -> Self {
        let message = FcmMessage {
            token: &msg.token,
            notification: PushMessageNotification {
                title: &msg.title,
                body: &msg.body,
            },
            data: &msg.data,
            android: PushAndroid { priority: "high" },
        };
        Self { message }
    }
}

#[derive(Debug, Deserialize)]
struct FcmResponse {
    name: String,
}

struct FcmClient {
    endpoint: String,
    auth: Mutex<GoogleAuthToken>,
}

/// Push delivery through the FCM HTTP v1 API
pub struct FcmPushGateway {
    client: reqwest::Client,
    inner: Result<FcmClient, String>,
}

impl FcmPushGateway {
    pub fn new(config: Option<FirebaseConfig>) -> Self {
        let inner = match config {
            None => Err("firebase credentials are not configured".to_owned()),
            Some(config) => match GoogleAuthToken::new(&config) {
                Ok(token) => Ok(FcmClient {
                    endpoint: format!("{FCM_ENDPOINT_BASE}/{}/messages:send", config.project_id),
                    auth: Mutex::new(token),
                }),
                Err(err) => {
                    tracing::error!("invalid firebase private key: {err}");
                    Err(format!("invalid firebase private key: {err}"))
                }
            },
        };
        Self {
            client: reqwest::Client::new(),
            inner,
        }
    }
}

#[async_trait]
impl PushGateway for FcmPushGateway {
    async fn send(&self, message: &PushMessage) -> Result<PushReceipt, GatewayError> {
        let fcm = self
            .inner
            .as_ref()
            .map_err(|reason| GatewayError::Configuration(reason.clone()))?;
        let access_token = {
            let mut auth = fcm.auth.lock().await;
            auth.get_access_token(&self.client)
                .await
                .map_err(|err| GatewayError::Transport(format!("google auth: {err}")))?
        };
        let bearer_token = format!("Bearer {access_token}");
        let mut headers = HeaderMap::new();
        let auth_value = bearer_token
            .parse::<HeaderValue>()
            .map_err(|_| GatewayError::Configuration("invalid access token".to_owned()))?;
        headers.insert(AUTHORIZATION, auth_value);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let res = self
            .client
            .post(&fcm.endpoint)
            .headers(headers)
            .json(&PushPayload::new(message))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected(format!("fcm returned {status}: {body}")));
        }
        let res = res.json::<FcmResponse>().await?;
        Ok(PushReceipt {
            message_id: res.name,
        })
    }
}
