use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::{config::FirebaseConfig, constants::*, utils::get_epoch_ms};

fn get_epoch_ts() -> i64 {
    get_epoch_ms() / 1000
}

#[derive(Debug, Serialize, Deserialize)]
struct GoogleTokenClaims {
    iss: String,
    iat: i64,
    exp: i64,
    aud: String,
    scope: String,
}

impl GoogleTokenClaims {
    fn new(client_email: &str) -> Self {
        let ts = get_epoch_ts();
        Self {
            iss: client_email.to_owned(),
            iat: ts,
            exp: ts + 3600,
            aud: GOOGLE_TOKEN_URL.to_owned(),
            scope: FIREBASE_MESSAGE_SCOPE.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth access token for FCM, minted from a service account and reused
/// until shortly before it expires
pub struct GoogleAuthToken {
    client_email: String,
    signing_key: EncodingKey,
    access_token: Option<String>,
    valid_till: Option<i64>,
}

impl GoogleAuthToken {
    pub fn new(config: &FirebaseConfig) -> anyhow::Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(config.private_key.as_bytes())?;
        Ok(Self {
            client_email: config.client_email.clone(),
            signing_key,
            access_token: None,
            valid_till: None,
        })
    }

    pub async fn get_access_token(&mut self, client: &reqwest::Client) -> anyhow::Result<String> {
        if self.is_new_token_required(get_epoch_ts()) {
            self.new_access_token(client).await?;
        }
        self.access_token
            .clone()
            .ok_or_else(|| anyhow::anyhow!("access token not available"))
    }

    fn is_new_token_required(&self, now: i64) -> bool {
        match (&self.access_token, self.valid_till) {
            (Some(_), Some(valid_till)) => now >= valid_till,
            _ => true,
        }
    }

    async fn new_access_token(&mut self, client: &reqwest::Client) -> anyhow::Result<()> {
        let signed_jwt = self.new_jwt()?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, "application/x-www-form-urlencoded".parse()?);
        let params = [
            ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
            ("assertion", signed_jwt.as_str()),
        ];
        let response = client
            .post(GOOGLE_TOKEN_URL)
            .headers(headers)
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json::<GoogleTokenResponse>()
            .await?;
        let valid_till = get_epoch_ts() + response.expires_in - ACCESS_TOKEN_EXPIRY_MARGIN_SECS;
        tracing::debug!("obtained new google access token");
        self.access_token = Some(response.access_token);
        self.valid_till = Some(valid_till);
        Ok(())
    }

    fn new_jwt(&self) -> anyhow::Result<String> {
        let claims = GoogleTokenClaims::new(&self.client_email);
        let header = Header::new(Algorithm::RS256);
        let jwt = encode(&header, &claims, &self.signing_key)?;
        Ok(jwt)
    }
}
