//! Google service account authentication using the OAuth 2.0
//! JWT bearer grant. A signed assertion is exchanged for a short
//! lived access token which is cached until it is about to expire.
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::ChatError;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

fn default_token_uri() -> String {
    String::from("https://oauth2.googleapis.com/token")
}

/// The fields we need from a service account key file downloaded
/// from the Google Cloud console.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl ServiceAccountKey {
    pub fn from_json(json: &str) -> Result<Self, ChatError> {
        serde_json::from_str(json).map_err(|e| {
            ChatError::Configuration(format!("Invalid service account key: {}", e))
        })
    }
}

#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, ChatError>;
}

pub type SharedAccessTokenProvider = Arc<dyn AccessTokenProvider>;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub scope: String,
    pub aud: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct ServiceAccountAuth {
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scope: String,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    /// Fails with a configuration error if the private key is not a
    /// valid RSA PEM so a bad key is caught at startup rather than on
    /// the first append.
    pub fn new(key: ServiceAccountKey, scope: &str) -> Result<Self, ChatError> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(|e| {
            ChatError::Configuration(format!(
                "Invalid private key for {}: {}",
                key.client_email, e
            ))
        })?;
        Ok(Self {
            key,
            encoding_key,
            scope: scope.to_string(),
            cached: Mutex::new(None),
        })
    }

    pub fn claims(&self, now: DateTime<Utc>) -> Claims {
        Claims {
            iss: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(1)).timestamp(),
        }
    }

    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, ChatError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();
        encode(&header, &self.claims(now), &self.encoding_key)
            .map_err(|e| ChatError::Logging(format!("Could not sign token request: {}", e)))
    }

    async fn fetch_token(&self) -> Result<CachedToken, ChatError> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;
        let res = Client::new()
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| ChatError::Logging(format!("Token request failed: {}", e)))?;
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ChatError::Logging(format!(
                "Token request failed: {} ({})",
                status, text
            )));
        }
        let token: TokenResponse = serde_json::from_str(&text)
            .map_err(|e| ChatError::Logging(format!("Invalid token response: {}", e)))?;

        tracing::debug!("Fetched access token for {}", self.key.client_email);

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in.unwrap_or(3600)),
        })
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, ChatError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at - Duration::seconds(60) > Utc::now()
        {
            return Ok(token.access_token.clone());
        }

        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *cached = Some(token);
        Ok(access_token)
    }
}
