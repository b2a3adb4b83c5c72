//! HTTP client for the Cloudflare v4 user-token API

use crate::api::{ClientFactory, TokenApi};
use crate::error::RemoteError;
use crate::types::{CreatedToken, NewToken, TokenVerification};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokenlease_core::{SecretString, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use url::Url;

const USER_AGENT: &str = concat!("tokenlease/", env!("CARGO_PKG_VERSION"));

// Fields the service sets itself and refuses on update
const READ_ONLY_TOKEN_FIELDS: &[&str] = &["id", "issued_on", "modified_on", "last_used_on"];

/// Configuration for the HTTP token client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// API base, e.g. `https://api.cloudflare.com/client/v4`
    pub base_url: Url,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE_URL).expect("default API URL is valid"),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }
}

impl HttpClientConfig {
    /// Build a config from a base URL string
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RemoteError> {
        let base_url = Url::parse(base_url).map_err(|e| RemoteError::Config {
            message: format!("invalid API base URL '{base_url}': {e}"),
        })?;
        Ok(Self { base_url, timeout })
    }
}

/// Response envelope shared by every API call
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl ApiMessage {
    fn render(&self) -> String {
        format!("{} (code {})", self.message, self.code)
    }
}

/// Token client authenticated with one API token
pub struct HttpTokenApi {
    client: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl HttpTokenApi {
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        resource: &str,
    ) -> Result<T, RemoteError> {
        let response = request
            .bearer_auth(self.token.expose())
            .send()
            .await
            .map_err(RemoteError::transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound {
                resource: resource.to_string(),
            });
        }

        let body = response.bytes().await.map_err(RemoteError::transport)?;
        let envelope: Envelope<T> = match serde_json::from_slice(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => {
                return Err(RemoteError::Decode {
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(RemoteError::Api {
                    status: status.as_u16(),
                    messages: vec![String::from_utf8_lossy(&body).into_owned()],
                })
            }
        };

        if !status.is_success() || !envelope.success {
            return Err(RemoteError::Api {
                status: status.as_u16(),
                messages: envelope.errors.iter().map(ApiMessage::render).collect(),
            });
        }

        envelope.result.ok_or_else(|| RemoteError::Decode {
            message: format!("response for {resource} carried no result"),
        })
    }
}

#[async_trait]
impl TokenApi for HttpTokenApi {
    async fn verify_token(&self) -> Result<TokenVerification, RemoteError> {
        let request = self.client.get(self.url("user/tokens/verify"));
        self.send(request, "token verification").await
    }

    async fn create_token(&self, token: &NewToken) -> Result<CreatedToken, RemoteError> {
        tracing::debug!(name = %token.name, policies = token.policies.len(), "creating token");
        let request = self.client.post(self.url("user/tokens")).json(token);
        self.send(request, "tokens").await
    }

    async fn update_token_expiry(
        &self,
        id: &str,
        expires_on: DateTime<Utc>,
    ) -> Result<(), RemoteError> {
        let resource = format!("token '{id}'");
        let path = format!("user/tokens/{id}");

        // Updates replace the whole token, so start from its current form
        let mut current: serde_json::Map<String, serde_json::Value> =
            self.send(self.client.get(self.url(&path)), &resource).await?;
        for field in READ_ONLY_TOKEN_FIELDS {
            current.remove(*field);
        }
        current.insert(
            "expires_on".to_string(),
            serde_json::Value::String(expires_on.to_rfc3339_opts(SecondsFormat::Secs, true)),
        );

        let request = self.client.put(self.url(&path)).json(&current);
        let _: serde_json::Value = self.send(request, &resource).await?;
        Ok(())
    }

    async fn delete_token(&self, id: &str) -> Result<(), RemoteError> {
        let request = self.client.delete(self.url(&format!("user/tokens/{id}")));
        let _: serde_json::Value = self.send(request, &format!("token '{id}'")).await?;
        Ok(())
    }

    async fn regenerate_token(&self, id: &str) -> Result<SecretString, RemoteError> {
        let request = self
            .client
            .put(self.url(&format!("user/tokens/{id}/value")))
            .json(&serde_json::json!({}));
        self.send(request, &format!("token '{id}'")).await
    }
}

/// Builds [`HttpTokenApi`] clients sharing one connection pool
#[derive(Debug, Clone)]
pub struct HttpClientFactory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpClientFactory {
    pub fn new(config: HttpClientConfig) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RemoteError::Config {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }
}

impl ClientFactory for HttpClientFactory {
    fn client(&self, token: &SecretString) -> Result<Box<dyn TokenApi>, RemoteError> {
        Ok(Box::new(HttpTokenApi {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            token: token.clone(),
        }))
    }
}
