//! # Membership API Client
//!
//! [`SignupGateway`] over the membership backend's JSON API.

use async_trait::async_trait;
use join_core::{
    JoinContent, JoinError, JoinResult, JoinUrls, SignupGateway, SignupRequest, SignupResponse,
};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "membership-api";

/// HTTP settings of the backend client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiClientConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl ApiClientConfig {
    /// Load from environment variables (`JOIN_API_TIMEOUT_SECS`, default 30)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        Self {
            timeout_secs: std::env::var("JOIN_API_TIMEOUT_SECS")
                .ok()
                .and_then(|t| t.parse().ok())
                .filter(|t| *t > 0)
                .unwrap_or(30),
        }
    }
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

/// Membership backend reached over HTTP
pub struct ApiSignupGateway {
    urls: JoinUrls,
    client: Client,
}

impl ApiSignupGateway {
    pub fn new(urls: JoinUrls, config: &ApiClientConfig) -> JoinResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| JoinError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { urls, client })
    }

    /// Send a request and decode a successful JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> JoinResult<T> {
        let response = request
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| JoinError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JoinError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Membership API error: status={}, body={}", status, body);
            let message = serde_json::from_str::<ApiErrorResponse>(&body)
                .map(|e| e.describe())
                .unwrap_or_else(|_| format!("HTTP {}: {}", status, body));

            // Server faults may pass on resubmit; anything else is a refusal
            return Err(if status.is_server_error() {
                JoinError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message,
                }
            } else {
                JoinError::GatewayRejected(message)
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            JoinError::Serialization(format!("Failed to parse membership API response: {}", e))
        })
    }
}

#[async_trait(?Send)]
impl SignupGateway for ApiSignupGateway {
    #[instrument(skip(self, request), fields(period = %request.contribution.period))]
    async fn signup(&self, request: &SignupRequest) -> JoinResult<SignupResponse> {
        let url = self.urls.signup_url();
        debug!("Posting signup to {}", url);

        let response: SignupResponse = self.send(self.client.post(&url).json(request)).await?;

        info!(
            "Signup accepted: redirect={}, setup={}",
            response.redirect_url.is_some(),
            response.client_secret.is_some()
        );
        Ok(response)
    }

    #[instrument(skip(self))]
    async fn join_content(&self) -> JoinResult<JoinContent> {
        let url = self.urls.join_content_url();
        self.send(self.client.get(&url)).await
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiErrorResponse {
    fn describe(&self) -> String {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "Signup refused".to_string(),
        }
    }
}
