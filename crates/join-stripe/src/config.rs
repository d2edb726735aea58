//! # Stripe Configuration
//!
//! Client-side Stripe settings. The wizard never holds a secret key: the
//! publishable key arrives with the join content and authorizes the
//! SetupIntent calls together with the setup secret.

use join_core::{JoinError, JoinResult};
use std::env;

const DEFAULT_API_BASE_URL: &str = "https://api.stripe.com";
const DEFAULT_API_VERSION: &str = "2024-12-18.acacia";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Which Stripe environment a key belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StripeMode {
    Test,
    Live,
}

impl StripeMode {
    /// Check a publishable key and tell its mode
    pub fn of_publishable_key(key: &str) -> JoinResult<Self> {
        if key.starts_with("pk_test_") {
            Ok(StripeMode::Test)
        } else if key.starts_with("pk_live_") {
            Ok(StripeMode::Live)
        } else {
            Err(JoinError::Configuration(
                "Stripe publishable key must start with pk_test_ or pk_live_".to_string(),
            ))
        }
    }
}

/// Stripe API configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeConfig {
    /// API base URL (for testing/mocking)
    pub api_base_url: String,

    /// API version
    pub api_version: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl StripeConfig {
    pub fn new() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Optional env vars:
    /// - `STRIPE_API_BASE_URL`
    /// - `STRIPE_API_VERSION`
    /// - `STRIPE_TIMEOUT_SECS`
    pub fn from_env() -> JoinResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let mut config = Self::new();

        if let Ok(url) = env::var("STRIPE_API_BASE_URL") {
            config.api_base_url = url;
        }
        if let Ok(version) = env::var("STRIPE_API_VERSION") {
            config.api_version = version;
        }
        if let Ok(timeout) = env::var("STRIPE_TIMEOUT_SECS") {
            config.timeout_secs = timeout.parse().map_err(|_| {
                JoinError::Configuration(format!(
                    "STRIPE_TIMEOUT_SECS must be a whole number, got {:?}",
                    timeout
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> JoinResult<()> {
        if !self.api_base_url.starts_with("http://") && !self.api_base_url.starts_with("https://")
        {
            return Err(JoinError::Configuration(format!(
                "STRIPE_API_BASE_URL must be an http(s) URL, got {:?}",
                self.api_base_url
            )));
        }
        if self.api_version.is_empty() {
            return Err(JoinError::Configuration(
                "STRIPE_API_VERSION must not be empty".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(JoinError::Configuration(
                "STRIPE_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Authorization header value for a publishable key
    pub fn auth_header(&self, publishable_key: &str) -> String {
        format!("Bearer {}", publishable_key)
    }

    /// URL of a SetupIntent, optionally with a sub-resource (e.g. `confirm`)
    pub fn setup_intent_url(&self, setup_id: &str, action: Option<&str>) -> String {
        let base = self.api_base_url.trim_end_matches('/');
        match action {
            Some(action) => format!("{}/v1/setup_intents/{}/{}", base, setup_id, action),
            None => format!("{}/v1/setup_intents/{}", base, setup_id),
        }
    }

    /// Builder: set custom API base URL (for testing)
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    /// Builder: set the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl Default for StripeConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_modes() {
        assert_eq!(
            StripeMode::of_publishable_key("pk_test_xyz789").unwrap(),
            StripeMode::Test
        );
        assert_eq!(
            StripeMode::of_publishable_key("pk_live_xyz789").unwrap(),
            StripeMode::Live
        );
        assert!(StripeMode::of_publishable_key("sk_test_abc123").is_err());
    }

    #[test]
    fn test_auth_header() {
        let config = StripeConfig::new();
        assert_eq!(config.auth_header("pk_test_xyz789"), "Bearer pk_test_xyz789");
    }

    #[test]
    fn test_setup_intent_urls() {
        let config = StripeConfig::new().with_api_base_url("http://127.0.0.1:9999/");

        assert_eq!(
            config.setup_intent_url("seti_123", None),
            "http://127.0.0.1:9999/v1/setup_intents/seti_123"
        );
        assert_eq!(
            config.setup_intent_url("seti_123", Some("confirm")),
            "http://127.0.0.1:9999/v1/setup_intents/seti_123/confirm"
        );
    }

    #[test]
    fn test_validation() {
        assert!(StripeConfig::new().validate().is_ok());
        assert!(StripeConfig::new()
            .with_api_base_url("api.stripe.com")
            .validate()
            .is_err());
        assert!(StripeConfig::new().with_timeout_secs(0).validate().is_err());
    }
}
