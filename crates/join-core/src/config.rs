//! # Wizard Configuration
//!
//! Settings the wizard consumes: the frontend base URL, the fee region, the
//! minimum-tier threshold and the payment widget appearance (opaque, passed
//! to the gateway unmodified).

use crate::contribution::FeePolicy;
use crate::error::{JoinError, JoinResult};
use crate::urls::JoinUrls;
use serde::{Deserialize, Serialize};
use std::env;

/// Wizard configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    /// Base URL of the membership frontend
    pub frontend_url: String,

    /// Region passed to the fee calculator (e.g., "eu", "gb")
    #[serde(default = "default_fee_region")]
    pub fee_region: String,

    /// Amount at which fee absorption is mandatory
    #[serde(default = "default_forced_fee_amount")]
    pub forced_fee_amount: f64,

    /// Payment widget appearance
    #[serde(default = "default_appearance")]
    pub appearance: serde_json::Value,
}

fn default_fee_region() -> String {
    "eu".to_string()
}

fn default_forced_fee_amount() -> f64 {
    1.0
}

/// Default widget appearance: stripe theme without input shadows
pub fn default_appearance() -> serde_json::Value {
    serde_json::json!({
        "theme": "stripe",
        "rules": {
            ".Input": {
                "boxShadow": "none"
            }
        }
    })
}

impl JoinConfig {
    /// Create config for a frontend with default settings
    pub fn new(frontend_url: impl Into<String>) -> Self {
        Self {
            frontend_url: frontend_url.into(),
            fee_region: default_fee_region(),
            forced_fee_amount: default_forced_fee_amount(),
            appearance: default_appearance(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `JOIN_FRONTEND_URL`
    ///
    /// Optional: `JOIN_FEE_REGION`, `JOIN_FORCED_FEE_AMOUNT`, `JOIN_APPEARANCE` (JSON)
    pub fn from_env() -> JoinResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let frontend_url = env::var("JOIN_FRONTEND_URL").map_err(|_| {
            JoinError::Configuration("JOIN_FRONTEND_URL not set".to_string())
        })?;

        let mut config = Self::new(frontend_url);

        if let Ok(region) = env::var("JOIN_FEE_REGION") {
            config.fee_region = region;
        }

        if let Ok(amount) = env::var("JOIN_FORCED_FEE_AMOUNT") {
            config.forced_fee_amount = amount.parse().map_err(|_| {
                JoinError::Configuration(format!(
                    "JOIN_FORCED_FEE_AMOUNT must be a number, got {:?}",
                    amount
                ))
            })?;
        }

        if let Ok(appearance) = env::var("JOIN_APPEARANCE") {
            config.appearance = serde_json::from_str(&appearance).map_err(|e| {
                JoinError::Configuration(format!("JOIN_APPEARANCE is not valid JSON: {}", e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML document
    pub fn from_toml(toml_str: &str) -> JoinResult<Self> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| JoinError::Configuration(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> JoinResult<()> {
        self.urls().validate()?;

        if self.fee_region.is_empty() {
            return Err(JoinError::Configuration(
                "fee_region must not be empty".to_string(),
            ));
        }
        if !self.forced_fee_amount.is_finite() || self.forced_fee_amount <= 0.0 {
            return Err(JoinError::Configuration(
                "forced_fee_amount must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn urls(&self) -> JoinUrls {
        JoinUrls::new(&self.frontend_url)
    }

    pub fn fee_policy(&self) -> FeePolicy {
        FeePolicy::new(self.forced_fee_amount)
    }

    /// Builder: set the fee region
    pub fn with_fee_region(mut self, region: impl Into<String>) -> Self {
        self.fee_region = region.into();
        self
    }

    /// Builder: set the minimum-tier amount
    pub fn with_forced_fee_amount(mut self, amount: f64) -> Self {
        self.forced_fee_amount = amount;
        self
    }

    /// Builder: set the widget appearance
    pub fn with_appearance(mut self, appearance: serde_json::Value) -> Self {
        self.appearance = appearance;
        self
    }
}
