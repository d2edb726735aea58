//! # Join URLs
//!
//! Every URL the wizard needs is derived from the frontend base URL.

use crate::error::{JoinError, JoinResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use url::Url;

/// Characters `encodeURIComponent` leaves as they are
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// URLs derived from the membership frontend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinUrls {
    /// Base URL of the frontend (e.g., "https://members.example.org")
    pub frontend_url: String,
}

impl JoinUrls {
    pub fn new(frontend_url: impl Into<String>) -> Self {
        let frontend_url: String = frontend_url.into();
        Self {
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    /// Backend API root
    pub fn api_url(&self) -> String {
        format!("{}/api/1.0", self.frontend_url)
    }

    pub fn signup_url(&self) -> String {
        format!("{}/signup", self.api_url())
    }

    /// Public join content (carries the gateway public key)
    pub fn join_content_url(&self) -> String {
        format!("{}/content/join", self.api_url())
    }

    /// Where the member lands once the signup is complete
    pub fn complete_url(&self) -> String {
        format!("{}/join/complete", self.frontend_url)
    }

    pub fn login_url(&self) -> String {
        format!("{}/auth/login", self.frontend_url)
    }

    pub fn set_password_url(&self) -> String {
        format!("{}/auth/set-password", self.frontend_url)
    }

    pub fn confirm_url(&self) -> String {
        format!("{}/join/confirm-email", self.frontend_url)
    }

    /// Completion URL carrying the member's name for the post-redirect page
    pub fn complete_url_for(&self, first_name: &str, last_name: &str) -> JoinResult<String> {
        let url = Url::parse(&self.complete_url())
            .map_err(|e| JoinError::Configuration(format!("Invalid frontend URL: {}", e)))?;
        // Spaces as %20, not the `+` of form encoding
        Ok(format!(
            "{}?firstName={}&lastName={}",
            url,
            utf8_percent_encode(first_name, URI_COMPONENT),
            utf8_percent_encode(last_name, URI_COMPONENT)
        ))
    }

    /// Check that the frontend URL is an absolute http(s) URL
    pub fn validate(&self) -> JoinResult<()> {
        let url = Url::parse(&self.frontend_url)
            .map_err(|e| JoinError::Configuration(format!("Invalid frontend URL: {}", e)))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(JoinError::Configuration(format!(
                "Frontend URL must be http(s), got {}",
                url.scheme()
            )));
        }
        Ok(())
    }
}

impl Default for JoinUrls {
    fn default() -> Self {
        Self::new("http://localhost:3000")
    }
}
