//! # Signup Protocol
//!
//! Wire types for the membership backend and the [`SignupGateway`] trait
//! the step-2 handler talks to.
//!
//! ```text
//! POST {api}/signup        SignupRequest  -> { redirectUrl } | { clientSecret }
//! GET  {api}/content/join                 -> { stripePublicKey, .. }
//! ```

use crate::contribution::{Contribution, ContributionPeriod};
use crate::error::{JoinError, JoinResult};
use crate::urls::JoinUrls;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Contribution part of a signup request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupContribution {
    pub amount: f64,
    pub period: ContributionPeriod,
    /// Only ever true for monthly contributions
    pub pay_fee: bool,
    pub prorate: bool,
    pub payment_method: String,
    pub complete_url: String,
}

/// Body of `POST {api}/signup`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub contribution: SignupContribution,
    pub login_url: String,
    pub set_password_url: String,
    pub confirm_url: String,
}

impl SignupRequest {
    /// Build the request for a contribution.
    ///
    /// Fee absorption is dropped for anything but monthly contributions.
    pub fn from_contribution(contribution: &Contribution, urls: &JoinUrls) -> Self {
        Self {
            email: contribution.email.clone(),
            contribution: SignupContribution {
                amount: contribution.amount,
                period: contribution.period,
                pay_fee: contribution.effective_pay_fee(),
                prorate: false,
                payment_method: contribution.payment_method.clone(),
                complete_url: urls.complete_url(),
            },
            login_url: urls.login_url(),
            set_password_url: urls.set_password_url(),
            confirm_url: urls.confirm_url(),
        }
    }
}

/// Raw signup response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

/// What the backend wants the wizard to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// Hand control to an external payment flow
    Redirect(String),
    /// Collect payment details in-page with this setup secret
    PaymentSetup { client_secret: String },
}

impl SignupResponse {
    pub fn redirect(url: impl Into<String>) -> Self {
        Self {
            redirect_url: Some(url.into()),
            client_secret: None,
        }
    }

    pub fn payment_setup(client_secret: impl Into<String>) -> Self {
        Self {
            redirect_url: None,
            client_secret: Some(client_secret.into()),
        }
    }

    /// Decide the branch. A redirect wins over a secret; empty values count as absent.
    pub fn into_outcome(self) -> JoinResult<SignupOutcome> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        if let Some(url) = non_empty(self.redirect_url) {
            return Ok(SignupOutcome::Redirect(url));
        }
        match non_empty(self.client_secret) {
            Some(client_secret) => Ok(SignupOutcome::PaymentSetup { client_secret }),
            None => Err(JoinError::GatewayRejected(
                "Signup response has neither redirectUrl nor clientSecret".to_string(),
            )),
        }
    }
}

/// Public join content; only the gateway key matters to the wizard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinContent {
    pub stripe_public_key: String,
}

/// The membership backend as seen by the wizard
#[async_trait(?Send)]
pub trait SignupGateway {
    /// Submit a signup
    async fn signup(&self, request: &SignupRequest) -> JoinResult<SignupResponse>;

    /// Fetch the public join content (gateway public key)
    async fn join_content(&self) -> JoinResult<JoinContent>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contribution(amount: f64, period: ContributionPeriod, pay_fee: bool) -> Contribution {
        Contribution {
            email: "ada@example.org".to_string(),
            amount,
            period,
            payment_method: "s_card".to_string(),
            pay_fee,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn test_request_wire_format() {
        let urls = JoinUrls::new("https://members.example.org");
        let request = SignupRequest::from_contribution(
            &contribution(10.0, ContributionPeriod::Monthly, true),
            &urls,
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "email": "ada@example.org",
                "contribution": {
                    "amount": 10.0,
                    "period": "monthly",
                    "payFee": true,
                    "prorate": false,
                    "paymentMethod": "s_card",
                    "completeUrl": "https://members.example.org/join/complete"
                },
                "loginUrl": "https://members.example.org/auth/login",
                "setPasswordUrl": "https://members.example.org/auth/set-password",
                "confirmUrl": "https://members.example.org/join/confirm-email"
            })
        );
    }

    #[test]
    fn test_pay_fee_dropped_for_annual() {
        let urls = JoinUrls::default();
        let request = SignupRequest::from_contribution(
            &contribution(20.0, ContributionPeriod::Annually, true),
            &urls,
        );

        assert!(!request.contribution.pay_fee);
        assert!(!request.contribution.prorate);
    }

    #[test]
    fn test_response_branches() {
        let redirect: SignupResponse =
            serde_json::from_str(r#"{"redirectUrl":"https://pay.example.com/flow/1"}"#).unwrap();
        assert_eq!(
            redirect.into_outcome().unwrap(),
            SignupOutcome::Redirect("https://pay.example.com/flow/1".to_string())
        );

        let setup: SignupResponse =
            serde_json::from_str(r#"{"clientSecret":"seti_1_secret_2"}"#).unwrap();
        assert_eq!(
            setup.into_outcome().unwrap(),
            SignupOutcome::PaymentSetup {
                client_secret: "seti_1_secret_2".to_string()
            }
        );

        let empty: SignupResponse = serde_json::from_str(r#"{"redirectUrl":""}"#).unwrap();
        assert!(matches!(
            empty.into_outcome(),
            Err(JoinError::GatewayRejected(_))
        ));
    }

    #[test]
    fn test_join_content_ignores_extra_fields() {
        let content: JoinContent = serde_json::from_str(
            r#"{"stripePublicKey":"pk_test_123","title":"Join us","minMonthlyAmount":1}"#,
        )
        .unwrap();
        assert_eq!(content.stripe_public_key, "pk_test_123");
    }
}
