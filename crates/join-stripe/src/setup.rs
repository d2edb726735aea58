//! # Stripe SetupIntents
//!
//! [`PaymentGateway`] over Stripe's SetupIntents API, as used by the
//! in-page payment widget: the backend creates the SetupIntent and hands the
//! wizard its client secret, the wizard retrieves it to mount the widget and
//! confirms it with the collected payment method.

use crate::config::{StripeConfig, StripeMode};
use async_trait::async_trait;
use join_core::{
    widget_channel, ConfirmOutcome, ConfirmParams, JoinError, JoinResult, MountRequest,
    MountedWidget, PaymentGateway, WidgetHandle, WidgetHost,
};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

const PROVIDER: &str = "stripe";

/// Stripe SetupIntent gateway
///
/// The widget itself lives in the UI; this gateway only talks to the API and
/// hands the UI a notifier through the [`WidgetHost`].
pub struct StripeSetupGateway {
    config: StripeConfig,
    client: Client,
    host: Rc<dyn WidgetHost>,
}

impl StripeSetupGateway {
    /// Create a new gateway mounting widgets through `host`
    pub fn new(config: StripeConfig, host: Rc<dyn WidgetHost>) -> JoinResult<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| JoinError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            config,
            client,
            host,
        })
    }

    /// Create from environment variables
    pub fn from_env(host: Rc<dyn WidgetHost>) -> JoinResult<Self> {
        Self::new(StripeConfig::from_env()?, host)
    }

    /// Attach the common Stripe headers
    fn authorized(&self, request: RequestBuilder, publishable_key: &str) -> RequestBuilder {
        request
            .header("Authorization", self.config.auth_header(publishable_key))
            .header("Stripe-Version", &self.config.api_version)
    }

    /// Send a request and return the body of a successful response
    async fn send(&self, request: RequestBuilder) -> JoinResult<String> {
        let response = request
            .send()
            .await
            .map_err(|e| JoinError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| JoinError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);
            return Err(stripe_error(status.as_u16(), &body));
        }
        Ok(body)
    }

    async fn retrieve(&self, handle: &WidgetHandle) -> JoinResult<SetupIntent> {
        let url = self.config.setup_intent_url(&handle.setup_id, None);
        let request = self
            .authorized(self.client.get(&url), &handle.public_key)
            .query(&[("client_secret", handle.client_secret.as_str())]);

        let body = self.send(request).await?;
        parse_setup_intent(&body)
    }
}

#[async_trait(?Send)]
impl PaymentGateway for StripeSetupGateway {
    #[instrument(skip(self, request))]
    async fn mount_widget(&self, request: MountRequest) -> JoinResult<MountedWidget> {
        let mode = StripeMode::of_publishable_key(&request.public_key)?;
        let setup_id = parse_setup_intent_id(&request.client_secret)?;

        let handle = WidgetHandle {
            provider: PROVIDER.to_string(),
            setup_id,
            client_secret: request.client_secret,
            public_key: request.public_key,
        };

        let intent = self.retrieve(&handle).await?;
        debug!(
            "Retrieved SetupIntent: id={}, status={}, mode={:?}",
            intent.id, intent.status, mode
        );

        match intent.status.as_str() {
            "requires_payment_method" | "requires_confirmation" | "requires_action" => {}
            other => {
                return Err(JoinError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("SetupIntent {} cannot collect details ({})", intent.id, other),
                });
            }
        }

        let (notifier, events) = widget_channel();
        self.host.mount(&handle, &request.appearance, notifier)?;

        info!("Mounted payment widget for SetupIntent {}", handle.setup_id);
        Ok(MountedWidget { handle, events })
    }

    #[instrument(skip(self, widget, fields, params), fields(setup_id = %widget.setup_id))]
    async fn confirm_setup(
        &self,
        widget: &WidgetHandle,
        fields: &BTreeMap<String, String>,
        params: &ConfirmParams,
    ) -> JoinResult<ConfirmOutcome> {
        let form_params = confirm_form(widget, fields, params);
        let idempotency_key = uuid::Uuid::new_v4().to_string();

        debug!(
            "Confirming SetupIntent: {} form fields, idempotency_key={}",
            form_params.len(),
            idempotency_key
        );

        let url = self.config.setup_intent_url(&widget.setup_id, Some("confirm"));
        let request = self
            .authorized(self.client.post(&url), &widget.public_key)
            .header("Idempotency-Key", &idempotency_key)
            .form(&form_params);

        let body = self.send(request).await?;
        let intent = parse_setup_intent(&body)?;

        let outcome = intent.outcome(&params.return_url)?;
        info!(
            "Confirmed SetupIntent: id={}, status={}",
            intent.id, intent.status
        );
        Ok(outcome)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

/// Extract the SetupIntent id from a client secret (`seti_…_secret_…`)
pub fn parse_setup_intent_id(client_secret: &str) -> JoinResult<String> {
    let malformed = || JoinError::GatewayRejected("Malformed setup secret".to_string());

    let (id, secret) = client_secret.split_once("_secret_").ok_or_else(malformed)?;
    let valid_id = id.len() > "seti_".len()
        && id.starts_with("seti_")
        && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    if !valid_id || secret.is_empty() {
        return Err(malformed());
    }
    Ok(id.to_string())
}

/// Form body of `POST /v1/setup_intents/{id}/confirm`
fn confirm_form(
    widget: &WidgetHandle,
    fields: &BTreeMap<String, String>,
    params: &ConfirmParams,
) -> Vec<(String, String)> {
    let mut form_params: Vec<(String, String)> = vec![
        ("client_secret".to_string(), widget.client_secret.clone()),
        ("return_url".to_string(), params.return_url.clone()),
        (
            "payment_method_data[billing_details][email]".to_string(),
            params.billing_details.email.clone(),
        ),
        (
            "payment_method_data[billing_details][name]".to_string(),
            params.billing_details.name.clone(),
        ),
    ];

    // Widget fields are payment method data; keys may already carry brackets (e.g. `card[token]`)
    for (key, value) in fields {
        let key = match key.split_once('[') {
            Some((head, rest)) => format!("payment_method_data[{}][{}", head, rest),
            None => format!("payment_method_data[{}]", key),
        };
        form_params.push((key, value.clone()));
    }

    form_params
}

fn parse_setup_intent(body: &str) -> JoinResult<SetupIntent> {
    serde_json::from_str(body).map_err(|e| {
        JoinError::Serialization(format!("Failed to parse Stripe response: {}", e))
    })
}

/// Map a non-2xx Stripe response to the wizard's error taxonomy
fn stripe_error(status: u16, body: &str) -> JoinError {
    match serde_json::from_str::<StripeErrorResponse>(body) {
        Ok(response) => {
            let error = response.error;
            match error.error_type.as_str() {
                // The member can fix these in the widget
                "card_error" | "invalid_request_error" => JoinError::ConfirmationRejected {
                    message: error.message,
                    code: error.code,
                },
                _ => JoinError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: error.message,
                },
            }
        }
        Err(_) => JoinError::ProviderError {
            provider: PROVIDER.to_string(),
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct SetupIntent {
    id: String,
    status: String,
    #[serde(default)]
    next_action: Option<NextAction>,
    #[serde(default)]
    last_setup_error: Option<StripeError>,
}

impl SetupIntent {
    /// Where the browser goes after a confirmation Stripe accepted
    fn outcome(&self, return_url: &str) -> JoinResult<ConfirmOutcome> {
        match self.status.as_str() {
            "succeeded" | "processing" => Ok(ConfirmOutcome {
                redirect_url: return_url.to_string(),
            }),
            "requires_action" => self
                .next_action
                .as_ref()
                .and_then(|action| action.redirect_to_url.as_ref())
                .map(|redirect| ConfirmOutcome {
                    redirect_url: redirect.url.clone(),
                })
                .ok_or_else(|| JoinError::ProviderError {
                    provider: PROVIDER.to_string(),
                    message: format!("SetupIntent {} requires an unsupported action", self.id),
                }),
            "requires_payment_method" => {
                let (message, code) = match &self.last_setup_error {
                    Some(error) => (error.message.clone(), error.code.clone()),
                    None => ("Payment details were not accepted".to_string(), None),
                };
                warn!("SetupIntent {} needs a new payment method: {}", self.id, message);
                Err(JoinError::ConfirmationRejected { message, code })
            }
            other => Err(JoinError::ProviderError {
                provider: PROVIDER.to_string(),
                message: format!("Unexpected SetupIntent status {}", other),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct NextAction {
    #[serde(default)]
    redirect_to_url: Option<RedirectToUrl>,
}

#[derive(Debug, Deserialize)]
struct RedirectToUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    #[serde(rename = "type", default)]
    error_type: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}
