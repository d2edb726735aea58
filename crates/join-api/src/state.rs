//! # Application State
//!
//! Wiring of the terminal driver: the form file, the wizard with its HTTP
//! collaborators, and the loop that submits every step.

use crate::client::{ApiClientConfig, ApiSignupGateway};
use crate::console::{ConsoleNavigator, ConsoleView, PaymentInput, TerminalWidgetHost};
use anyhow::{anyhow, bail, Context};
use join_core::{
    FormSnapshot, JoinConfig, JoinFlow, JoinWizard, PaymentGateway, SignupGateway, Transition,
    WizardEvent,
};
use join_stripe::{StripeConfig, StripeSetupGateway};
use serde::Deserialize;
use std::path::Path;
use std::rc::Rc;
use tracing::{info, warn};

/// Contents of the form file: the wizard inputs plus an optional `[payment]` table
#[derive(Debug, Deserialize)]
pub struct FormFile {
    #[serde(flatten)]
    pub form: FormSnapshot,
    #[serde(default)]
    pub payment: PaymentInput,
}

impl FormFile {
    pub fn from_toml(toml_str: &str) -> anyhow::Result<Self> {
        toml::from_str(toml_str).context("Invalid form file")
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read form file {}", path.display()))?;
        Self::from_toml(&content)
    }
}

/// The wizard and the navigator it reports to
pub struct AppState {
    pub config: JoinConfig,
    pub wizard: JoinWizard,
    pub navigator: Rc<ConsoleNavigator>,
}

impl AppState {
    /// Wire the wizard to the membership API and Stripe
    pub fn new(
        config: JoinConfig,
        form_file: FormFile,
        api: &ApiClientConfig,
        stripe: StripeConfig,
    ) -> anyhow::Result<Self> {
        let signup = ApiSignupGateway::new(config.urls(), api)
            .map_err(|e| anyhow!("Failed to initialize membership API client: {}", e))?;

        let host = Rc::new(TerminalWidgetHost::new(form_file.payment));
        let payments = StripeSetupGateway::new(stripe, host)
            .map_err(|e| anyhow!("Failed to initialize Stripe: {}", e))?;

        Ok(Self::with_gateways(
            config,
            form_file.form,
            Rc::new(signup),
            Rc::new(payments),
        ))
    }

    /// Wire the wizard to arbitrary gateways
    pub fn with_gateways(
        config: JoinConfig,
        form: FormSnapshot,
        signup: Rc<dyn SignupGateway>,
        payments: Rc<dyn PaymentGateway>,
    ) -> Self {
        let view = Rc::new(ConsoleView);
        let navigator = Rc::new(ConsoleNavigator::new());

        let flow = JoinFlow::new(
            config.clone(),
            Rc::new(form),
            view.clone(),
            navigator.clone(),
            signup,
            payments,
        );

        Self {
            config,
            wizard: JoinWizard::new(flow, view),
            navigator,
        }
    }

    /// Submit every step in turn until the wizard navigates away.
    ///
    /// Returns the URL the browser would have been sent to.
    pub async fn run(&self) -> anyhow::Result<String> {
        self.wizard.start();

        loop {
            let step = self.wizard.visible_step();
            match self.wizard.dispatch(WizardEvent::Submit { step }).await {
                Transition::Advanced { to, .. } => info!("Moved on to step {}", to + 1),
                Transition::Stayed { step } => {
                    return self
                        .navigator
                        .destination()
                        .ok_or_else(|| anyhow!("Step {} stayed without navigating", step + 1));
                }
                Transition::Rejected { step, error } => {
                    warn!(kind = ?error.kind(), "Step {} rejected", step + 1);
                    bail!("Step {} rejected: {}", step + 1, error);
                }
                other => bail!("Unexpected transition: {:?}", other),
            }
        }
    }
}
