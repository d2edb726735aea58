//! # join-core
//!
//! Core types and traits for the join-wizard membership signup flow.
//!
//! This crate provides:
//! - `Contribution` and the `ContributionForm` accessor over the wizard's inputs
//! - `FeeCalculator` and the default `FeeSchedule`
//! - `StepOrchestrator`, the step state machine with its double-submit guard
//! - `JoinFlow`, the three step handlers
//! - `SignupGateway` and `PaymentGateway` traits for the backend and payment provider
//! - `PaymentSession` for the in-page payment widget
//! - `JoinError` for typed error handling
//!
//! ## Example
//!
//! ```rust,ignore
//! use join_core::{JoinConfig, JoinFlow, StepOrchestrator, WizardEvent, STEP_CONTRIBUTION};
//!
//! let config = JoinConfig::from_env()?;
//! let flow = JoinFlow::new(config, form, view.clone(), navigator, backend, stripe);
//!
//! let wizard = StepOrchestrator::new(flow, view);
//! wizard.start();
//!
//! // Each UI event is forwarded as-is; the orchestrator drops what arrives while busy
//! wizard.dispatch(WizardEvent::Submit { step: STEP_CONTRIBUTION }).await;
//! ```

pub mod config;
pub mod contribution;
pub mod display;
pub mod error;
pub mod fee;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod payment;
pub mod signup;
pub mod step;
pub mod urls;
pub mod wizard;

// Re-exports for convenience
pub use config::JoinConfig;
pub use contribution::{
    AmountSelection, Contribution, ContributionForm, ContributionPeriod, FeePolicy, FormSnapshot,
};
pub use display::{
    amount_visibility, fee_display, AmountGroupView, FeeDisplay, SubmitState, WizardView,
};
pub use error::{ErrorKind, JoinError, JoinResult};
pub use fee::{format_fee, FeeCalculator, FeeRate, FeeSchedule};
pub use payment::{
    widget_channel, BillingDetails, ConfirmOutcome, ConfirmParams, MountRequest, MountedWidget,
    PaymentGateway, PaymentSession, WidgetEvents, WidgetHandle, WidgetHost, WidgetNotifier,
};
pub use signup::{
    JoinContent, SignupContribution, SignupGateway, SignupOutcome, SignupRequest, SignupResponse,
};
pub use step::{
    ClickTarget, FormField, StepHandler, StepOrchestrator, StepState, Transition, WizardEvent,
};
pub use urls::JoinUrls;
pub use wizard::{
    JoinFlow, Navigator, JOIN_STEPS, STEP_CONTRIBUTION, STEP_DETAILS, STEP_PAYMENT,
};

/// The membership signup wizard
pub type JoinWizard = StepOrchestrator<JoinFlow>;
