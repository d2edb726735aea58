//! # join-stripe
//!
//! Stripe payment gateway for join-wizard-rs.
//!
//! The membership backend creates a SetupIntent and returns its client
//! secret from the signup call. This crate:
//!
//! 1. Retrieves the SetupIntent with the publishable key and mounts the
//!    payment widget through a UI-supplied [`join_core::WidgetHost`]
//! 2. Confirms the SetupIntent with the details the widget collected and
//!    tells the wizard where to send the browser next
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use join_stripe::StripeSetupGateway;
//! use join_core::{PaymentSession, MountRequest};
//!
//! let gateway = Rc::new(StripeSetupGateway::from_env(widget_host)?);
//!
//! let mut session = PaymentSession::start(gateway, MountRequest {
//!     public_key: content.stripe_public_key,
//!     client_secret,
//!     appearance: config.appearance.clone(),
//! }).await?;
//! session.ready().await?;
//!
//! // Once the widget reports complete
//! let outcome = session.confirm(&params).await?;
//! // Navigate to outcome.redirect_url
//! ```

pub mod config;
pub mod setup;

// Re-exports
pub use config::{StripeConfig, StripeMode};
pub use setup::{parse_setup_intent_id, StripeSetupGateway};
