//! # Join Error Types
//!
//! Typed error handling for the signup wizard.
//! Every step handler returns `Result<T, JoinError>`; none of these errors
//! is fatal, the orchestrator turns them back into an idle submit control.

use thiserror::Error;

/// Core error type for all wizard operations
#[derive(Debug, Error)]
pub enum JoinError {
    /// A required selection (period, payment method, amount) is missing
    #[error("Input incomplete: no {field} selected")]
    InputIncomplete { field: &'static str },

    /// The amount is not a positive finite number
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Configuration errors (bad frontend URL, malformed fee schedule)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The signup backend refused the request or answered with something unusable
    #[error("Signup rejected: {0}")]
    GatewayRejected(String),

    /// Payment provider API error
    #[error("Provider error [{provider}]: {message}")]
    ProviderError { provider: String, message: String },

    /// Network/HTTP error communicating with the backend or provider
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Step 3 was reached without a payment session (e.g. after a redirect branch)
    #[error("No payment session for this signup attempt")]
    SessionAbsent,

    /// The payment widget has not reported complete input yet
    #[error("Payment details are incomplete")]
    WidgetIncomplete,

    /// The payment widget went away before reporting ready
    #[error("Payment widget is unavailable")]
    WidgetUnavailable,

    /// The provider rejected the payment details on confirmation
    #[error("Payment confirmation rejected: {message}")]
    ConfirmationRejected {
        message: String,
        code: Option<String>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`JoinError`]s, matching how the UI recovers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The form is missing a selection; the UI must enforce it
    InputIncomplete,
    /// The backend or network failed; the user resubmits
    GatewayRejected,
    /// Step 3 without a ready, complete payment session
    SessionAbsent,
    /// The provider reported invalid payment input
    ConfirmationRejected,
    /// Setup problem outside of the wizard flow
    Setup,
}

impl JoinError {
    /// Returns true if resubmitting the same step may succeed without input changes
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            JoinError::NetworkError(_)
                | JoinError::ProviderError { .. }
                | JoinError::WidgetUnavailable
        )
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            JoinError::InputIncomplete { .. } | JoinError::InvalidAmount(_) => {
                ErrorKind::InputIncomplete
            }
            JoinError::GatewayRejected(_)
            | JoinError::ProviderError { .. }
            | JoinError::NetworkError(_)
            | JoinError::Serialization(_) => ErrorKind::GatewayRejected,
            JoinError::SessionAbsent
            | JoinError::WidgetIncomplete
            | JoinError::WidgetUnavailable => ErrorKind::SessionAbsent,
            JoinError::ConfirmationRejected { .. } => ErrorKind::ConfirmationRejected,
            JoinError::Configuration(_) | JoinError::Internal(_) => ErrorKind::Setup,
        }
    }
}

impl From<serde_json::Error> for JoinError {
    fn from(err: serde_json::Error) -> Self {
        JoinError::Serialization(err.to_string())
    }
}

/// Result type alias for wizard operations
pub type JoinResult<T> = Result<T, JoinError>;
