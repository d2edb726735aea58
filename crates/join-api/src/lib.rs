//! # join-api
//!
//! Membership backend client and terminal driver for join-wizard-rs.
//!
//! This crate provides:
//! - `ApiSignupGateway`, the reqwest-based `SignupGateway`
//! - Console stand-ins for the browser (`ConsoleView`, `ConsoleNavigator`,
//!   `TerminalWidgetHost`)
//! - `AppState`, which wires and runs the wizard from a form file
//!
//! ## Endpoints used
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/api/1.0/signup` | Start a signup |
//! | GET | `/api/1.0/content/join` | Public join content (Stripe key) |

pub mod client;
pub mod console;
pub mod state;

pub use client::{ApiClientConfig, ApiSignupGateway};
pub use console::{ConsoleNavigator, ConsoleView, PaymentInput, TerminalWidgetHost};
pub use state::{AppState, FormFile};
