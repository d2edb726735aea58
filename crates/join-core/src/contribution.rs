//! # Contribution Model
//!
//! The contribution a member chooses in step 1 and the typed accessor the UI
//! layer implements so the core can read it without knowing about markup.

use crate::error::{JoinError, JoinResult};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::collections::BTreeMap;

/// Contribution period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionPeriod {
    Monthly,
    Annually,
}

impl ContributionPeriod {
    /// All periods, in display order
    pub const ALL: [ContributionPeriod; 2] =
        [ContributionPeriod::Monthly, ContributionPeriod::Annually];

    /// Wire name used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionPeriod::Monthly => "monthly",
            ContributionPeriod::Annually => "annually",
        }
    }

    /// Fee absorption only applies to recurring monthly contributions
    pub fn allows_fee(&self) -> bool {
        matches!(self, ContributionPeriod::Monthly)
    }
}

impl std::fmt::Display for ContributionPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContributionPeriod {
    type Err = JoinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monthly" => Ok(ContributionPeriod::Monthly),
            "annually" => Ok(ContributionPeriod::Annually),
            _ => Err(JoinError::InputIncomplete { field: "period" }),
        }
    }
}

/// What is selected in a period's amount group
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountSelection {
    /// One of the preset amounts
    Preset(f64),
    /// The "custom" option; the value lives in the period's custom field
    Custom,
}

impl AmountSelection {
    /// Marker value the UI uses for the custom option
    pub const CUSTOM: &'static str = "custom";

    /// Parse the raw value of a selected amount option
    pub fn parse(raw: &str) -> JoinResult<Self> {
        let raw = raw.trim();
        if raw == Self::CUSTOM {
            return Ok(AmountSelection::Custom);
        }
        parse_amount(raw).map(AmountSelection::Preset)
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, AmountSelection::Custom)
    }
}

fn parse_amount(raw: &str) -> JoinResult<f64> {
    let amount: f64 = raw
        .trim()
        .parse()
        .map_err(|_| JoinError::InvalidAmount(format!("{:?} is not a number", raw)))?;

    if !amount.is_finite() || amount <= 0.0 {
        return Err(JoinError::InvalidAmount(format!(
            "{} must be greater than zero",
            amount
        )));
    }
    Ok(amount)
}

/// Typed accessor over the step-1/step-2 form, supplied by the UI layer.
///
/// Reads must reflect the current input state. `set_pay_fee` is the only
/// write and is used to force the opt-in checkbox.
pub trait ContributionForm {
    fn email(&self) -> String;

    fn first_name(&self) -> String;

    fn last_name(&self) -> String;

    /// The checked period, if any
    fn selected_period(&self) -> Option<ContributionPeriod>;

    /// The checked amount option within a period's group
    fn amount_selection(&self, period: ContributionPeriod) -> Option<AmountSelection>;

    /// Raw text of a period's custom amount field
    fn custom_amount(&self, period: ContributionPeriod) -> Option<String>;

    /// The checked payment method identifier (e.g. `s_card`)
    fn selected_payment_method(&self) -> Option<String>;

    /// State of the fee opt-in checkbox
    fn pay_fee(&self) -> bool;

    fn set_pay_fee(&self, checked: bool);
}

/// Rule forcing fee absorption at the minimum tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeePolicy {
    /// Amount at which the fee must be paid by the member
    pub forced_fee_amount: f64,
}

impl FeePolicy {
    pub fn new(forced_fee_amount: f64) -> Self {
        Self { forced_fee_amount }
    }

    /// Whether `amount` is the minimum tier that forces fee absorption
    pub fn forces_fee(&self, amount: f64) -> bool {
        amount == self.forced_fee_amount
    }
}

impl Default for FeePolicy {
    fn default() -> Self {
        Self::new(1.0)
    }
}

/// The member's chosen contribution, read fresh from the form every time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contribution {
    pub email: String,
    pub amount: f64,
    pub period: ContributionPeriod,
    pub payment_method: String,
    pub pay_fee: bool,
    pub first_name: String,
    pub last_name: String,
}

impl Contribution {
    /// Read the current contribution from the form.
    ///
    /// A custom selection resolves to the selected period's custom field.
    /// Missing period or payment method is an error, never a default.
    pub fn from_form(form: &dyn ContributionForm, policy: &FeePolicy) -> JoinResult<Self> {
        let period = form
            .selected_period()
            .ok_or(JoinError::InputIncomplete { field: "period" })?;

        let amount = match form.amount_selection(period) {
            Some(AmountSelection::Preset(amount)) => amount,
            Some(AmountSelection::Custom) => {
                let raw = form.custom_amount(period).unwrap_or_default();
                parse_amount(&raw)?
            }
            None => return Err(JoinError::InputIncomplete { field: "amount" }),
        };
        if !amount.is_finite() || amount <= 0.0 {
            return Err(JoinError::InvalidAmount(format!(
                "{} must be greater than zero",
                amount
            )));
        }

        let payment_method = form
            .selected_payment_method()
            .filter(|method| !method.is_empty())
            .ok_or(JoinError::InputIncomplete {
                field: "payment method",
            })?;

        Ok(Self {
            email: form.email(),
            amount,
            period,
            payment_method,
            pay_fee: form.pay_fee() || policy.forces_fee(amount),
            first_name: form.first_name(),
            last_name: form.last_name(),
        })
    }

    /// Full name as sent in billing details
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Fee absorption as forwarded to the backend: never for non-monthly periods
    pub fn effective_pay_fee(&self) -> bool {
        self.pay_fee && self.period.allows_fee()
    }
}

/// Plain snapshot of the form's inputs.
///
/// Used wherever the form is data rather than live controls: the terminal
/// driver reads it from TOML and the wasm bindings receive it from JS.
/// `amounts` holds the raw value of each period's checked option
/// (a number or `"custom"`), keyed by period name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSnapshot {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub period: Option<ContributionPeriod>,
    #[serde(default)]
    pub amounts: BTreeMap<String, String>,
    #[serde(default)]
    pub custom_amounts: BTreeMap<String, String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub pay_fee: Cell<bool>,
}

impl FormSnapshot {
    /// Load a snapshot from a TOML document
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl ContributionForm for FormSnapshot {
    fn email(&self) -> String {
        self.email.clone()
    }

    fn first_name(&self) -> String {
        self.first_name.clone()
    }

    fn last_name(&self) -> String {
        self.last_name.clone()
    }

    fn selected_period(&self) -> Option<ContributionPeriod> {
        self.period
    }

    fn amount_selection(&self, period: ContributionPeriod) -> Option<AmountSelection> {
        // An unparsable preset is kept as NaN so the read fails as InvalidAmount
        self.amounts.get(period.as_str()).map(|raw| {
            AmountSelection::parse(raw).unwrap_or(AmountSelection::Preset(f64::NAN))
        })
    }

    fn custom_amount(&self, period: ContributionPeriod) -> Option<String> {
        self.custom_amounts.get(period.as_str()).cloned()
    }

    fn selected_payment_method(&self) -> Option<String> {
        self.payment_method.clone()
    }

    fn pay_fee(&self) -> bool {
        self.pay_fee.get()
    }

    fn set_pay_fee(&self, checked: bool) {
        self.pay_fee.set(checked);
    }
}
