//! # Fee Calculation
//!
//! The wizard only consumes the [`FeeCalculator`] contract: a pure function
//! from a contribution and a region to the processing fee. [`FeeSchedule`]
//! is a table-driven implementation loadable from `config/fees.toml`.

use crate::contribution::Contribution;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pure fee function used for display in step 1
pub trait FeeCalculator {
    /// Processing fee for `contribution` in `region`, in the contribution's currency
    fn fee(&self, contribution: &Contribution, region: &str) -> f64;
}

impl<F> FeeCalculator for F
where
    F: Fn(&Contribution, &str) -> f64,
{
    fn fee(&self, contribution: &Contribution, region: &str) -> f64 {
        self(contribution, region)
    }
}

/// Fee rate for one payment method: `fixed + percent * amount`, optionally clamped
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FeeRate {
    #[serde(default)]
    pub fixed: f64,
    #[serde(default)]
    pub percent: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl FeeRate {
    pub fn new(fixed: f64, percent: f64) -> Self {
        Self {
            fixed,
            percent,
            min: None,
            max: None,
        }
    }

    /// Builder: clamp the computed fee
    pub fn clamped(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn apply(&self, amount: f64) -> f64 {
        let mut fee = self.fixed + self.percent * amount;
        if let Some(min) = self.min {
            fee = fee.max(min);
        }
        if let Some(max) = self.max {
            fee = fee.min(max);
        }
        fee
    }
}

/// Fee table: region -> payment method -> rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default)]
    pub regions: HashMap<String, HashMap<String, FeeRate>>,
}

impl FeeSchedule {
    /// Create an empty schedule (every fee is zero)
    pub fn empty() -> Self {
        Self {
            regions: HashMap::new(),
        }
    }

    /// Builder: set the rate for a region and payment method
    pub fn with_rate(
        mut self,
        region: impl Into<String>,
        payment_method: impl Into<String>,
        rate: FeeRate,
    ) -> Self {
        self.regions
            .entry(region.into())
            .or_default()
            .insert(payment_method.into(), rate);
        self
    }

    pub fn rate(&self, region: &str, payment_method: &str) -> Option<&FeeRate> {
        self.regions.get(region)?.get(payment_method)
    }

    /// Load a schedule from TOML
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self::empty()
            .with_rate("eu", "s_card", FeeRate::new(0.25, 0.015))
            .with_rate("eu", "s_sepa", FeeRate::new(0.35, 0.0))
            .with_rate("eu", "s_paypal", FeeRate::new(0.35, 0.0299))
            .with_rate("eu", "gc_direct-debit", FeeRate::new(0.2, 0.01).clamped(0.0, 4.0))
            .with_rate("gb", "s_card", FeeRate::new(0.2, 0.015))
            .with_rate("gb", "s_sepa", FeeRate::new(0.3, 0.0))
            .with_rate("gb", "s_bacs", FeeRate::new(0.0, 0.01).clamped(0.2, 2.0))
            .with_rate("gb", "s_paypal", FeeRate::new(0.3, 0.029))
            .with_rate("gb", "gc_direct-debit", FeeRate::new(0.2, 0.01).clamped(0.0, 4.0))
    }
}

impl FeeCalculator for FeeSchedule {
    fn fee(&self, contribution: &Contribution, region: &str) -> f64 {
        self.rate(region, &contribution.payment_method)
            .map(|rate| rate.apply(contribution.amount))
            .unwrap_or(0.0)
    }
}

/// Format a fee for display with two decimals
pub fn format_fee(fee: f64) -> String {
    format!("{:.2}", fee)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::ContributionPeriod;

    fn contribution(amount: f64, method: &str) -> Contribution {
        Contribution {
            email: "ada@example.org".to_string(),
            amount,
            period: ContributionPeriod::Monthly,
            payment_method: method.to_string(),
            pay_fee: false,
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    #[test]
    fn test_default_schedule() {
        let schedule = FeeSchedule::default();

        assert_eq!(format_fee(schedule.fee(&contribution(10.0, "s_card"), "eu")), "0.40");
        assert_eq!(format_fee(schedule.fee(&contribution(10.0, "s_sepa"), "eu")), "0.35");
        assert_eq!(format_fee(schedule.fee(&contribution(5.0, "s_bacs"), "gb")), "0.20");
        assert_eq!(format_fee(schedule.fee(&contribution(500.0, "s_bacs"), "gb")), "2.00");
    }

    #[test]
    fn test_unknown_method_or_region_is_free() {
        let schedule = FeeSchedule::default();

        assert_eq!(schedule.fee(&contribution(10.0, "cash"), "eu"), 0.0);
        assert_eq!(schedule.fee(&contribution(10.0, "s_card"), "mars"), 0.0);
    }

    #[test]
    fn test_schedule_from_toml() {
        let schedule = FeeSchedule::from_toml(
            r#"
            [regions.eu.s_card]
            fixed = 0.5
            percent = 0.02

            [regions.eu.s_bacs]
            percent = 0.01
            min = 0.3
            max = 1.0
            "#,
        )
        .unwrap();

        assert_eq!(format_fee(schedule.fee(&contribution(10.0, "s_card"), "eu")), "0.70");
        assert_eq!(format_fee(schedule.fee(&contribution(1.0, "s_bacs"), "eu")), "0.30");
    }

    #[test]
    fn test_closure_calculator() {
        let flat = |_: &Contribution, _: &str| 0.42;
        assert_eq!(flat.fee(&contribution(10.0, "s_card"), "eu"), 0.42);
    }
}
