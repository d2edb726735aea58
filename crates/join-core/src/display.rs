//! # Presentational State
//!
//! Step-1 view models derived from the form: the fee block and the
//! per-period amount groups. These functions only touch the view (and the
//! fee opt-in checkbox); the [`Contribution`] read from the form is never
//! changed by them.

use crate::contribution::{Contribution, ContributionForm, ContributionPeriod, FeePolicy};
use crate::error::JoinResult;
use crate::fee::{format_fee, FeeCalculator};
use serde::Serialize;

/// Busy state of a step's submit control
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitState {
    /// Enabled, no loading indicator
    Idle,
    /// Disabled with a loading indicator while the step handler runs
    Busy,
}

impl SubmitState {
    pub fn is_busy(&self) -> bool {
        matches!(self, SubmitState::Busy)
    }
}

/// What the fee block should show
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeDisplay {
    /// The whole block; hidden unless the period is monthly
    pub visible: bool,
    pub fee: f64,
    /// Fee formatted with two decimals
    pub fee_text: String,
    /// Whether the opt-in checkbox can be toggled
    pub opt_in_enabled: bool,
    pub pay_fee_checked: bool,
    /// "Fee required" indicator (minimum tier)
    pub show_required: bool,
    /// "Fee optional" indicator
    pub show_optional: bool,
}

/// Visibility of one period's amount group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountGroupView {
    pub period: ContributionPeriod,
    pub visible: bool,
    /// Disabled groups are excluded from submission
    pub enabled: bool,
    pub custom_input_visible: bool,
    pub custom_input_enabled: bool,
}

/// Presentational sink implemented by the UI layer.
///
/// Methods take `&self`; implementations own their interior mutability the
/// way a document does.
pub trait WizardView {
    /// Show or hide a step container
    fn set_step_visible(&self, step: usize, visible: bool);

    fn set_submit_state(&self, step: usize, state: SubmitState);

    fn render_fee(&self, display: &FeeDisplay);

    fn render_amount_group(&self, group: &AmountGroupView);
}

/// Compute the fee block for the current form, without rendering it.
///
/// Applies the minimum-tier rule by forcing the opt-in checkbox on.
pub fn fee_display(
    form: &dyn ContributionForm,
    calculator: &dyn FeeCalculator,
    region: &str,
    policy: &FeePolicy,
) -> JoinResult<FeeDisplay> {
    let contribution = Contribution::from_form(form, policy)?;
    let fee = calculator.fee(&contribution, region);

    let forced = policy.forces_fee(contribution.amount);
    if forced {
        form.set_pay_fee(true);
    }

    Ok(FeeDisplay {
        visible: contribution.period.allows_fee(),
        fee,
        fee_text: format_fee(fee),
        opt_in_enabled: !forced,
        pay_fee_checked: form.pay_fee(),
        show_required: forced,
        show_optional: !forced,
    })
}

/// Recompute and render the fee block
pub fn update_fee_display(
    form: &dyn ContributionForm,
    view: &dyn WizardView,
    calculator: &dyn FeeCalculator,
    region: &str,
    policy: &FeePolicy,
) -> JoinResult<FeeDisplay> {
    let display = fee_display(form, calculator, region, policy)?;
    view.render_fee(&display);
    Ok(display)
}

/// Compute the amount groups for the current form, without rendering them
pub fn amount_visibility(form: &dyn ContributionForm) -> Vec<AmountGroupView> {
    let active = form.selected_period();

    ContributionPeriod::ALL
        .iter()
        .map(|&period| {
            let visible = active == Some(period);
            let is_custom = form
                .amount_selection(period)
                .map(|selection| selection.is_custom())
                .unwrap_or(false);

            AmountGroupView {
                period,
                visible,
                enabled: visible,
                custom_input_visible: is_custom,
                custom_input_enabled: visible && is_custom,
            }
        })
        .collect()
}

/// Recompute and render the amount groups
pub fn update_amount_visibility(
    form: &dyn ContributionForm,
    view: &dyn WizardView,
) -> Vec<AmountGroupView> {
    let groups = amount_visibility(form);
    for group in &groups {
        view.render_amount_group(group);
    }
    groups
}
