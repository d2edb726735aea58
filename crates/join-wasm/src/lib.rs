//! # join-wasm
//!
//! WebAssembly bindings for join-wizard-rs.
//!
//! Runs the contribution model in the browser, so the page script only
//! collects inputs and applies the results:
//! - Reading the contribution from a form snapshot
//! - Fee display and amount-group visibility for step 1
//! - The signup payload and the completion URL
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { fee_display, signup_payload } from 'join-wizard-wasm';
//!
//! await init();
//!
//! const form = {
//!   email: 'ada@example.org',
//!   period: 'monthly',
//!   amounts: { monthly: '10' },
//!   paymentMethod: 's_card',
//!   payFee: true,
//! };
//!
//! const fee = fee_display(form, 'eu');
//! feeEl.textContent = fee.feeText;
//!
//! const body = signup_payload(form, 'https://members.example.org');
//! ```
//!
//! ## Building
//!
//! ```bash
//! wasm-pack build --target web
//! ```

use join_core::{
    amount_visibility as groups_for, fee_display as fee_block, AmountGroupView, Contribution,
    FeeDisplay, FeePolicy, FeeSchedule, FormSnapshot, JoinError, JoinResult, JoinUrls,
    SignupRequest,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use wasm_bindgen::prelude::*;

fn policy(forced_fee_amount: Option<f64>) -> FeePolicy {
    forced_fee_amount.map(FeePolicy::new).unwrap_or_default()
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid {}: {}", what, e)))
}

/// Plain JS objects rather than `Map`s, so the page can read fields directly
fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(|e| JsValue::from_str(&e.to_string()))
}

fn js_error(error: JoinError) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn contribution_of(form: &FormSnapshot, forced_fee_amount: Option<f64>) -> JoinResult<Contribution> {
    Contribution::from_form(form, &policy(forced_fee_amount))
}

fn fee_of(
    form: &FormSnapshot,
    region: &str,
    forced_fee_amount: Option<f64>,
) -> JoinResult<FeeDisplay> {
    fee_block(form, &FeeSchedule::default(), region, &policy(forced_fee_amount))
}

fn payload_of(
    form: &FormSnapshot,
    frontend_url: &str,
    forced_fee_amount: Option<f64>,
) -> JoinResult<SignupRequest> {
    let contribution = contribution_of(form, forced_fee_amount)?;
    Ok(SignupRequest::from_contribution(
        &contribution,
        &JoinUrls::new(frontend_url),
    ))
}

/// Read the contribution from a form snapshot
#[wasm_bindgen]
pub fn read_contribution(form: JsValue, forced_fee_amount: Option<f64>) -> Result<JsValue, JsValue> {
    let form: FormSnapshot = from_js(form, "form")?;
    to_js(&contribution_of(&form, forced_fee_amount).map_err(js_error)?)
}

/// Fee block for the current form; `payFeeChecked` must be written back to the checkbox
#[wasm_bindgen]
pub fn fee_display(
    form: JsValue,
    region: &str,
    forced_fee_amount: Option<f64>,
) -> Result<JsValue, JsValue> {
    let form: FormSnapshot = from_js(form, "form")?;
    to_js(&fee_of(&form, region, forced_fee_amount).map_err(js_error)?)
}

/// Visibility of every period's amount group
#[wasm_bindgen]
pub fn amount_visibility(form: JsValue) -> Result<JsValue, JsValue> {
    let form: FormSnapshot = from_js(form, "form")?;
    let groups: Vec<AmountGroupView> = groups_for(&form);
    to_js(&groups)
}

/// Body of the signup request for the current form
#[wasm_bindgen]
pub fn signup_payload(
    form: JsValue,
    frontend_url: &str,
    forced_fee_amount: Option<f64>,
) -> Result<JsValue, JsValue> {
    let form: FormSnapshot = from_js(form, "form")?;
    to_js(&payload_of(&form, frontend_url, forced_fee_amount).map_err(js_error)?)
}

/// Completion URL carrying the member's name
#[wasm_bindgen]
pub fn return_url(frontend_url: &str, first_name: &str, last_name: &str) -> Result<String, JsValue> {
    JoinUrls::new(frontend_url)
        .complete_url_for(first_name, last_name)
        .map_err(js_error)
}

/// Log to browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&JsValue::from_str(message));
}

/// Get library version
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}


#[cfg(all(test, target_arch = "wasm32"))]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    fn js_form(amount: &str) -> JsValue {
        to_js(&serde_json::json!({
            "email": "ada@example.org",
            "period": "monthly",
            "amounts": { "monthly": amount },
            "paymentMethod": "s_card",
            "payFee": false
        }))
        .unwrap()
    }

    #[wasm_bindgen_test]
    fn fee_display_returns_plain_object() {
        let fee: serde_json::Value =
            serde_wasm_bindgen::from_value(fee_display(js_form("1"), "eu", None).unwrap())
                .unwrap();

        assert_eq!(fee["visible"], true);
        assert_eq!(fee["payFeeChecked"], true);
        assert_eq!(fee["optInEnabled"], false);
    }

    #[wasm_bindgen_test]
    fn malformed_form_is_js_error() {
        let err = read_contribution(JsValue::from_str("not a form"), None).unwrap_err();
        assert!(err.as_string().unwrap().starts_with("Invalid form"));
    }
}
