//! # Console UI
//!
//! Terminal stand-ins for the browser side of the wizard: the view logs
//! what a page would show, the navigator remembers where the browser would
//! go, and the widget host replays payment input from the form file.

use join_core::{
    AmountGroupView, FeeDisplay, JoinResult, Navigator, SubmitState, WidgetHandle, WidgetHost,
    WidgetNotifier, WizardView,
};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Wizard view that logs every change
#[derive(Debug, Default)]
pub struct ConsoleView;

impl WizardView for ConsoleView {
    fn set_step_visible(&self, step: usize, visible: bool) {
        if visible {
            info!("Showing step {}", step + 1);
        }
    }

    fn set_submit_state(&self, step: usize, state: SubmitState) {
        debug!("Step {} submit: {:?}", step + 1, state);
    }

    fn render_fee(&self, fee: &FeeDisplay) {
        if !fee.visible {
            debug!("Fee hidden");
            return;
        }
        info!(
            "Fee {} ({}{})",
            fee.fee_text,
            if fee.show_required { "required" } else { "optional" },
            if fee.pay_fee_checked { ", paid by member" } else { "" }
        );
    }

    fn render_amount_group(&self, group: &AmountGroupView) {
        if group.visible {
            debug!(
                "Amount group {} shown, custom input {}",
                group.period,
                if group.custom_input_visible { "shown" } else { "hidden" }
            );
        }
    }
}

/// Navigator that records the last destination instead of opening it
#[derive(Debug, Default)]
pub struct ConsoleNavigator {
    destination: RefCell<Option<String>>,
}

impl ConsoleNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destination(&self) -> Option<String> {
        self.destination.borrow().clone()
    }
}

impl Navigator for ConsoleNavigator {
    fn navigate(&self, url: &str) {
        info!("Navigating to {}", url);
        *self.destination.borrow_mut() = Some(url.to_string());
    }
}

/// Payment details the terminal member "typed" into the widget
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PaymentInput {
    /// Whether the widget would report its input as complete
    #[serde(default)]
    pub complete: bool,
    /// Payment method data (e.g. `type = "card"`, `"card[token]" = "tok_visa"`)
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

/// Widget host reporting ready on mount and replaying [`PaymentInput`]
#[derive(Debug)]
pub struct TerminalWidgetHost {
    input: PaymentInput,
    notifier: RefCell<Option<WidgetNotifier>>,
}

impl TerminalWidgetHost {
    pub fn new(input: PaymentInput) -> Self {
        Self {
            input,
            notifier: RefCell::new(None),
        }
    }
}

impl WidgetHost for TerminalWidgetHost {
    fn mount(
        &self,
        handle: &WidgetHandle,
        _appearance: &serde_json::Value,
        notifier: WidgetNotifier,
    ) -> JoinResult<()> {
        info!("Payment widget mounted for {}", handle.setup_id);
        notifier.ready();
        notifier.change(self.input.complete, self.input.fields.clone());

        // The session side only sees updates while the notifier lives
        *self.notifier.borrow_mut() = Some(notifier);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use join_core::widget_channel;

    #[test]
    fn test_navigator_keeps_last_destination() {
        let navigator = ConsoleNavigator::new();
        assert_eq!(navigator.destination(), None);

        navigator.navigate("https://pay.example.com/flow/1");
        navigator.navigate("https://members.example.org/join/complete");
        assert_eq!(
            navigator.destination().as_deref(),
            Some("https://members.example.org/join/complete")
        );
    }

    #[test]
    fn test_view_renders_fee_blocks() {
        let view = ConsoleView;
        let fee = FeeDisplay {
            visible: true,
            fee: 0.27,
            fee_text: "0.27".to_string(),
            opt_in_enabled: false,
            pay_fee_checked: true,
            show_required: true,
            show_optional: false,
        };

        view.render_fee(&fee);
        view.render_fee(&FeeDisplay {
            visible: false,
            ..fee
        });
    }

    #[tokio::test]
    async fn test_widget_host_replays_input() {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_string(), "card".to_string());
        let host = TerminalWidgetHost::new(PaymentInput {
            complete: true,
            fields: fields.clone(),
        });
        let handle = WidgetHandle {
            provider: "stripe".to_string(),
            setup_id: "seti_123".to_string(),
            client_secret: "seti_123_secret_456".to_string(),
            public_key: "pk_test_xyz789".to_string(),
        };

        let (notifier, mut events) = widget_channel();
        host.mount(&handle, &serde_json::Value::Null, notifier).unwrap();

        assert!(events.ready().await.is_ok());
        assert!(events.is_complete());
        assert_eq!(events.fields(), fields);
    }
}
