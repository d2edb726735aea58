//! # Payment Session
//!
//! In-page payment collection for the setup-secret branch of step 2.
//!
//! ```text
//!  PaymentGateway::mount_widget ──► MountedWidget { handle, events }
//!                                          │
//!  WidgetHost (UI) ── WidgetNotifier ──────┘  ready() / change(complete, fields)
//!                                          │
//!  PaymentSession { gateway, handle, events } ── confirm() ──► ConfirmOutcome
//! ```
//!
//! The widget host is the only writer of the widget state; the session
//! reads it through [`WidgetEvents`].

use crate::error::{JoinError, JoinResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::rc::Rc;
use tokio::sync::watch;
use tracing::debug;

/// Latest state reported by the payment widget
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidgetState {
    pub ready: bool,
    pub complete: bool,
    /// Provider-specific payment method fields collected by the widget
    pub fields: BTreeMap<String, String>,
}

/// Write side of the widget channel, owned by the widget host
#[derive(Debug)]
pub struct WidgetNotifier {
    tx: watch::Sender<WidgetState>,
}

impl WidgetNotifier {
    /// The widget is mounted and interactive
    pub fn ready(&self) {
        self.tx.send_modify(|state| state.ready = true);
    }

    /// The widget input changed
    pub fn change(&self, complete: bool, fields: BTreeMap<String, String>) {
        self.tx.send_modify(|state| {
            state.complete = complete;
            state.fields = fields;
        });
    }

    /// True once the session side has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Read side of the widget channel, owned by the payment session
#[derive(Debug)]
pub struct WidgetEvents {
    rx: watch::Receiver<WidgetState>,
}

impl WidgetEvents {
    /// Resolve once the widget reported ready
    pub async fn ready(&mut self) -> JoinResult<()> {
        self.rx
            .wait_for(|state| state.ready)
            .await
            .map(|_| ())
            .map_err(|_| JoinError::WidgetUnavailable)
    }

    pub fn is_ready(&self) -> bool {
        self.rx.borrow().ready
    }

    pub fn is_complete(&self) -> bool {
        self.rx.borrow().complete
    }

    pub fn fields(&self) -> BTreeMap<String, String> {
        self.rx.borrow().fields.clone()
    }
}

/// Create a fresh widget channel
pub fn widget_channel() -> (WidgetNotifier, WidgetEvents) {
    let (tx, rx) = watch::channel(WidgetState::default());
    (WidgetNotifier { tx }, WidgetEvents { rx })
}

/// Identifies a mounted widget bound to one setup secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetHandle {
    /// Provider name (e.g., "stripe")
    pub provider: String,
    /// Provider's id of the pending setup (e.g., `seti_...`)
    pub setup_id: String,
    pub client_secret: String,
    pub public_key: String,
}

/// Everything needed to mount the payment widget
#[derive(Debug, Clone, PartialEq)]
pub struct MountRequest {
    pub public_key: String,
    pub client_secret: String,
    /// Opaque appearance, passed through unmodified
    pub appearance: serde_json::Value,
}

/// A mounted widget and its event channel
#[derive(Debug)]
pub struct MountedWidget {
    pub handle: WidgetHandle,
    pub events: WidgetEvents,
}

/// Billing details sent with the confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDetails {
    pub email: String,
    pub name: String,
}

/// Parameters of the final confirmation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmParams {
    /// Where the provider sends the member after a successful setup
    pub return_url: String,
    pub billing_details: BillingDetails,
}

/// Result of a confirmation the provider accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmOutcome {
    /// Where the browser must go next (the return URL or a provider action)
    pub redirect_url: String,
}

/// UI side hosting the payment widget
pub trait WidgetHost {
    /// Mount the widget for `handle`; the host reports through `notifier`
    fn mount(
        &self,
        handle: &WidgetHandle,
        appearance: &serde_json::Value,
        notifier: WidgetNotifier,
    ) -> JoinResult<()>;
}

/// Payment provider as seen by the wizard
#[async_trait(?Send)]
pub trait PaymentGateway {
    /// Initialize the provider with a public key and mount a widget bound to the setup secret
    async fn mount_widget(&self, request: MountRequest) -> JoinResult<MountedWidget>;

    /// Confirm the pending setup with the fields the widget collected
    async fn confirm_setup(
        &self,
        widget: &WidgetHandle,
        fields: &BTreeMap<String, String>,
        params: &ConfirmParams,
    ) -> JoinResult<ConfirmOutcome>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}

/// One gateway/widget pair scoped to a single setup secret
pub struct PaymentSession {
    gateway: Rc<dyn PaymentGateway>,
    handle: WidgetHandle,
    events: WidgetEvents,
}

impl PaymentSession {
    /// Mount a widget and wrap it into a session
    pub async fn start(gateway: Rc<dyn PaymentGateway>, request: MountRequest) -> JoinResult<Self> {
        let mounted = gateway.mount_widget(request).await?;
        debug!(
            provider = gateway.provider_name(),
            setup_id = %mounted.handle.setup_id,
            "Payment widget mounted"
        );
        Ok(Self::new(gateway, mounted))
    }

    pub fn new(gateway: Rc<dyn PaymentGateway>, mounted: MountedWidget) -> Self {
        Self {
            gateway,
            handle: mounted.handle,
            events: mounted.events,
        }
    }

    /// Resolve once the widget reported ready
    pub async fn ready(&mut self) -> JoinResult<()> {
        self.events.ready().await
    }

    pub fn is_ready(&self) -> bool {
        self.events.is_ready()
    }

    /// Latest completeness reported by the widget
    pub fn is_complete(&self) -> bool {
        self.events.is_complete()
    }

    pub fn handle(&self) -> &WidgetHandle {
        &self.handle
    }

    /// Confirm the setup with the provider.
    ///
    /// An error means the member has to correct the input; the session stays usable.
    pub async fn confirm(&self, params: &ConfirmParams) -> JoinResult<ConfirmOutcome> {
        let fields = self.events.fields();
        self.gateway.confirm_setup(&self.handle, &fields, params).await
    }
}

impl std::fmt::Debug for PaymentSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentSession")
            .field("provider", &self.gateway.provider_name())
            .field("handle", &self.handle)
            .field("ready", &self.is_ready())
            .field("complete", &self.is_complete())
            .finish()
    }
}
