//! In-memory test doubles for the wizard's collaborators.
//!
//! Every double records what it was asked to do and can be scripted to
//! fail the next call.

use crate::contribution::ContributionPeriod;
use crate::display::{AmountGroupView, FeeDisplay, SubmitState, WizardView};
use crate::error::{JoinError, JoinResult};
use crate::payment::{
    widget_channel, ConfirmOutcome, ConfirmParams, MountRequest, MountedWidget, PaymentGateway,
    WidgetHandle, WidgetHost, WidgetNotifier,
};
use crate::signup::{JoinContent, SignupGateway, SignupRequest, SignupResponse};
use crate::wizard::Navigator;
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

/// Scripted membership backend
#[derive(Debug)]
pub struct MockSignupGateway {
    response: RefCell<SignupResponse>,
    content: RefCell<JoinContent>,
    next_error: RefCell<Option<JoinError>>,
    signups: RefCell<Vec<SignupRequest>>,
    content_calls: Cell<usize>,
}

impl MockSignupGateway {
    /// Answers every signup with a setup secret and the key `pk_test_mock`
    pub fn new() -> Self {
        Self {
            response: RefCell::new(SignupResponse::payment_setup("seti_mock_secret_mock")),
            content: RefCell::new(JoinContent {
                stripe_public_key: "pk_test_mock".to_string(),
            }),
            next_error: RefCell::new(None),
            signups: RefCell::new(Vec::new()),
            content_calls: Cell::new(0),
        }
    }

    pub fn set_response(&self, response: SignupResponse) {
        *self.response.borrow_mut() = response;
    }

    pub fn set_content(&self, content: JoinContent) {
        *self.content.borrow_mut() = content;
    }

    /// Fail the next backend call with `error`
    pub fn fail_next(&self, error: JoinError) {
        *self.next_error.borrow_mut() = Some(error);
    }

    pub fn signup_calls(&self) -> Vec<SignupRequest> {
        self.signups.borrow().clone()
    }

    pub fn content_calls(&self) -> usize {
        self.content_calls.get()
    }
}

impl Default for MockSignupGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl SignupGateway for MockSignupGateway {
    async fn signup(&self, request: &SignupRequest) -> JoinResult<SignupResponse> {
        self.signups.borrow_mut().push(request.clone());
        if let Some(error) = self.next_error.borrow_mut().take() {
            return Err(error);
        }
        Ok(self.response.borrow().clone())
    }

    async fn join_content(&self) -> JoinResult<JoinContent> {
        self.content_calls.set(self.content_calls.get() + 1);
        if let Some(error) = self.next_error.borrow_mut().take() {
            return Err(error);
        }
        Ok(self.content.borrow().clone())
    }
}

/// A confirmation the mock gateway received
#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmCall {
    pub handle: WidgetHandle,
    pub fields: BTreeMap<String, String>,
    pub params: ConfirmParams,
}

/// Payment gateway whose widget is driven from the test.
///
/// The mock keeps the notifier of the most recent widget; `widget_*`
/// methods play the part of the user interacting with it.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    auto_ready: bool,
    notifier: RefCell<Option<WidgetNotifier>>,
    mounts: RefCell<Vec<MountRequest>>,
    confirms: RefCell<Vec<ConfirmCall>>,
    mount_error: RefCell<Option<JoinError>>,
    confirm_error: RefCell<Option<JoinError>>,
    confirm_redirect: RefCell<Option<String>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: report every mounted widget ready immediately
    pub fn auto_ready(mut self) -> Self {
        self.auto_ready = true;
        self
    }

    pub fn widget_ready(&self) {
        if let Some(notifier) = self.notifier.borrow().as_ref() {
            notifier.ready();
        }
    }

    pub fn widget_change(&self, complete: bool, fields: BTreeMap<String, String>) {
        if let Some(notifier) = self.notifier.borrow().as_ref() {
            notifier.change(complete, fields);
        }
    }

    /// Tear the widget down without it ever becoming ready
    pub fn drop_widget(&self) {
        self.notifier.borrow_mut().take();
    }

    /// Fail the next mount with `error`
    pub fn fail_next_mount(&self, error: JoinError) {
        *self.mount_error.borrow_mut() = Some(error);
    }

    /// Fail the next confirmation with `error`
    pub fn set_confirm_error(&self, error: JoinError) {
        *self.confirm_error.borrow_mut() = Some(error);
    }

    /// Redirect successful confirmations here instead of the return URL
    pub fn set_confirm_redirect(&self, url: impl Into<String>) {
        *self.confirm_redirect.borrow_mut() = Some(url.into());
    }

    pub fn mount_calls(&self) -> Vec<MountRequest> {
        self.mounts.borrow().clone()
    }

    pub fn confirm_calls(&self) -> Vec<ConfirmCall> {
        self.confirms.borrow().clone()
    }
}

#[async_trait(?Send)]
impl PaymentGateway for MockPaymentGateway {
    async fn mount_widget(&self, request: MountRequest) -> JoinResult<MountedWidget> {
        self.mounts.borrow_mut().push(request.clone());
        if let Some(error) = self.mount_error.borrow_mut().take() {
            return Err(error);
        }

        let setup_id = request
            .client_secret
            .split("_secret_")
            .next()
            .unwrap_or_default()
            .to_string();
        let handle = WidgetHandle {
            provider: self.provider_name().to_string(),
            setup_id,
            client_secret: request.client_secret,
            public_key: request.public_key,
        };

        let (notifier, events) = widget_channel();
        if self.auto_ready {
            notifier.ready();
        }
        *self.notifier.borrow_mut() = Some(notifier);

        Ok(MountedWidget { handle, events })
    }

    async fn confirm_setup(
        &self,
        widget: &WidgetHandle,
        fields: &BTreeMap<String, String>,
        params: &ConfirmParams,
    ) -> JoinResult<ConfirmOutcome> {
        self.confirms.borrow_mut().push(ConfirmCall {
            handle: widget.clone(),
            fields: fields.clone(),
            params: params.clone(),
        });
        if let Some(error) = self.confirm_error.borrow_mut().take() {
            return Err(error);
        }

        let redirect_url = self
            .confirm_redirect
            .borrow()
            .clone()
            .unwrap_or_else(|| params.return_url.clone());
        Ok(ConfirmOutcome { redirect_url })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Widget host for gateways that mount through a [`WidgetHost`]
#[derive(Debug, Default)]
pub struct MockWidgetHost {
    ready_on_mount: bool,
    notifier: RefCell<Option<WidgetNotifier>>,
    mounted: RefCell<Vec<WidgetHandle>>,
}

impl MockWidgetHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: report ready as soon as a widget is mounted
    pub fn ready_on_mount(mut self) -> Self {
        self.ready_on_mount = true;
        self
    }

    pub fn change(&self, complete: bool, fields: BTreeMap<String, String>) {
        if let Some(notifier) = self.notifier.borrow().as_ref() {
            notifier.change(complete, fields);
        }
    }

    pub fn mounted(&self) -> Vec<WidgetHandle> {
        self.mounted.borrow().clone()
    }
}

impl WidgetHost for MockWidgetHost {
    fn mount(
        &self,
        handle: &WidgetHandle,
        _appearance: &serde_json::Value,
        notifier: WidgetNotifier,
    ) -> JoinResult<()> {
        self.mounted.borrow_mut().push(handle.clone());
        if self.ready_on_mount {
            notifier.ready();
        }
        *self.notifier.borrow_mut() = Some(notifier);
        Ok(())
    }
}

/// View that remembers everything rendered into it
#[derive(Debug, Default)]
pub struct RecordingView {
    visible: RefCell<BTreeSet<usize>>,
    submit: RefCell<BTreeMap<usize, Vec<SubmitState>>>,
    fees: RefCell<Vec<FeeDisplay>>,
    groups: RefCell<BTreeMap<ContributionPeriod, AmountGroupView>>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps currently shown, in order
    pub fn visible_steps(&self) -> Vec<usize> {
        self.visible.borrow().iter().copied().collect()
    }

    pub fn submit_state(&self, step: usize) -> Option<SubmitState> {
        self.submit
            .borrow()
            .get(&step)
            .and_then(|history| history.last().copied())
    }

    /// Every submit state a step's button went through
    pub fn submit_history(&self, step: usize) -> Vec<SubmitState> {
        self.submit.borrow().get(&step).cloned().unwrap_or_default()
    }

    pub fn last_fee(&self) -> Option<FeeDisplay> {
        self.fees.borrow().last().cloned()
    }

    pub fn fee_renders(&self) -> usize {
        self.fees.borrow().len()
    }

    /// Latest rendering of each amount group
    pub fn amount_groups(&self) -> Vec<AmountGroupView> {
        self.groups.borrow().values().copied().collect()
    }
}

impl WizardView for RecordingView {
    fn set_step_visible(&self, step: usize, visible: bool) {
        let mut shown = self.visible.borrow_mut();
        if visible {
            shown.insert(step);
        } else {
            shown.remove(&step);
        }
    }

    fn set_submit_state(&self, step: usize, state: SubmitState) {
        self.submit.borrow_mut().entry(step).or_default().push(state);
    }

    fn render_fee(&self, display: &FeeDisplay) {
        self.fees.borrow_mut().push(display.clone());
    }

    fn render_amount_group(&self, group: &AmountGroupView) {
        self.groups.borrow_mut().insert(group.period, *group);
    }
}

/// Navigator that records the URLs instead of leaving the page
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: RefCell<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.borrow().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        self.visited.borrow_mut().push(url.to_string());
    }
}
