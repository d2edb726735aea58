//! # Join Flow
//!
//! The three step handlers of the membership signup wizard:
//!
//! | Step | Handler | Network |
//! |------|---------|---------|
//! | 0 | refresh fee display, advance | none |
//! | 1 | submit signup; redirect away or mount the payment widget | backend, gateway |
//! | 2 | confirm the payment setup; the gateway redirects | gateway |
//!
//! ## Example
//!
//! ```rust,ignore
//! let flow = JoinFlow::new(config, form, view.clone(), navigator, signup, payments);
//! let wizard = StepOrchestrator::new(flow, view);
//! wizard.start();
//!
//! wizard.dispatch(WizardEvent::Submit { step: STEP_CONTRIBUTION }).await;
//! ```

use crate::config::JoinConfig;
use crate::contribution::{Contribution, ContributionForm, FeePolicy};
use crate::display::{update_amount_visibility, update_fee_display, FeeDisplay, WizardView};
use crate::error::{JoinError, JoinResult};
use crate::fee::{FeeCalculator, FeeSchedule};
use crate::payment::{BillingDetails, ConfirmParams, MountRequest, PaymentGateway, PaymentSession};
use crate::signup::{SignupGateway, SignupOutcome, SignupRequest};
use crate::step::{FormField, StepHandler};
use crate::urls::JoinUrls;
use async_trait::async_trait;
use std::rc::Rc;
use tracing::{debug, info, instrument};

/// Contribution amount, period and fee
pub const STEP_CONTRIBUTION: usize = 0;
/// Personal details and signup submission
pub const STEP_DETAILS: usize = 1;
/// In-page payment collection and confirmation
pub const STEP_PAYMENT: usize = 2;
/// Number of wizard steps
pub const JOIN_STEPS: usize = 3;

/// Browser navigation, performed by the UI layer
pub trait Navigator {
    fn navigate(&self, url: &str);
}

/// Step handlers of the signup wizard and the state of one signup attempt
pub struct JoinFlow {
    urls: JoinUrls,
    policy: FeePolicy,
    fee_region: String,
    appearance: serde_json::Value,
    form: Rc<dyn ContributionForm>,
    view: Rc<dyn WizardView>,
    navigator: Rc<dyn Navigator>,
    signup: Rc<dyn SignupGateway>,
    payments: Rc<dyn PaymentGateway>,
    fees: Rc<dyn FeeCalculator>,
    session: Option<PaymentSession>,
}

impl JoinFlow {
    pub fn new(
        config: JoinConfig,
        form: Rc<dyn ContributionForm>,
        view: Rc<dyn WizardView>,
        navigator: Rc<dyn Navigator>,
        signup: Rc<dyn SignupGateway>,
        payments: Rc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            urls: config.urls(),
            policy: config.fee_policy(),
            fee_region: config.fee_region,
            appearance: config.appearance,
            form,
            view,
            navigator,
            signup,
            payments,
            fees: Rc::new(FeeSchedule::default()),
            session: None,
        }
    }

    /// Builder: use a different fee calculator
    pub fn with_fee_calculator(mut self, fees: Rc<dyn FeeCalculator>) -> Self {
        self.fees = fees;
        self
    }

    /// Read the contribution as it is in the form right now
    pub fn contribution(&self) -> JoinResult<Contribution> {
        Contribution::from_form(self.form.as_ref(), &self.policy)
    }

    /// The payment session of the current signup attempt, if step 2 created one
    pub fn payment_session(&self) -> Option<&PaymentSession> {
        self.session.as_ref()
    }

    /// Recompute and render the fee block
    pub fn refresh_fee(&self) -> JoinResult<FeeDisplay> {
        update_fee_display(
            self.form.as_ref(),
            self.view.as_ref(),
            self.fees.as_ref(),
            &self.fee_region,
            &self.policy,
        )
    }

    /// Recompute and render the amount groups
    pub fn refresh_amounts(&self) {
        update_amount_visibility(self.form.as_ref(), self.view.as_ref());
    }

    /// Step 1: nothing to submit, the fee shown in step 2 is refreshed
    fn choose_contribution(&self) -> JoinResult<bool> {
        self.refresh_fee()?;
        Ok(true)
    }

    /// Step 2: submit the signup and branch on the backend's answer
    #[instrument(skip(self))]
    async fn submit_signup(&mut self) -> JoinResult<bool> {
        // A new attempt never reuses the previous attempt's widget
        self.session = None;

        let contribution = self.contribution()?;
        let request = SignupRequest::from_contribution(&contribution, &self.urls);
        info!(
            period = %request.contribution.period,
            amount = request.contribution.amount,
            pay_fee = request.contribution.pay_fee,
            payment_method = %request.contribution.payment_method,
            "Submitting signup"
        );

        let response = self.signup.signup(&request).await?;

        match response.into_outcome()? {
            SignupOutcome::Redirect(url) => {
                info!(%url, "Signup handed off to external payment flow");
                self.navigator.navigate(&url);
                Ok(false)
            }
            SignupOutcome::PaymentSetup { client_secret } => {
                let content = self.signup.join_content().await?;
                let request = MountRequest {
                    public_key: content.stripe_public_key,
                    client_secret,
                    appearance: self.appearance.clone(),
                };

                let mut session = PaymentSession::start(self.payments.clone(), request).await?;
                session.ready().await?;
                debug!(setup_id = %session.handle().setup_id, "Payment widget ready");

                self.session = Some(session);
                Ok(true)
            }
        }
    }

    /// Step 3: confirm the payment setup; success is a navigation
    #[instrument(skip(self))]
    async fn confirm_payment(&mut self) -> JoinResult<bool> {
        let session = self.session.as_ref().ok_or(JoinError::SessionAbsent)?;
        if !session.is_complete() {
            return Err(JoinError::WidgetIncomplete);
        }

        let contribution = self.contribution()?;
        let params = ConfirmParams {
            return_url: self
                .urls
                .complete_url_for(&contribution.first_name, &contribution.last_name)?,
            billing_details: BillingDetails {
                email: contribution.email.clone(),
                name: contribution.full_name(),
            },
        };

        let outcome = session.confirm(&params).await?;
        info!(url = %outcome.redirect_url, "Payment setup confirmed");

        self.session = None;
        self.navigator.navigate(&outcome.redirect_url);
        Ok(false)
    }
}

#[async_trait(?Send)]
impl StepHandler for JoinFlow {
    fn step_count(&self) -> usize {
        JOIN_STEPS
    }

    async fn handle_step(&mut self, step: usize) -> JoinResult<bool> {
        match step {
            STEP_CONTRIBUTION => self.choose_contribution(),
            STEP_DETAILS => self.submit_signup().await,
            STEP_PAYMENT => self.confirm_payment().await,
            other => Err(JoinError::Internal(format!("No handler for step {}", other))),
        }
    }

    fn field_changed(&mut self, step: usize, field: FormField) {
        if step == STEP_CONTRIBUTION {
            self.refresh_amounts();
        }
        if field.affects_fee() {
            // Half-typed input is expected here; the submit handlers report it
            if let Err(error) = self.refresh_fee() {
                debug!(%error, "Fee not refreshed");
            }
        }
    }

    fn started(&mut self) {
        self.refresh_amounts();
        if let Err(error) = self.refresh_fee() {
            debug!(%error, "Fee not refreshed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contribution::{ContributionPeriod, FormSnapshot};
    use crate::mock::{MockPaymentGateway, MockSignupGateway, RecordingNavigator, RecordingView};
    use crate::signup::{JoinContent, SignupResponse};

    struct Fixture {
        form: Rc<FormSnapshot>,
        view: Rc<RecordingView>,
        navigator: Rc<RecordingNavigator>,
        signup: Rc<MockSignupGateway>,
        payments: Rc<MockPaymentGateway>,
    }

    impl Fixture {
        fn new(period: ContributionPeriod, amount: &str) -> Self {
            let mut form = FormSnapshot {
                email: "ada@example.org".to_string(),
                first_name: "Ada".to_string(),
                last_name: "Lovelace".to_string(),
                period: Some(period),
                payment_method: Some("s_card".to_string()),
                ..Default::default()
            };
            form.amounts
                .insert(period.as_str().to_string(), amount.to_string());

            Self {
                form: Rc::new(form),
                view: Rc::new(RecordingView::new()),
                navigator: Rc::new(RecordingNavigator::new()),
                signup: Rc::new(MockSignupGateway::new()),
                payments: Rc::new(MockPaymentGateway::new().auto_ready()),
            }
        }

        fn flow(&self) -> JoinFlow {
            JoinFlow::new(
                JoinConfig::new("https://members.example.org"),
                self.form.clone(),
                self.view.clone(),
                self.navigator.clone(),
                self.signup.clone(),
                self.payments.clone(),
            )
        }
    }

    #[tokio::test]
    async fn test_step_one_refreshes_fee() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        let mut flow = fixture.flow();

        assert!(flow.handle_step(STEP_CONTRIBUTION).await.unwrap());
        let fee = fixture.view.last_fee().unwrap();
        assert_eq!(fee.fee_text, "0.40");
        assert!(fixture.signup.signup_calls().is_empty());
    }

    #[tokio::test]
    async fn test_step_one_without_payment_method_fails() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        let mut form = (*fixture.form).clone();
        form.payment_method = None;
        let fixture = Fixture {
            form: Rc::new(form),
            ..fixture
        };
        let mut flow = fixture.flow();

        assert!(matches!(
            flow.handle_step(STEP_CONTRIBUTION).await,
            Err(JoinError::InputIncomplete { .. })
        ));
    }

    #[tokio::test]
    async fn test_redirect_branch_navigates() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::redirect("https://pay.example.com/flow/1"));
        let mut flow = fixture.flow();

        assert!(!flow.handle_step(STEP_DETAILS).await.unwrap());
        assert_eq!(
            fixture.navigator.visited(),
            vec!["https://pay.example.com/flow/1".to_string()]
        );
        assert!(flow.payment_session().is_none());
        assert_eq!(fixture.signup.content_calls(), 0);
        assert!(fixture.payments.mount_calls().is_empty());
    }

    #[tokio::test]
    async fn test_setup_branch_mounts_widget() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        let mut flow = fixture.flow();

        assert!(flow.handle_step(STEP_DETAILS).await.unwrap());
        let mounts = fixture.payments.mount_calls();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].client_secret, "seti_1_secret_2");
        assert_eq!(mounts[0].public_key, "pk_test_mock");
        assert_eq!(mounts[0].appearance["rules"][".Input"]["boxShadow"], "none");
        assert!(flow.payment_session().unwrap().is_ready());
    }

    #[tokio::test]
    async fn test_confirm_requires_complete_widget() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        let mut flow = fixture.flow();
        flow.handle_step(STEP_DETAILS).await.unwrap();

        assert!(matches!(
            flow.handle_step(STEP_PAYMENT).await,
            Err(JoinError::WidgetIncomplete)
        ));
        assert!(fixture.payments.confirm_calls().is_empty());
        assert!(flow.payment_session().is_some());
    }

    #[tokio::test]
    async fn test_confirm_sends_billing_details_and_navigates() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        let mut flow = fixture.flow();
        flow.handle_step(STEP_DETAILS).await.unwrap();
        fixture.payments.widget_change(true, Default::default());

        assert!(!flow.handle_step(STEP_PAYMENT).await.unwrap());

        let confirms = fixture.payments.confirm_calls();
        assert_eq!(confirms.len(), 1);
        assert_eq!(confirms[0].params.billing_details.email, "ada@example.org");
        assert_eq!(confirms[0].params.billing_details.name, "Ada Lovelace");
        assert_eq!(
            confirms[0].params.return_url,
            "https://members.example.org/join/complete?firstName=Ada&lastName=Lovelace"
        );
        assert_eq!(fixture.navigator.visited(), vec![confirms[0].params.return_url.clone()]);
        assert!(flow.payment_session().is_none());
    }

    #[tokio::test]
    async fn test_rejected_confirmation_keeps_session() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        let mut flow = fixture.flow();
        flow.handle_step(STEP_DETAILS).await.unwrap();
        fixture.payments.widget_change(true, Default::default());
        fixture.payments.set_confirm_error(JoinError::ConfirmationRejected {
            message: "Your card was declined.".to_string(),
            code: Some("card_declined".to_string()),
        });

        assert!(matches!(
            flow.handle_step(STEP_PAYMENT).await,
            Err(JoinError::ConfirmationRejected { .. })
        ));
        assert!(flow.payment_session().is_some());
        assert!(fixture.navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_second_attempt_recreates_session() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        let mut flow = fixture.flow();
        flow.handle_step(STEP_DETAILS).await.unwrap();

        fixture
            .signup
            .set_response(SignupResponse::redirect("https://pay.example.com/flow/2"));
        assert!(!flow.handle_step(STEP_DETAILS).await.unwrap());
        assert!(flow.payment_session().is_none());

        assert!(matches!(
            flow.handle_step(STEP_PAYMENT).await,
            Err(JoinError::SessionAbsent)
        ));
    }

    #[tokio::test]
    async fn test_unusable_signup_response_is_rejected() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture.signup.set_response(SignupResponse::default());
        let mut flow = fixture.flow();

        assert!(matches!(
            flow.handle_step(STEP_DETAILS).await,
            Err(JoinError::GatewayRejected(_))
        ));
        assert!(fixture.navigator.visited().is_empty());
    }

    #[tokio::test]
    async fn test_failed_signup_leaves_no_session() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .fail_next(JoinError::GatewayRejected("email_taken: Already a member".to_string()));
        let mut flow = fixture.flow();

        assert!(matches!(
            flow.handle_step(STEP_DETAILS).await,
            Err(JoinError::GatewayRejected(_))
        ));
        assert_eq!(fixture.signup.signup_calls().len(), 1);
        assert_eq!(fixture.signup.content_calls(), 0);
        assert!(fixture.payments.mount_calls().is_empty());
        assert!(fixture.navigator.visited().is_empty());
        assert!(flow.payment_session().is_none());
    }

    #[tokio::test]
    async fn test_failed_mount_leaves_no_session() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture.signup.set_content(JoinContent {
            stripe_public_key: "pk_test_other".to_string(),
        });
        fixture.payments.fail_next_mount(JoinError::ProviderError {
            provider: "mock".to_string(),
            message: "setup intent already succeeded".to_string(),
        });
        let mut flow = fixture.flow();

        assert!(matches!(
            flow.handle_step(STEP_DETAILS).await,
            Err(JoinError::ProviderError { .. })
        ));
        let mounts = fixture.payments.mount_calls();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].public_key, "pk_test_other");
        assert!(fixture.navigator.visited().is_empty());
        assert!(flow.payment_session().is_none());
    }

    #[tokio::test]
    async fn test_confirm_follows_gateway_redirect() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        fixture
            .signup
            .set_response(SignupResponse::payment_setup("seti_1_secret_2"));
        fixture
            .payments
            .set_confirm_redirect("https://hooks.stripe.com/redirect/authenticate/src_1");
        let mut flow = fixture.flow();
        flow.handle_step(STEP_DETAILS).await.unwrap();
        fixture.payments.widget_change(true, Default::default());

        assert!(!flow.handle_step(STEP_PAYMENT).await.unwrap());
        assert_eq!(
            fixture.navigator.visited(),
            vec!["https://hooks.stripe.com/redirect/authenticate/src_1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_custom_fee_calculator() {
        let fixture = Fixture::new(ContributionPeriod::Monthly, "10");
        let flow = fixture
            .flow()
            .with_fee_calculator(Rc::new(|_: &Contribution, _: &str| 2.5));

        let fee = flow.refresh_fee().unwrap();
        assert_eq!(fee.fee_text, "2.50");
        assert_eq!(fixture.view.last_fee().unwrap(), fee);
    }

    #[tokio::test]
    async fn test_field_change_updates_amount_groups() {
        let fixture = Fixture::new(ContributionPeriod::Annually, "20");
        let mut flow = fixture.flow();

        flow.field_changed(STEP_CONTRIBUTION, FormField::Period);
        let groups = fixture.view.amount_groups();
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().any(|g| g.period == ContributionPeriod::Annually && g.visible));
        assert!(!fixture.view.last_fee().unwrap().visible);
    }
}
