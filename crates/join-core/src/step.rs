//! # Step Orchestration
//!
//! Generic N-step state machine. Exactly one step is visible; a submit on
//! the visible step runs that step's handler and moves forward only when
//! the handler resolves `true`; a back click moves one step back without
//! running anything.
//!
//! ```text
//!            submit(i) ─► handler(i) ─┬─ Ok(true)  ─► Step[i+1]
//!   Step[i] ◄─────────────────────────┼─ Ok(false) ─► stay
//!      │                              └─ Err(e)    ─► stay
//!      └─ click(Back) ─► Step[i-1]
//! ```
//!
//! While a handler runs its submit control is busy and every other event
//! is ignored, which is what keeps a second submit from reaching the
//! handler before the first one settled.

use crate::display::{SubmitState, WizardView};
use crate::error::{JoinError, JoinResult};
use async_trait::async_trait;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use tracing::{debug, info, warn};

/// Visible-step bookkeeping. The index stays in `[0, count - 1]` and moves by one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepState {
    visible: usize,
    count: usize,
}

impl StepState {
    /// `count` steps starting on the first; at least one step always exists
    pub fn new(count: usize) -> Self {
        Self {
            visible: 0,
            count: count.max(1),
        }
    }

    pub fn visible(&self) -> usize {
        self.visible
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn is_first(&self) -> bool {
        self.visible == 0
    }

    pub fn is_last(&self) -> bool {
        self.visible + 1 == self.count
    }

    /// Move forward; `None` on the last step
    pub fn advance(&mut self) -> Option<usize> {
        if self.is_last() {
            return None;
        }
        self.visible += 1;
        Some(self.visible)
    }

    /// Move back; `None` on the first step
    pub fn retreat(&mut self) -> Option<usize> {
        if self.is_first() {
            return None;
        }
        self.visible -= 1;
        Some(self.visible)
    }
}

/// Form fields whose edits the wizard reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Period,
    Amount,
    CustomAmount,
    PaymentMethod,
    PayFee,
    Email,
    Name,
}

impl FormField {
    /// Edits that change the fee shown in step 1
    pub fn affects_fee(&self) -> bool {
        matches!(
            self,
            FormField::Period | FormField::Amount | FormField::CustomAmount | FormField::PaymentMethod
        )
    }
}

/// What was clicked inside a step container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// The explicitly marked back control
    Back,
    /// Anything else; never navigates
    Other,
}

/// UI events the wizard subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardEvent {
    /// The step's form was submitted
    Submit { step: usize },
    /// A click inside the step's container
    Click { step: usize, target: ClickTarget },
    /// An input or change event on a form field
    FieldChanged { step: usize, field: FormField },
}

/// Result of dispatching one event
#[derive(Debug)]
pub enum Transition {
    /// The handler resolved `true`; `to` is now visible
    Advanced { from: usize, to: usize },
    /// Back click; `to` is now visible
    Retreated { from: usize, to: usize },
    /// The handler resolved `false` (it navigated away or has nothing to show)
    Stayed { step: usize },
    /// The handler failed; the control is usable again for a manual retry
    Rejected { step: usize, error: JoinError },
    /// Presentational state was refreshed
    Updated,
    /// Not for the visible step, a busy step, or not an actionable target
    Ignored,
}

impl Transition {
    pub fn is_ignored(&self) -> bool {
        matches!(self, Transition::Ignored)
    }
}

/// Per-step behavior driven by the orchestrator
#[async_trait(?Send)]
pub trait StepHandler {
    /// Number of steps this handler drives
    fn step_count(&self) -> usize;

    /// Run the handler of `step`. `Ok(true)` advances the wizard.
    async fn handle_step(&mut self, step: usize) -> JoinResult<bool>;

    /// React to a field edit (presentational only)
    fn field_changed(&mut self, _step: usize, _field: FormField) {}

    /// Initial presentational refresh
    fn started(&mut self) {}
}

/// Drives a [`StepHandler`] from UI events.
///
/// `dispatch` takes `&self` so that events arriving while a handler is
/// suspended reach the busy guard instead of queueing behind it.
pub struct StepOrchestrator<H> {
    handler: RefCell<H>,
    view: Rc<dyn WizardView>,
    state: Cell<StepState>,
    busy: Cell<Option<usize>>,
}

impl<H: StepHandler> StepOrchestrator<H> {
    pub fn new(handler: H, view: Rc<dyn WizardView>) -> Self {
        let state = StepState::new(handler.step_count());
        Self {
            handler: RefCell::new(handler),
            view,
            state: Cell::new(state),
            busy: Cell::new(None),
        }
    }

    /// Show the first step, hide the rest and run the initial refresh
    pub fn start(&self) {
        let state = StepState::new(self.state.get().count());
        self.state.set(state);
        for step in 0..state.count() {
            self.view.set_step_visible(step, step == 0);
            self.view.set_submit_state(step, SubmitState::Idle);
        }
        self.handler.borrow_mut().started();
    }

    pub fn state(&self) -> StepState {
        self.state.get()
    }

    pub fn visible_step(&self) -> usize {
        self.state.get().visible()
    }

    /// The step whose handler is currently running, if any
    pub fn busy_step(&self) -> Option<usize> {
        self.busy.get()
    }

    /// Borrow the handler; panics if called while a handler is running
    pub fn handler(&self) -> std::cell::Ref<'_, H> {
        self.handler.borrow()
    }

    pub fn into_handler(self) -> H {
        self.handler.into_inner()
    }

    pub async fn dispatch(&self, event: WizardEvent) -> Transition {
        if self.busy.get().is_some() {
            debug!(?event, "Ignoring event while a step is busy");
            return Transition::Ignored;
        }

        match event {
            WizardEvent::Submit { step } => self.submit(step).await,
            WizardEvent::Click { step, target } => self.click(step, target),
            WizardEvent::FieldChanged { step, field } => {
                self.handler.borrow_mut().field_changed(step, field);
                Transition::Updated
            }
        }
    }

    /// Submit the visible step
    #[allow(clippy::await_holding_refcell_ref)]
    pub async fn submit(&self, step: usize) -> Transition {
        if step != self.visible_step() || self.busy.get().is_some() {
            return Transition::Ignored;
        }

        self.busy.set(Some(step));
        self.view.set_submit_state(step, SubmitState::Busy);

        // The busy flag keeps every other event away from the handler until it settles
        let result = {
            let mut handler = self.handler.borrow_mut();
            handler.handle_step(step).await
        };

        let transition = match result {
            Ok(true) => {
                let mut state = self.state.get();
                match state.advance() {
                    Some(to) => {
                        self.state.set(state);
                        self.view.set_step_visible(step, false);
                        self.view.set_step_visible(to, true);
                        info!(from = step, to, "Advanced to next step");
                        Transition::Advanced { from: step, to }
                    }
                    None => Transition::Stayed { step },
                }
            }
            Ok(false) => {
                debug!(step, "Step handler did not advance");
                Transition::Stayed { step }
            }
            Err(error) => {
                warn!(step, %error, "Step handler failed");
                Transition::Rejected { step, error }
            }
        };

        self.view.set_submit_state(step, SubmitState::Idle);
        self.busy.set(None);
        transition
    }

    fn click(&self, step: usize, target: ClickTarget) -> Transition {
        if target != ClickTarget::Back || step != self.visible_step() {
            return Transition::Ignored;
        }

        let mut state = self.state.get();
        match state.retreat() {
            Some(to) => {
                self.state.set(state);
                self.view.set_step_visible(step, false);
                self.view.set_step_visible(to, true);
                debug!(from = step, to, "Went back one step");
                Transition::Retreated { from: step, to }
            }
            None => Transition::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::RecordingView;

    #[derive(Clone, Copy)]
    enum Scripted {
        Advance,
        Stay,
        Fail,
    }

    /// Handler returning a scripted result per step and counting calls
    struct ScriptedHandler {
        results: Vec<Scripted>,
        calls: Rc<Cell<usize>>,
        yield_first: bool,
    }

    #[async_trait(?Send)]
    impl StepHandler for ScriptedHandler {
        fn step_count(&self) -> usize {
            self.results.len()
        }

        async fn handle_step(&mut self, step: usize) -> JoinResult<bool> {
            self.calls.set(self.calls.get() + 1);
            if self.yield_first {
                tokio::task::yield_now().await;
            }
            match self.results[step] {
                Scripted::Advance => Ok(true),
                Scripted::Stay => Ok(false),
                Scripted::Fail => Err(JoinError::NetworkError("offline".into())),
            }
        }
    }

    fn orchestrator(
        results: Vec<Scripted>,
        yield_first: bool,
    ) -> (StepOrchestrator<ScriptedHandler>, Rc<RecordingView>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let view = Rc::new(RecordingView::new());
        let handler = ScriptedHandler {
            results,
            calls: calls.clone(),
            yield_first,
        };
        let orchestrator = StepOrchestrator::new(handler, view.clone());
        orchestrator.start();
        (orchestrator, view, calls)
    }

    #[test]
    fn test_step_state_bounds() {
        let mut state = StepState::new(3);
        assert_eq!(state.retreat(), None);
        assert_eq!(state.advance(), Some(1));
        assert_eq!(state.advance(), Some(2));
        assert_eq!(state.advance(), None);
        assert_eq!(state.visible(), 2);
        assert_eq!(state.retreat(), Some(1));

        assert_eq!(StepState::new(0).count(), 1);
    }

    #[test]
    fn test_start_shows_only_first_step() {
        let (orchestrator, view, _) = orchestrator(vec![Scripted::Advance, Scripted::Advance], false);

        assert_eq!(orchestrator.visible_step(), 0);
        assert_eq!(view.visible_steps(), vec![0]);
    }

    #[tokio::test]
    async fn test_advance_only_on_true() {
        let (orchestrator, view, calls) =
            orchestrator(vec![Scripted::Advance, Scripted::Stay, Scripted::Advance], false);

        let t = orchestrator.dispatch(WizardEvent::Submit { step: 0 }).await;
        assert!(matches!(t, Transition::Advanced { from: 0, to: 1 }));
        assert_eq!(view.visible_steps(), vec![1]);

        let t = orchestrator.dispatch(WizardEvent::Submit { step: 1 }).await;
        assert!(matches!(t, Transition::Stayed { step: 1 }));
        assert_eq!(view.visible_steps(), vec![1]);
        assert_eq!(view.submit_state(1), Some(SubmitState::Idle));
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_rejection_restores_control() {
        let (orchestrator, view, _) = orchestrator(
            vec![Scripted::Fail, Scripted::Advance],
            false,
        );

        let t = orchestrator.dispatch(WizardEvent::Submit { step: 0 }).await;
        assert!(matches!(
            t,
            Transition::Rejected {
                step: 0,
                error: JoinError::NetworkError(_)
            }
        ));
        assert_eq!(orchestrator.visible_step(), 0);
        assert_eq!(
            view.submit_history(0),
            vec![SubmitState::Idle, SubmitState::Busy, SubmitState::Idle]
        );
    }

    #[tokio::test]
    async fn test_submit_for_hidden_step_is_ignored() {
        let (orchestrator, _, calls) = orchestrator(vec![Scripted::Advance, Scripted::Advance], false);

        let t = orchestrator.dispatch(WizardEvent::Submit { step: 1 }).await;
        assert!(t.is_ignored());
        assert_eq!(calls.get(), 0);
    }

    #[tokio::test]
    async fn test_busy_step_ignores_second_submit() {
        let (orchestrator, _, calls) = orchestrator(vec![Scripted::Advance, Scripted::Advance], true);

        let (first, second) = tokio::join!(
            orchestrator.dispatch(WizardEvent::Submit { step: 0 }),
            orchestrator.dispatch(WizardEvent::Submit { step: 0 }),
        );

        assert!(matches!(first, Transition::Advanced { from: 0, to: 1 }));
        assert!(second.is_ignored());
        assert_eq!(calls.get(), 1);
    }

    #[tokio::test]
    async fn test_back_requires_marker() {
        let (orchestrator, view, calls) =
            orchestrator(vec![Scripted::Advance, Scripted::Advance, Scripted::Advance], false);
        orchestrator.dispatch(WizardEvent::Submit { step: 0 }).await;
        orchestrator.dispatch(WizardEvent::Submit { step: 1 }).await;
        assert_eq!(orchestrator.visible_step(), 2);

        let t = orchestrator
            .dispatch(WizardEvent::Click {
                step: 2,
                target: ClickTarget::Other,
            })
            .await;
        assert!(t.is_ignored());

        let t = orchestrator
            .dispatch(WizardEvent::Click {
                step: 2,
                target: ClickTarget::Back,
            })
            .await;
        assert!(matches!(t, Transition::Retreated { from: 2, to: 1 }));
        assert_eq!(view.visible_steps(), vec![1]);
        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_back_on_first_step_is_ignored() {
        let (orchestrator, _, _) = orchestrator(vec![Scripted::Advance, Scripted::Advance], false);

        let t = orchestrator
            .dispatch(WizardEvent::Click {
                step: 0,
                target: ClickTarget::Back,
            })
            .await;
        assert!(t.is_ignored());
        assert_eq!(orchestrator.visible_step(), 0);
    }
}
