//! The stubbing initiator.
//!
//! `given(&mock).for_context(ctx).when(|m| { m.greet(&eq(..)); }).then_return(..)`
//!
//! `when` opens capture mode on the current thread, runs the closure (which
//! performs one normal-looking call on the mock), and closes capture mode to
//! collect the `(method, args, matchers)` triple. Because the mock call runs
//! before the builder can mark it as setup, the handler logs it like any
//! other invocation; the terminal operation removes that tentative record
//! again when it installs the rule, so stubbing never inflates verification
//! counts.
//!
//! State modifiers may appear before or after `when`; the builder types
//! make "terminal without `when`" and "modifier after terminal"
//! unrepresentable.

use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::context::{ContextId, StateValue};
use crate::engine;
use crate::error::MockError;
use crate::matchers::channel::{self, Capture, CaptureKind};
use crate::mock::Mock;
use crate::values::{ReturnValue, ThrownValue};

pub mod rule;

use self::rule::{
    AnswerCall, AnswerResult, ArgMatching, RuleAction, StateGuard, StateTransition, StubbingRule,
};

/// Entry point returned by [`crate::api::given`].
pub struct StubbingInitiator<'a, M: Mock> {
    mock: &'a M,
}

impl<'a, M: Mock> StubbingInitiator<'a, M> {
    pub(crate) fn new(mock: &'a M) -> StubbingInitiator<'a, M> {
        StubbingInitiator { mock }
    }

    /// Choose the context this stubbing applies to.
    pub fn for_context(self, ctx: impl Into<ContextId>) -> ContextualStubbing<'a, M> {
        ContextualStubbing {
            mock: self.mock,
            ctx: ctx.into(),
            required_state: None,
            next_state: None,
            ttl: None,
        }
    }
}

/// A stubbing bound to a `(mock, context)` pair, collecting modifiers until
/// `when` captures the call.
pub struct ContextualStubbing<'a, M: Mock> {
    mock: &'a M,
    ctx: ContextId,
    required_state: Option<StateGuard>,
    next_state: Option<StateTransition>,
    ttl: Option<Duration>,
}

impl<'a, M: Mock> ContextualStubbing<'a, M> {
    /// Only select the rule while the `(mock, context)` state equals `state`.
    pub fn when_state_is(mut self, state: impl Into<StateValue>) -> Self {
        self.required_state = Some(StateGuard::Is(state.into()));
        self
    }

    /// Only select the rule while the `(mock, context)` state is unset.
    pub fn when_state_is_unset(mut self) -> Self {
        self.required_state = Some(StateGuard::Unset);
        self
    }

    /// Publish `state` when the rule services a call.
    pub fn will_set_state_to(mut self, state: impl Into<StateValue>) -> Self {
        self.next_state = Some(StateTransition::To(state.into()));
        self
    }

    /// Reset the state cell to unset when the rule services a call.
    pub fn will_clear_state(mut self) -> Self {
        self.next_state = Some(StateTransition::Clear);
        self
    }

    /// Expire the rule `millis` after installation. Zero means no TTL.
    pub fn ttl_ms(mut self, millis: u64) -> Self {
        self.ttl = (millis > 0).then(|| Duration::from_millis(millis));
        self
    }

    /// Capture the call to stub. The closure must invoke exactly one method
    /// on the mock being stubbed.
    pub fn when(self, f: impl FnOnce(&M)) -> Result<OngoingStubbing<'a, M>, MockError> {
        channel::begin(
            CaptureKind::Stubbing,
            self.mock.mock_ref().clone(),
            self.ctx.clone(),
        )?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self.mock)));
        if let Err(payload) = outcome {
            channel::abort();
            panic::resume_unwind(payload);
        }
        let capture = channel::end()?;
        Ok(OngoingStubbing {
            mock: self.mock,
            ctx: self.ctx,
            required_state: self.required_state,
            next_state: self.next_state,
            ttl: self.ttl,
            capture: Some(capture),
        })
    }
}

/// An open rule builder holding a captured call, waiting for its terminal
/// operation.
pub struct OngoingStubbing<'a, M: Mock> {
    mock: &'a M,
    ctx: ContextId,
    required_state: Option<StateGuard>,
    next_state: Option<StateTransition>,
    ttl: Option<Duration>,
    capture: Option<Capture>,
}

impl<'a, M: Mock> OngoingStubbing<'a, M> {
    pub fn when_state_is(mut self, state: impl Into<StateValue>) -> Self {
        self.required_state = Some(StateGuard::Is(state.into()));
        self
    }

    pub fn when_state_is_unset(mut self) -> Self {
        self.required_state = Some(StateGuard::Unset);
        self
    }

    pub fn will_set_state_to(mut self, state: impl Into<StateValue>) -> Self {
        self.next_state = Some(StateTransition::To(state.into()));
        self
    }

    pub fn will_clear_state(mut self) -> Self {
        self.next_state = Some(StateTransition::Clear);
        self
    }

    pub fn ttl_ms(mut self, millis: u64) -> Self {
        self.ttl = (millis > 0).then(|| Duration::from_millis(millis));
        self
    }

    /// Install "return this value".
    pub fn then_return<T>(self, value: T) -> Result<(), MockError>
    where
        T: Clone + Debug + Send + Sync + 'static,
    {
        self.finish(RuleAction::Return(ReturnValue::of(value)))
    }

    /// Install "raise this payload". The payload is propagated as-is when
    /// the rule fires; the library never re-wraps it.
    pub fn then_throw<E>(self, error: E) -> Result<(), MockError>
    where
        E: Clone + Debug + Send + Sync + 'static,
    {
        self.finish(RuleAction::Raise(ThrownValue::of(error)))
    }

    /// Install a dynamic answer computed from the live call.
    pub fn then_answer<F>(self, answer: F) -> Result<(), MockError>
    where
        F: Fn(AnswerCall<'_>) -> AnswerResult + Send + Sync + 'static,
    {
        self.finish(RuleAction::Answer(Arc::new(answer)))
    }

    /// Install the rule with no explicit action: matching calls yield the
    /// return type's zero value. Useful for rules that exist only for
    /// their state transition.
    pub fn then_default(self) -> Result<(), MockError> {
        self.finish(RuleAction::Default)
    }

    fn finish(mut self, action: RuleAction) -> Result<(), MockError> {
        let capture = self
            .capture
            .take()
            .expect("terminal operation ran twice on one stubbing");

        let matching = if capture.matchers.is_empty() {
            ArgMatching::Literal(capture.args)
        } else {
            ArgMatching::WithMatchers {
                matchers: capture.matchers,
                fallback: capture.args,
            }
        };
        let rule = Arc::new(StubbingRule::new(
            capture.method,
            matching,
            action,
            self.required_state.clone(),
            self.next_state.clone(),
            self.ttl,
        ));

        let slot = engine::global()
            .registry()
            .slot(self.mock.mock_ref(), &self.ctx);
        debug!(
            "stubbing: installing {:?} for mock {} in {:?}",
            rule,
            self.mock.mock_ref().id(),
            self.ctx
        );
        slot.append_rule(rule);

        // The setup invocation was logged by the handler; drop it now so it
        // never reaches a verification.
        for setup in &capture.setup {
            setup.slot.remove_record(&setup.record);
        }
        Ok(())
    }
}

impl<'a, M: Mock> Drop for OngoingStubbing<'a, M> {
    fn drop(&mut self) {
        // A stubbing abandoned without a terminal still has its tentative
        // setup records in the log; take them back out.
        if let Some(capture) = self.capture.take() {
            warn!(
                "stubbing for mock {} dropped without a terminal operation",
                self.mock.mock_ref().id()
            );
            for setup in &capture.setup {
                setup.slot.remove_record(&setup.record);
            }
        }
    }
}
