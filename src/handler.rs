//! The invocation handler: the engine behind every intercepted call.
//!
//! Selection walks the `(mock, context)` rule sequence from most recently
//! installed to least, skipping rules whose TTL elapsed (they are purged on
//! the way) and rules whose state guard does not admit the snapshotted
//! state. A selected transition is published with a compare-and-set against
//! the snapshot version; on contention the walk restarts from a fresh
//! snapshot, a bounded number of times, after which the latest state is
//! accepted and the transition published directly.

use std::sync::Arc;
use std::time::Instant;

use crate::context::scope;
use crate::engine;
use crate::error::MockError;
use crate::invocation::{InvocationRecord, MethodDescriptor};
use crate::matchers::channel;
use crate::mock::MockRef;
use crate::stubbing::rule::{AnswerCall, AnswerResult, RuleAction, StubbingRule};
use crate::values::{ArgValue, ReturnValue, ThrownValue};

/// Outcome of a dispatch, before the glue shapes it to the method's return
/// type.
pub enum Dispatched {
    /// A rule produced this value.
    Value(ReturnValue),
    /// A rule raised this payload; propagate it verbatim.
    Raised(ThrownValue),
    /// No rule matched. Plain mocks render this as the zero value; spies
    /// delegate to the real subject.
    Unstubbed,
    /// Produce the zero value unconditionally: the call happened in capture
    /// mode, or a matched rule carries no action. Spies must not delegate.
    Zero,
}

/// Retry bound for the state-cell compare-and-set. Past the bound the
/// handler accepts the latest snapshot and publishes the transition with a
/// plain store.
const MAX_CAS_RETRIES: usize = 8;

/// Handle one intercepted call on `mock`.
pub fn dispatch(
    mock: &MockRef,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
) -> Result<Dispatched, MockError> {
    let engine = engine::global();

    // Capture mode: no rule fires. The call is observed by the initiator
    // and logged tentatively against the capture's target context; the
    // initiator removes the record when it finalizes.
    if let Some(active) = channel::active_info() {
        trace!(
            "dispatch: {:?} capture observing {} on mock {} (target mock {}) for {:?}",
            active.kind,
            method,
            mock.id(),
            active.target.id(),
            active.ctx
        );
        let slot = engine.registry().slot(mock, &active.ctx);
        let notes = channel::buffered_matcher_notes();
        let record = Arc::new(InvocationRecord::new(
            mock.id(),
            method,
            args.clone(),
            active.ctx.clone(),
            engine.uptime(),
            notes,
            true,
        ));
        slot.append_record(Arc::clone(&record));
        channel::observe_call(mock.id(), method, args, record, slot);
        return Ok(Dispatched::Zero);
    }

    let ctx = scope::require_current()?;
    let slot = engine.registry().slot(mock, &ctx);
    scope::note_interaction(mock, &ctx);

    // Select under the current state snapshot; publish any transition
    // atomically against that snapshot.
    let now = Instant::now();
    let mut attempts = 0;
    let selected: Option<Arc<StubbingRule>> = loop {
        let snapshot = slot.state().snapshot();
        let candidate = slot.select_rule(&method, &args, &snapshot.value, now);
        let transition = candidate
            .as_ref()
            .and_then(|rule| rule.next_state().cloned());
        match transition {
            None => break candidate,
            Some(transition) => {
                if attempts >= MAX_CAS_RETRIES {
                    debug!(
                        "dispatch: state cell contended {} times, accepting latest state",
                        attempts
                    );
                    slot.state().force_set(transition.target());
                    break candidate;
                }
                if slot
                    .state()
                    .compare_and_set(snapshot.version, transition.target())
                {
                    trace!(
                        "dispatch: {} transitioned state of mock {} in {:?}",
                        method,
                        mock.id(),
                        ctx
                    );
                    break candidate;
                }
                attempts += 1;
            }
        }
    };

    #[cfg(feature = "extreme_assertions")]
    if let Some(rule) = &selected {
        assert!(
            !rule.expired(now),
            "selected a rule whose TTL had elapsed: {:?}",
            rule
        );
    }

    let record = Arc::new(InvocationRecord::new(
        mock.id(),
        method,
        args.clone(),
        ctx.clone(),
        engine.uptime(),
        Vec::new(),
        false,
    ));
    slot.append_record(record);

    let Some(rule) = selected else {
        trace!(
            "dispatch: no rule for {} on mock {} in {:?}",
            method,
            mock.id(),
            ctx
        );
        return Ok(Dispatched::Unstubbed);
    };

    rule.notify_selected(&args, Some(&ctx));
    match rule.action() {
        RuleAction::Return(value) => Ok(Dispatched::Value(value.clone())),
        RuleAction::Raise(thrown) => Ok(Dispatched::Raised(thrown.clone())),
        RuleAction::Answer(answer) => {
            let outcome = (answer.as_ref())(AnswerCall {
                context: &ctx,
                mock: mock.id(),
                method: &method,
                args: &args,
            });
            match outcome {
                AnswerResult::Value(value) => Ok(Dispatched::Value(value)),
                AnswerResult::Raise(thrown) => Ok(Dispatched::Raised(thrown)),
            }
        }
        RuleAction::Default => Ok(Dispatched::Zero),
    }
}
