//! The verification initiator.
//!
//! `verify(&mock).for_context(ctx).that(times(1), || { mock.greet(&eq(..)); })`
//!
//! The closure is captured exactly like a stubbing: capture mode records the
//! `(method, args, matchers)` triple, the tentative setup record is removed,
//! and the `(mock, context)` log is counted against the requested mode on an
//! order-preserving snapshot. Matching records are marked verified on
//! success; counting itself never consults the flag, so repeating a
//! verification yields the same outcome.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use itertools::Itertools;

use crate::context::ContextId;
use crate::engine;
use crate::error::MockError;
use crate::invocation::InvocationRecord;
use crate::matchers::{self, channel};
use crate::matchers::channel::{Capture, CaptureKind};
use crate::mock::{Mock, MockRef};
use crate::verify::mode::VerificationMode;
use crate::verify::report::{tips_for, VerificationFailure};

pub mod mode;
pub mod report;

/// Entry point returned by [`crate::api::verify`].
pub struct VerificationInitiator<'a, M: Mock> {
    mock: &'a M,
}

impl<'a, M: Mock> VerificationInitiator<'a, M> {
    pub(crate) fn new(mock: &'a M) -> VerificationInitiator<'a, M> {
        VerificationInitiator { mock }
    }

    /// Choose the context whose log this verification reads.
    pub fn for_context(self, ctx: impl Into<ContextId>) -> ContextualVerification<'a, M> {
        ContextualVerification {
            mock: self.mock,
            ctx: ctx.into(),
        }
    }
}

/// A verification bound to a `(mock, context)` pair.
pub struct ContextualVerification<'a, M: Mock> {
    mock: &'a M,
    ctx: ContextId,
}

impl<'a, M: Mock> ContextualVerification<'a, M> {
    /// The two-step shape: fix the mode first, capture afterwards.
    /// `verify(&mock).for_context(ctx).with_mode(times(1)).when(|m| ..)`.
    pub fn with_mode(self, mode: VerificationMode) -> ModalVerification<'a, M> {
        ModalVerification { inner: self, mode }
    }

    /// Capture one call via the closure and check the observed count
    /// against `mode`.
    pub fn that(self, mode: VerificationMode, f: impl FnOnce(&M)) -> Result<(), MockError> {
        channel::begin(
            CaptureKind::Verification,
            self.mock.mock_ref().clone(),
            self.ctx.clone(),
        )?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self.mock)));
        if let Err(payload) = outcome {
            channel::abort();
            panic::resume_unwind(payload);
        }
        let capture = channel::end()?;
        for setup in &capture.setup {
            setup.slot.remove_record(&setup.record);
        }
        check_counts(self.mock.mock_ref(), &self.ctx, mode, &capture)
    }
}

/// A verification with its mode already chosen.
pub struct ModalVerification<'a, M: Mock> {
    inner: ContextualVerification<'a, M>,
    mode: VerificationMode,
}

impl<'a, M: Mock> ModalVerification<'a, M> {
    /// Capture the call to verify.
    pub fn when(self, f: impl FnOnce(&M)) -> Result<(), MockError> {
        self.inner.that(self.mode, f)
    }
}

fn context_log(mock: &MockRef, ctx: &ContextId) -> Vec<Arc<InvocationRecord>> {
    engine::global()
        .registry()
        .entry(mock)
        .and_then(|entry| entry.try_slot(ctx))
        .map(|slot| slot.visible_log())
        .unwrap_or_default()
}

fn check_counts(
    mock: &MockRef,
    ctx: &ContextId,
    mode: VerificationMode,
    capture: &Capture,
) -> Result<(), MockError> {
    let log = context_log(mock, ctx);

    let admits = |record: &&Arc<InvocationRecord>| -> bool {
        if record.method() != &capture.method {
            return false;
        }
        if capture.matchers.is_empty() {
            capture.args.len() == record.args().len()
                && capture
                    .args
                    .iter()
                    .zip(record.args().iter())
                    .all(|(expected, actual)| expected.deep_eq(actual))
        } else {
            matchers::matches_with_fallback(&capture.matchers, &capture.args, record.args())
        }
    };

    let matched: Vec<&Arc<InvocationRecord>> = log.iter().filter(admits).collect();
    let observed = matched.len();
    trace!(
        "verify: {} observed {} of {} record(s) in {:?}",
        capture.method,
        observed,
        log.len(),
        ctx
    );

    if mode.admits(observed) {
        for record in &matched {
            record.mark_verified();
            matchers::notify_selected(&capture.matchers, record.args(), Some(ctx));
        }
        return Ok(());
    }

    let expectation = if capture.matchers.is_empty() {
        capture.args.iter().map(|arg| arg.rendered()).join(", ")
    } else {
        matchers::describe_positional(&capture.matchers, &capture.args)
    };
    Err(MockError::verification(VerificationFailure::new(
        capture.method.owner().to_owned(),
        mock.id(),
        format!("{:?}", ctx),
        capture.method.to_string(),
        expectation,
        mode.to_string(),
        observed,
        &log,
        tips_for(mode.shape(observed)),
    )))
}

fn mock_name(log: &[Arc<InvocationRecord>]) -> String {
    log.first()
        .map(|record| record.method().owner().to_owned())
        .unwrap_or_else(|| "mock".to_owned())
}

/// Fail iff any invocation was recorded for `(mock, ctx)`.
pub(crate) fn no_interactions(mock: &MockRef, ctx: &ContextId) -> Result<(), MockError> {
    let log = context_log(mock, ctx);
    if log.is_empty() {
        return Ok(());
    }
    Err(MockError::verification(VerificationFailure::new(
        mock_name(&log),
        mock.id(),
        format!("{:?}", ctx),
        "<any method>".to_owned(),
        "<any arguments>".to_owned(),
        "no interactions".to_owned(),
        log.len(),
        &log,
        vec![
            "the log survives until the context is released or cleared; \
             reuse a fresh context per test case"
                .into(),
        ],
    )))
}

/// Fail iff any invocation recorded for `(mock, ctx)` is still unverified.
pub(crate) fn no_more_interactions(mock: &MockRef, ctx: &ContextId) -> Result<(), MockError> {
    let log = context_log(mock, ctx);
    let unverified = log.iter().filter(|record| !record.is_verified()).count();
    if unverified == 0 {
        return Ok(());
    }
    Err(MockError::verification(VerificationFailure::new(
        mock_name(&log),
        mock.id(),
        format!("{:?}", ctx),
        "<any method>".to_owned(),
        "<any arguments>".to_owned(),
        "no unverified interactions".to_owned(),
        unverified,
        &log,
        vec![
            "every expected call must be verified first; the listed \
             invocations were never matched by a verification"
                .into(),
        ],
    )))
}
