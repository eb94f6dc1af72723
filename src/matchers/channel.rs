//! The thread-local matcher capture channel.
//!
//! Stubbing and verification both drive the same protocol: the initiator
//! opens capture mode on the current thread, runs a caller-supplied closure
//! that performs one normal-looking method call on the mock, and closes
//! capture mode to collect the `(method, args, matchers)` triple. Matcher
//! constructors evaluated inside the closure's argument list register
//! themselves here in evaluation order; the invocation handler observes the
//! call and drains the buffer into the pending capture.
//!
//! The buffer must be empty again before control returns to user code;
//! leftover entries are reported as [`MockError::MatcherMisuse`] naming the
//! matchers that were never consumed.

use std::cell::RefCell;
use std::sync::Arc;

use itertools::Itertools;

use crate::context::ContextId;
use crate::error::MockError;
use crate::invocation::{InvocationRecord, MethodDescriptor};
use crate::matchers::ArgMatcher;
use crate::mock::MockRef;
use crate::registry::identity::MockId;
use crate::registry::slot::ContextSlot;
use crate::values::ArgValue;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum CaptureKind {
    Stubbing,
    Verification,
}

/// A tentative invocation record appended during capture mode, together
/// with the slot it was appended to. Removed when the capture finalizes.
pub(crate) struct SetupRecord {
    pub slot: Arc<ContextSlot>,
    pub record: Arc<InvocationRecord>,
}

/// The finished capture: one method call plus the matchers evaluated for it.
pub(crate) struct Capture {
    pub method: MethodDescriptor,
    pub args: Vec<ArgValue>,
    pub matchers: Vec<Arc<dyn ArgMatcher>>,
    pub setup: Vec<SetupRecord>,
}

#[derive(Clone)]
pub(crate) struct ActiveInfo {
    pub kind: CaptureKind,
    pub target: MockRef,
    pub ctx: ContextId,
}

struct PendingCall {
    mock: MockId,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
    matchers: Vec<Arc<dyn ArgMatcher>>,
}

struct ActiveCapture {
    kind: CaptureKind,
    target: MockRef,
    ctx: ContextId,
    buffer: Vec<Arc<dyn ArgMatcher>>,
    pending: Option<PendingCall>,
    extra_calls: usize,
    setup: Vec<SetupRecord>,
}

thread_local! {
    static ACTIVE: RefCell<Option<ActiveCapture>> = RefCell::new(None);
}

/// Open capture mode on this thread, targeted at `(target, ctx)`.
pub(crate) fn begin(
    kind: CaptureKind,
    target: MockRef,
    ctx: ContextId,
) -> Result<(), MockError> {
    ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        if active.is_some() {
            return Err(MockError::StubbingMisuse(
                "a stubbing or verification is already being captured on this thread; \
                 finish it before starting another"
                    .into(),
            ));
        }
        trace!("channel: begin {:?} capture for mock {}", kind, target.id());
        *active = Some(ActiveCapture {
            kind,
            target,
            ctx,
            buffer: Vec::new(),
            pending: None,
            extra_calls: 0,
            setup: Vec::new(),
        });
        Ok(())
    })
}

pub(crate) fn active_info() -> Option<ActiveInfo> {
    ACTIVE.with(|active| {
        active.borrow().as_ref().map(|capture| ActiveInfo {
            kind: capture.kind,
            target: capture.target.clone(),
            ctx: capture.ctx.clone(),
        })
    })
}

/// Append a matcher to this thread's buffer. Outside capture mode the
/// registration is dropped: the matcher expression then contributes only
/// its placeholder value and the call is matched literally.
pub fn register_matcher(matcher: Arc<dyn ArgMatcher>) {
    ACTIVE.with(|active| match active.borrow_mut().as_mut() {
        Some(capture) => capture.buffer.push(matcher),
        None => {
            debug!(
                "matcher {} evaluated outside capture mode; ignoring",
                matcher.describe()
            );
        }
    });
}

/// Descriptions of the matchers currently buffered, in evaluation order.
pub(crate) fn buffered_matcher_notes() -> Vec<String> {
    ACTIVE.with(|active| {
        active
            .borrow()
            .as_ref()
            .map(|capture| capture.buffer.iter().map(|m| m.describe()).collect())
            .unwrap_or_default()
    })
}

/// Called by the invocation handler when a mock call arrives in capture
/// mode: drains the matcher buffer into the pending capture and tracks the
/// tentative record for finalize-time removal.
pub(crate) fn observe_call(
    mock: MockId,
    method: MethodDescriptor,
    args: Vec<ArgValue>,
    record: Arc<InvocationRecord>,
    slot: Arc<ContextSlot>,
) {
    ACTIVE.with(|active| {
        let mut active = active.borrow_mut();
        let capture = active
            .as_mut()
            .expect("observe_call outside of capture mode");
        capture.setup.push(SetupRecord { slot, record });
        if capture.pending.is_some() {
            capture.extra_calls += 1;
            return;
        }
        let matchers = std::mem::take(&mut capture.buffer);
        capture.pending = Some(PendingCall {
            mock,
            method,
            args,
            matchers,
        });
    });
}

/// Tear capture mode down without a result, removing every tentative
/// record it appended. Used when the capture closure unwinds or when
/// validation fails.
pub(crate) fn abort() {
    let state = ACTIVE.with(|active| active.borrow_mut().take());
    if let Some(capture) = state {
        discard_setup(&capture.setup);
    }
}

/// Close capture mode and validate the capture.
pub(crate) fn end() -> Result<Capture, MockError> {
    let Some(capture) = ACTIVE.with(|active| active.borrow_mut().take()) else {
        return Err(MockError::StubbingMisuse(
            "capture mode was not active on this thread".into(),
        ));
    };
    let ActiveCapture {
        target,
        buffer,
        pending,
        extra_calls,
        setup,
        ..
    } = capture;

    let bail = |setup: &[SetupRecord], err: MockError| -> Result<Capture, MockError> {
        discard_setup(setup);
        Err(err)
    };

    if !buffer.is_empty() {
        let leftovers = buffer
            .iter()
            .enumerate()
            .map(|(i, m)| format!("#{} {}", i, m.describe()))
            .join(", ");
        return bail(
            &setup,
            MockError::MatcherMisuse(format!(
                "{} matcher(s) were recorded but never consumed by a mock call: {}",
                buffer.len(),
                leftovers
            )),
        );
    }
    if extra_calls > 0 {
        return bail(
            &setup,
            MockError::StubbingMisuse(format!(
                "expected exactly one mock invocation inside when(..), saw {}",
                extra_calls + 1
            )),
        );
    }
    let Some(pending) = pending else {
        return bail(
            &setup,
            MockError::StubbingMisuse(
                "the when(..) closure did not invoke any method on the mock".into(),
            ),
        );
    };
    if pending.mock != target.id() {
        return bail(
            &setup,
            MockError::StubbingMisuse(format!(
                "the call inside when(..) reached mock {} but mock {} was being set up",
                pending.mock,
                target.id()
            )),
        );
    }
    if pending.matchers.len() > pending.args.len() {
        return bail(
            &setup,
            MockError::StubbingMisuse(format!(
                "{} matcher(s) recorded for {} which takes {} argument(s)",
                pending.matchers.len(),
                pending.method,
                pending.args.len()
            )),
        );
    }

    Ok(Capture {
        method: pending.method,
        args: pending.args,
        matchers: pending.matchers,
        setup,
    })
}

fn discard_setup(setup: &[SetupRecord]) {
    for entry in setup {
        entry.slot.remove_record(&entry.record);
    }
}
