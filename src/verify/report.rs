//! Structured verification failure reports.

use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::invocation::InvocationRecord;
use crate::registry::identity::MockId;
use crate::verify::mode::FailureShape;

/// How many recent invocations a report embeds before truncating.
pub(crate) const RECENT_LIMIT: usize = 10;

/// One log entry rendered into a report.
#[derive(Clone, Debug)]
pub struct RecentInvocation {
    pub method: String,
    pub args: String,
    pub at_ms: u128,
    pub thread: String,
    pub verified: bool,
}

impl RecentInvocation {
    pub(crate) fn from_record(record: &Arc<InvocationRecord>) -> RecentInvocation {
        RecentInvocation {
            method: record.method().to_string(),
            args: record.render_args(),
            at_ms: record.since_start().as_millis(),
            thread: format!("{:?}", record.thread()),
            verified: record.is_verified(),
        }
    }
}

/// The diagnostic payload carried by a failed verification.
#[derive(Clone, Debug)]
pub struct VerificationFailure {
    /// The mock's type-qualified name, when derivable from the target
    /// method; otherwise "mock".
    pub mock: String,
    pub mock_id: MockId,
    /// `Debug` rendering of the verified context.
    pub context: String,
    /// The verified method, or a description for the interaction-wide
    /// checks.
    pub target: String,
    /// Expected arguments: matcher descriptions and literal renderings.
    pub expectation: String,
    /// The requested mode ("exactly 1 time(s)", "no interactions", ...).
    pub mode: String,
    pub observed: usize,
    /// Up to [`RECENT_LIMIT`] recent invocations in the context, oldest
    /// first.
    pub recent: Vec<RecentInvocation>,
    /// How many more the log held beyond `recent`.
    pub omitted: usize,
    pub tips: Vec<String>,
}

impl VerificationFailure {
    pub(crate) fn new(
        mock: String,
        mock_id: MockId,
        context: String,
        target: String,
        expectation: String,
        mode: String,
        observed: usize,
        log: &[Arc<InvocationRecord>],
        tips: Vec<String>,
    ) -> VerificationFailure {
        let omitted = log.len().saturating_sub(RECENT_LIMIT);
        let recent = log
            .iter()
            .skip(omitted)
            .map(RecentInvocation::from_record)
            .collect();
        VerificationFailure {
            mock,
            mock_id,
            context,
            target,
            expectation,
            mode,
            observed,
            recent,
            omitted,
            tips,
        }
    }
}

impl fmt::Display for VerificationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "verification failed for mock {} {} in context {}",
            self.mock, self.mock_id, self.context
        )?;
        writeln!(f, "  expected: {} [{}] {}", self.target, self.expectation, self.mode)?;
        writeln!(f, "  observed: {} matching invocation(s)", self.observed)?;
        if self.recent.is_empty() {
            writeln!(f, "  no invocations recorded in this context")?;
        } else {
            writeln!(f, "  recent invocations:")?;
            for (i, inv) in self.recent.iter().enumerate() {
                writeln!(
                    f,
                    "    {}. t+{}ms [{}] {}({}){}",
                    i + 1,
                    inv.at_ms,
                    inv.thread,
                    inv.method,
                    inv.args,
                    if inv.verified { " (verified)" } else { "" },
                )?;
            }
            if self.omitted > 0 {
                writeln!(f, "    ... and {} more", self.omitted)?;
            }
        }
        if !self.tips.is_empty() {
            writeln!(f, "  tips:")?;
            writeln!(f, "{}", self.tips.iter().map(|t| format!("    - {}", t)).join("\n"))?;
        }
        Ok(())
    }
}

/// Tips keyed by the shape of the count mismatch.
pub(crate) fn tips_for(shape: FailureShape) -> Vec<String> {
    match shape {
        FailureShape::NeverObserved => vec![
            "check that the expected context was current on the calling thread \
             (set_context / scoped_context)"
                .into(),
            "calls made while stubbing or verifying are setup calls and are \
             never counted"
                .into(),
            "argument matchers are positional; an unmatched position falls \
             back to exact equality"
                .into(),
        ],
        FailureShape::TooFew => vec![
            "other contexts may have received the remaining calls; each \
             context keeps its own log"
                .into(),
            "a context release purges its invocation log; verify before the \
             scope closes"
                .into(),
        ],
        FailureShape::TooMany => vec![
            "the same call may be reaching this context from several threads"
                .into(),
            "use at_most(..) or widen the expected count if the extra calls \
             are intended"
                .into(),
        ],
    }
}
