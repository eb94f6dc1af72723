//! Library error taxonomy.
//!
//! These are *library* errors, raised synchronously at the misuse site. Values
//! installed with `then_throw` and panics escaping a dynamic answer are user
//! payloads: they propagate verbatim and never appear here.

use thiserror::Error;

use crate::verify::report::VerificationFailure;

#[derive(Debug, Error)]
pub enum MockError {
    /// A structurally invalid input: an out-of-range cleanup option, an
    /// unknown option key, a stubbed value whose type cannot serve the
    /// method's return type.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A mock method was invoked outside capture mode with no context set
    /// on the calling thread.
    #[error(
        "no context is active on this thread; call set_context(..) or open \
         scoped_context(..) before invoking the mock"
    )]
    NoContext,

    /// The stubbing or verification protocol was driven out of order: no
    /// mock invocation inside `when`, more than one invocation, a captured
    /// call on a different mock than the one being stubbed, or more
    /// matchers than the method has arguments.
    #[error("stubbing misuse: {0}")]
    StubbingMisuse(String),

    /// The thread-local matcher buffer was left in a bad state, e.g.
    /// matchers that were recorded but never consumed by a mock call.
    #[error("matcher misuse: {0}")]
    MatcherMisuse(String),

    /// An observed invocation count disagrees with the requested
    /// verification mode. Carries the full diagnostic report.
    #[error("{0}")]
    VerificationFailed(Box<VerificationFailure>),
}

impl MockError {
    pub(crate) fn verification(failure: VerificationFailure) -> MockError {
        MockError::VerificationFailed(Box::new(failure))
    }

    /// The structured report, when this is a verification failure.
    pub fn verification_report(&self) -> Option<&VerificationFailure> {
        match self {
            MockError::VerificationFailed(report) => Some(report),
            _ => None,
        }
    }
}
