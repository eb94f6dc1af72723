//! Verification modes: predicates over observed invocation counts.

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum ModeKind {
    Exact(usize),
    AtLeast(usize),
    AtMost(usize),
}

/// How many matching invocations a verification expects.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct VerificationMode {
    kind: ModeKind,
}

/// The broad shape of a count mismatch, used to pick diagnostic tips.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum FailureShape {
    /// Nothing matched at all.
    NeverObserved,
    /// Fewer matches than required.
    TooFew,
    /// More matches than allowed.
    TooMany,
}

impl VerificationMode {
    pub(crate) fn admits(&self, observed: usize) -> bool {
        match self.kind {
            ModeKind::Exact(n) => observed == n,
            ModeKind::AtLeast(n) => observed >= n,
            ModeKind::AtMost(n) => observed <= n,
        }
    }

    /// Classify a failing count. Only meaningful when `admits` returned
    /// false.
    pub(crate) fn shape(&self, observed: usize) -> FailureShape {
        let too_few = match self.kind {
            ModeKind::Exact(n) => observed < n,
            ModeKind::AtLeast(n) => observed < n,
            ModeKind::AtMost(_) => false,
        };
        if too_few {
            if observed == 0 {
                FailureShape::NeverObserved
            } else {
                FailureShape::TooFew
            }
        } else {
            FailureShape::TooMany
        }
    }
}

impl fmt::Display for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ModeKind::Exact(0) => f.write_str("never"),
            ModeKind::Exact(n) => write!(f, "exactly {} time(s)", n),
            ModeKind::AtLeast(n) => write!(f, "at least {} time(s)", n),
            ModeKind::AtMost(n) => write!(f, "at most {} time(s)", n),
        }
    }
}

impl fmt::Debug for VerificationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Expect exactly `n` matching invocations.
pub fn times(n: usize) -> VerificationMode {
    VerificationMode {
        kind: ModeKind::Exact(n),
    }
}

/// Expect no matching invocation. Same as `times(0)`.
pub fn never() -> VerificationMode {
    times(0)
}

/// Expect `n` or more matching invocations.
pub fn at_least(n: usize) -> VerificationMode {
    VerificationMode {
        kind: ModeKind::AtLeast(n),
    }
}

/// Expect one or more matching invocations. Same as `at_least(1)`.
pub fn at_least_once() -> VerificationMode {
    at_least(1)
}

/// Expect `n` or fewer matching invocations.
pub fn at_most(n: usize) -> VerificationMode {
    VerificationMode {
        kind: ModeKind::AtMost(n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_counts() {
        assert!(times(2).admits(2));
        assert!(!times(2).admits(1));
        assert!(!times(2).admits(3));
        assert!(never().admits(0));
        assert!(!never().admits(1));
    }

    #[test]
    fn bounds() {
        assert!(at_least(2).admits(2));
        assert!(at_least(2).admits(5));
        assert!(!at_least(2).admits(1));
        assert!(at_least_once().admits(1));
        assert!(!at_least_once().admits(0));
        assert!(at_most(2).admits(0));
        assert!(at_most(2).admits(2));
        assert!(!at_most(2).admits(3));
    }

    #[test]
    fn shapes() {
        assert_eq!(times(2).shape(0), FailureShape::NeverObserved);
        assert_eq!(times(2).shape(1), FailureShape::TooFew);
        assert_eq!(times(2).shape(3), FailureShape::TooMany);
        assert_eq!(never().shape(1), FailureShape::TooMany);
        assert_eq!(at_least(3).shape(2), FailureShape::TooFew);
        assert_eq!(at_most(1).shape(2), FailureShape::TooMany);
    }

    #[test]
    fn descriptions() {
        assert_eq!(times(1).to_string(), "exactly 1 time(s)");
        assert_eq!(never().to_string(), "never");
        assert_eq!(at_least(2).to_string(), "at least 2 time(s)");
        assert_eq!(at_most(4).to_string(), "at most 4 time(s)");
    }
}
