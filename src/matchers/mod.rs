//! Argument matchers.
//!
//! Matcher constructors are written inline in the argument list of a captured
//! call: `m.greet(&eq("Alice".to_string()))`. Each constructor registers a
//! boxed matcher on the thread-local [capture channel](channel) in evaluation
//! order and returns a placeholder value so the surrounding call still
//! type-checks. The engine later consumes the registered matchers
//! positionally; argument positions without a matcher fall back to deep
//! equality against the literal value seen at the proxy.

use std::fmt::Debug;
use std::marker::PhantomData;
use std::sync::Arc;

use itertools::Itertools;
use regex::Regex;

use crate::context::ContextId;
use crate::mock::defaults::MockDefault;
use crate::values::ArgValue;

pub mod captor;
pub mod channel;

/// A predicate over one captured argument.
///
/// `on_selected` fires only after the *whole* rule or verification the
/// matcher belongs to has matched; captors hook it to record values without
/// capturing from rules that lost the selection.
pub trait ArgMatcher: Send + Sync {
    fn matches(&self, arg: &ArgValue) -> bool;
    fn describe(&self) -> String;
    fn on_selected(&self, _arg: &ArgValue, _ctx: Option<&ContextId>) {}
}

/// Positional matching with literal fallback: position `i` is checked by
/// matcher `i` when one was recorded, otherwise by deep equality against the
/// literal captured at stubbing time.
pub(crate) fn matches_with_fallback(
    matchers: &[Arc<dyn ArgMatcher>],
    fallback: &[ArgValue],
    args: &[ArgValue],
) -> bool {
    if fallback.len() != args.len() || matchers.len() > args.len() {
        return false;
    }
    args.iter().enumerate().all(|(i, arg)| match matchers.get(i) {
        Some(matcher) => matcher.matches(arg),
        None => fallback[i].deep_eq(arg),
    })
}

pub(crate) fn notify_selected(
    matchers: &[Arc<dyn ArgMatcher>],
    args: &[ArgValue],
    ctx: Option<&ContextId>,
) {
    for (matcher, arg) in matchers.iter().zip(args.iter()) {
        matcher.on_selected(arg, ctx);
    }
}

/// Render the expectation: matcher descriptions where present, literal
/// renderings elsewhere.
pub(crate) fn describe_positional(
    matchers: &[Arc<dyn ArgMatcher>],
    fallback: &[ArgValue],
) -> String {
    (0..fallback.len())
        .map(|i| match matchers.get(i) {
            Some(matcher) => matcher.describe(),
            None => fallback[i].rendered().to_owned(),
        })
        .join(", ")
}

struct EqMatcher<T> {
    expected: T,
}

impl<T> ArgMatcher for EqMatcher<T>
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    fn matches(&self, arg: &ArgValue) -> bool {
        arg.downcast_ref::<T>() == Some(&self.expected)
    }

    fn describe(&self) -> String {
        format!("eq({:?})", self.expected)
    }
}

struct AnyMatcher<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ArgMatcher for AnyMatcher<T> {
    fn matches(&self, arg: &ArgValue) -> bool {
        arg.downcast_ref::<T>().is_some()
    }

    fn describe(&self) -> String {
        format!("any::<{}>()", std::any::type_name::<T>())
    }
}

struct IsNullMatcher<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ArgMatcher for IsNullMatcher<T> {
    fn matches(&self, arg: &ArgValue) -> bool {
        matches!(arg.downcast_ref::<Option<T>>(), Some(None))
    }

    fn describe(&self) -> String {
        "is_null()".to_owned()
    }
}

struct NotNullMatcher<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> ArgMatcher for NotNullMatcher<T> {
    fn matches(&self, arg: &ArgValue) -> bool {
        matches!(arg.downcast_ref::<Option<T>>(), Some(Some(_)))
    }

    fn describe(&self) -> String {
        "not_null()".to_owned()
    }
}

enum StrOp {
    Contains,
    StartsWith,
    EndsWith,
}

struct StrMatcher {
    op: StrOp,
    pattern: String,
}

impl ArgMatcher for StrMatcher {
    fn matches(&self, arg: &ArgValue) -> bool {
        let Some(value) = arg.downcast_ref::<String>() else {
            return false;
        };
        match self.op {
            StrOp::Contains => value.contains(&self.pattern),
            StrOp::StartsWith => value.starts_with(&self.pattern),
            StrOp::EndsWith => value.ends_with(&self.pattern),
        }
    }

    fn describe(&self) -> String {
        let name = match self.op {
            StrOp::Contains => "contains",
            StrOp::StartsWith => "starts_with",
            StrOp::EndsWith => "ends_with",
        };
        format!("{}({:?})", name, self.pattern)
    }
}

struct RegexMatcher {
    pattern: String,
    compiled: Option<Regex>,
}

impl ArgMatcher for RegexMatcher {
    fn matches(&self, arg: &ArgValue) -> bool {
        match (&self.compiled, arg.downcast_ref::<String>()) {
            (Some(regex), Some(value)) => regex.is_match(value),
            _ => false,
        }
    }

    fn describe(&self) -> String {
        if self.compiled.is_some() {
            format!("regex({:?})", self.pattern)
        } else {
            format!("regex({:?} <invalid pattern>)", self.pattern)
        }
    }
}

enum OrdOp {
    Gt,
    Ge,
    Lt,
    Le,
}

struct OrdMatcher<T> {
    op: OrdOp,
    bound: T,
}

impl<T> ArgMatcher for OrdMatcher<T>
where
    T: PartialOrd + Debug + Send + Sync + 'static,
{
    fn matches(&self, arg: &ArgValue) -> bool {
        let Some(value) = arg.downcast_ref::<T>() else {
            return false;
        };
        match self.op {
            OrdOp::Gt => *value > self.bound,
            OrdOp::Ge => *value >= self.bound,
            OrdOp::Lt => *value < self.bound,
            OrdOp::Le => *value <= self.bound,
        }
    }

    fn describe(&self) -> String {
        let name = match self.op {
            OrdOp::Gt => "gt",
            OrdOp::Ge => "ge",
            OrdOp::Lt => "lt",
            OrdOp::Le => "le",
        };
        format!("{}({:?})", name, self.bound)
    }
}

struct RangeMatcher<T> {
    lo: T,
    hi: T,
}

impl<T> ArgMatcher for RangeMatcher<T>
where
    T: PartialOrd + Debug + Send + Sync + 'static,
{
    fn matches(&self, arg: &ArgValue) -> bool {
        arg.downcast_ref::<T>()
            .map_or(false, |value| *value >= self.lo && *value <= self.hi)
    }

    fn describe(&self) -> String {
        format!("range({:?}, {:?})", self.lo, self.hi)
    }
}

struct PredicateMatcher<T> {
    predicate: Box<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: 'static> ArgMatcher for PredicateMatcher<T> {
    fn matches(&self, arg: &ArgValue) -> bool {
        arg.downcast_ref::<T>().map_or(false, |v| (self.predicate)(v))
    }

    fn describe(&self) -> String {
        format!("predicate::<{}>(..)", std::any::type_name::<T>())
    }
}

/// Match by deep equality with `value`.
pub fn eq<T>(value: T) -> T
where
    T: Clone + PartialEq + Debug + Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(EqMatcher {
        expected: value.clone(),
    }));
    value
}

/// Match any value of type `T`.
pub fn any<T>() -> T
where
    T: MockDefault + Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(AnyMatcher::<T> {
        _marker: PhantomData,
    }));
    T::mock_default()
}

/// Match an `Option<T>` argument that is `None`.
pub fn is_null<T>() -> Option<T>
where
    T: Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(IsNullMatcher::<T> {
        _marker: PhantomData,
    }));
    None
}

/// Match an `Option<T>` argument that is `Some(_)`.
pub fn not_null<T>() -> Option<T>
where
    T: MockDefault + Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(NotNullMatcher::<T> {
        _marker: PhantomData,
    }));
    Some(T::mock_default())
}

/// Match a string argument containing `pattern`.
pub fn contains(pattern: impl Into<String>) -> String {
    let pattern = pattern.into();
    channel::register_matcher(Arc::new(StrMatcher {
        op: StrOp::Contains,
        pattern: pattern.clone(),
    }));
    pattern
}

/// Match a string argument starting with `pattern`.
pub fn starts_with(pattern: impl Into<String>) -> String {
    let pattern = pattern.into();
    channel::register_matcher(Arc::new(StrMatcher {
        op: StrOp::StartsWith,
        pattern: pattern.clone(),
    }));
    pattern
}

/// Match a string argument ending with `pattern`.
pub fn ends_with(pattern: impl Into<String>) -> String {
    let pattern = pattern.into();
    channel::register_matcher(Arc::new(StrMatcher {
        op: StrOp::EndsWith,
        pattern: pattern.clone(),
    }));
    pattern
}

/// Match a string argument against a regular expression. An invalid pattern
/// never matches; it is reported in the matcher's description.
pub fn regex(pattern: impl Into<String>) -> String {
    let pattern = pattern.into();
    let compiled = match Regex::new(&pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("regex matcher pattern {:?} failed to compile: {}", pattern, e);
            None
        }
    };
    channel::register_matcher(Arc::new(RegexMatcher {
        pattern: pattern.clone(),
        compiled,
    }));
    pattern
}

macro_rules! ord_matcher_fn {
    ($(#[$doc:meta])* $name:ident, $op:expr) => {
        $(#[$doc])*
        pub fn $name<T>(bound: T) -> T
        where
            T: Clone + PartialOrd + Debug + Send + Sync + 'static,
        {
            channel::register_matcher(Arc::new(OrdMatcher {
                op: $op,
                bound: bound.clone(),
            }));
            bound
        }
    };
}

ord_matcher_fn! {
    /// Match a value strictly greater than `bound`.
    gt, OrdOp::Gt
}
ord_matcher_fn! {
    /// Match a value greater than or equal to `bound`.
    ge, OrdOp::Ge
}
ord_matcher_fn! {
    /// Match a value strictly less than `bound`.
    lt, OrdOp::Lt
}
ord_matcher_fn! {
    /// Match a value less than or equal to `bound`.
    le, OrdOp::Le
}

/// Match a value in the inclusive range `[lo, hi]`.
pub fn range<T>(lo: T, hi: T) -> T
where
    T: Clone + PartialOrd + Debug + Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(RangeMatcher {
        lo: lo.clone(),
        hi,
    }));
    lo
}

/// Match with an arbitrary predicate over the typed argument.
pub fn predicate<T, F>(predicate: F) -> T
where
    T: MockDefault + Send + Sync + 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(PredicateMatcher::<T> {
        predicate: Box::new(predicate),
    }));
    T::mock_default()
}

/// Register a caller-supplied matcher for an argument of type `T`.
pub fn arg_that<T, M>(matcher: M) -> T
where
    T: MockDefault + Send + Sync + 'static,
    M: ArgMatcher + 'static,
{
    channel::register_matcher(Arc::new(matcher));
    T::mock_default()
}

/// Wildcard over any `Vec<T>` argument.
pub fn any_vec<T>() -> Vec<T>
where
    T: Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(AnyMatcher::<Vec<T>> {
        _marker: PhantomData,
    }));
    Vec::new()
}

/// Wildcard over any `HashMap<K, V>` argument.
pub fn any_map<K, V>() -> std::collections::HashMap<K, V>
where
    K: Eq + std::hash::Hash + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    channel::register_matcher(Arc::new(AnyMatcher::<std::collections::HashMap<K, V>> {
        _marker: PhantomData,
    }));
    std::collections::HashMap::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg<T: PartialEq + Debug + Send + Sync + 'static>(v: T) -> ArgValue {
        ArgValue::of(v)
    }

    #[test]
    fn eq_matcher_compares_by_value() {
        let m = EqMatcher {
            expected: "alpha".to_string(),
        };
        assert!(m.matches(&arg("alpha".to_string())));
        assert!(!m.matches(&arg("beta".to_string())));
        assert!(!m.matches(&arg(5u32)));
        assert_eq!(m.describe(), "eq(\"alpha\")");
    }

    #[test]
    fn any_matcher_is_type_checked() {
        let m = AnyMatcher::<u32> {
            _marker: PhantomData,
        };
        assert!(m.matches(&arg(17u32)));
        assert!(!m.matches(&arg("17".to_string())));
    }

    #[test]
    fn null_matchers_inspect_options() {
        let null = IsNullMatcher::<String> {
            _marker: PhantomData,
        };
        let some = NotNullMatcher::<String> {
            _marker: PhantomData,
        };
        assert!(null.matches(&arg(Option::<String>::None)));
        assert!(!null.matches(&arg(Some("x".to_string()))));
        assert!(some.matches(&arg(Some("x".to_string()))));
        assert!(!some.matches(&arg(Option::<String>::None)));
    }

    #[test]
    fn string_matchers() {
        let m = StrMatcher {
            op: StrOp::Contains,
            pattern: "ell".into(),
        };
        assert!(m.matches(&arg("hello".to_string())));
        assert!(!m.matches(&arg("halo".to_string())));

        let m = StrMatcher {
            op: StrOp::StartsWith,
            pattern: "he".into(),
        };
        assert!(m.matches(&arg("hello".to_string())));

        let m = StrMatcher {
            op: StrOp::EndsWith,
            pattern: "lo".into(),
        };
        assert!(m.matches(&arg("hello".to_string())));
    }

    #[test]
    fn regex_matcher_and_invalid_pattern() {
        let ok = RegexMatcher {
            pattern: "^h.*o$".into(),
            compiled: Regex::new("^h.*o$").ok(),
        };
        assert!(ok.matches(&arg("hello".to_string())));
        assert!(!ok.matches(&arg("oh hello there".to_string())));

        let bad = RegexMatcher {
            pattern: "(".into(),
            compiled: None,
        };
        assert!(!bad.matches(&arg("anything".to_string())));
        assert!(bad.describe().contains("invalid"));
    }

    #[test]
    fn ordering_and_range() {
        let m = OrdMatcher {
            op: OrdOp::Gt,
            bound: 10u64,
        };
        assert!(m.matches(&arg(11u64)));
        assert!(!m.matches(&arg(10u64)));

        let m = RangeMatcher { lo: 5u64, hi: 7u64 };
        assert!(m.matches(&arg(5u64)));
        assert!(m.matches(&arg(7u64)));
        assert!(!m.matches(&arg(8u64)));
    }

    #[test]
    fn predicate_matcher() {
        let m = PredicateMatcher::<String> {
            predicate: Box::new(|s| s.len() == 3),
        };
        assert!(m.matches(&arg("abc".to_string())));
        assert!(!m.matches(&arg("abcd".to_string())));
    }

    #[test]
    fn positional_fallback() {
        let matchers: Vec<Arc<dyn ArgMatcher>> = vec![Arc::new(AnyMatcher::<String> {
            _marker: PhantomData,
        })];
        let fallback = vec![arg("ignored".to_string()), arg(7u32)];

        assert!(matches_with_fallback(
            &matchers,
            &fallback,
            &[arg("whatever".to_string()), arg(7u32)],
        ));
        // Second position falls back to literal equality.
        assert!(!matches_with_fallback(
            &matchers,
            &fallback,
            &[arg("whatever".to_string()), arg(8u32)],
        ));
        // Arity mismatch never matches.
        assert!(!matches_with_fallback(
            &matchers,
            &fallback,
            &[arg("whatever".to_string())],
        ));
    }

    #[test]
    fn describe_mixes_matchers_and_literals() {
        let matchers: Vec<Arc<dyn ArgMatcher>> = vec![Arc::new(AnyMatcher::<String> {
            _marker: PhantomData,
        })];
        let fallback = vec![arg("ignored".to_string()), arg(7u32)];
        let described = describe_positional(&matchers, &fallback);
        assert!(described.starts_with("any::<"));
        assert!(described.ends_with(", 7"));
    }
}
