//! Stubbing rules.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::context::{ContextId, StateValue};
use crate::invocation::MethodDescriptor;
use crate::matchers::{self, ArgMatcher};
use crate::registry::identity::MockId;
use crate::values::{ArgValue, ReturnValue, ThrownValue};

/// Guard over the `(mock, context)` state a rule requires before it can be
/// selected.
#[derive(Clone, Debug)]
pub enum StateGuard {
    /// Only matches while the state cell is unset.
    Unset,
    /// Only matches while the state cell holds exactly this value.
    Is(StateValue),
}

impl StateGuard {
    pub(crate) fn admits(&self, current: &Option<StateValue>) -> bool {
        match (self, current) {
            (StateGuard::Unset, None) => true,
            (StateGuard::Is(required), Some(current)) => required == current,
            _ => false,
        }
    }
}

/// Transition applied to the state cell when the rule services a call.
#[derive(Clone, Debug)]
pub enum StateTransition {
    /// Reset the cell to unset.
    Clear,
    /// Publish this value.
    To(StateValue),
}

impl StateTransition {
    pub(crate) fn target(&self) -> Option<StateValue> {
        match self {
            StateTransition::Clear => None,
            StateTransition::To(value) => Some(value.clone()),
        }
    }
}

/// Everything a dynamic answer gets to look at.
pub struct AnswerCall<'a> {
    pub context: &'a ContextId,
    pub mock: MockId,
    pub method: &'a MethodDescriptor,
    pub args: &'a [ArgValue],
}

/// What a dynamic answer produced: a value, or a payload to raise. Raised
/// payloads propagate verbatim, exactly like `then_throw` values.
pub enum AnswerResult {
    Value(ReturnValue),
    Raise(ThrownValue),
}

impl AnswerResult {
    pub fn value<T>(value: T) -> AnswerResult
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
    {
        AnswerResult::Value(ReturnValue::of(value))
    }

    pub fn raise<E>(error: E) -> AnswerResult
    where
        E: Clone + fmt::Debug + Send + Sync + 'static,
    {
        AnswerResult::Raise(ThrownValue::of(error))
    }
}

pub type AnswerFn = dyn Fn(AnswerCall<'_>) -> AnswerResult + Send + Sync;

/// The action a selected rule performs.
#[derive(Clone)]
pub enum RuleAction {
    Return(ReturnValue),
    Raise(ThrownValue),
    Answer(Arc<AnswerFn>),
    /// No explicit action: the call yields the return type's zero value.
    /// Used by rules installed purely for their state transition.
    Default,
}

impl fmt::Debug for RuleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleAction::Return(value) => write!(f, "return {:?}", value),
            RuleAction::Raise(value) => write!(f, "throw {:?}", value),
            RuleAction::Answer(_) => f.write_str("answer(..)"),
            RuleAction::Default => f.write_str("default"),
        }
    }
}

/// How a rule matches the arguments of a candidate call.
pub enum ArgMatching {
    /// Matches any argument list (and any arity).
    Wildcard,
    /// Deep equality per position, arity included.
    Literal(Vec<ArgValue>),
    /// Matchers consumed positionally; positions beyond the matcher list
    /// fall back to deep equality against the captured literals.
    WithMatchers {
        matchers: Vec<Arc<dyn ArgMatcher>>,
        fallback: Vec<ArgValue>,
    },
}

impl ArgMatching {
    pub(crate) fn admits(&self, args: &[ArgValue]) -> bool {
        match self {
            ArgMatching::Wildcard => true,
            ArgMatching::Literal(expected) => {
                expected.len() == args.len()
                    && expected.iter().zip(args.iter()).all(|(e, a)| e.deep_eq(a))
            }
            ArgMatching::WithMatchers { matchers, fallback } => {
                matchers::matches_with_fallback(matchers, fallback, args)
            }
        }
    }

    pub(crate) fn describe(&self) -> String {
        match self {
            ArgMatching::Wildcard => "<any arguments>".to_owned(),
            ArgMatching::Literal(expected) => {
                let rendered: Vec<&str> = expected.iter().map(|a| a.rendered()).collect();
                rendered.join(", ")
            }
            ArgMatching::WithMatchers { matchers, fallback } => {
                matchers::describe_positional(matchers, fallback)
            }
        }
    }
}

/// An immutable stubbing rule: "when called in state S with args matching
/// M, produce X, optionally transition to S'", plus an optional TTL.
pub struct StubbingRule {
    method: MethodDescriptor,
    matching: ArgMatching,
    action: RuleAction,
    required_state: Option<StateGuard>,
    next_state: Option<StateTransition>,
    ttl: Option<Duration>,
    created_at: Instant,
}

impl StubbingRule {
    pub(crate) fn new(
        method: MethodDescriptor,
        matching: ArgMatching,
        action: RuleAction,
        required_state: Option<StateGuard>,
        next_state: Option<StateTransition>,
        ttl: Option<Duration>,
    ) -> StubbingRule {
        StubbingRule {
            method,
            matching,
            action,
            required_state,
            next_state,
            ttl,
            created_at: Instant::now(),
        }
    }

    pub fn method(&self) -> &MethodDescriptor {
        &self.method
    }

    pub(crate) fn action(&self) -> &RuleAction {
        &self.action
    }

    pub(crate) fn next_state(&self) -> Option<&StateTransition> {
        self.next_state.as_ref()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// TTL elapsed at `now`. A rule without TTL never expires.
    pub fn expired(&self, now: Instant) -> bool {
        self.ttl
            .map_or(false, |ttl| now.duration_since(self.created_at) >= ttl)
    }

    /// Whether this rule admits a call with `args` while the slot state is
    /// `current`. Expiry is checked separately by the selection walk.
    pub(crate) fn admits(
        &self,
        method: &MethodDescriptor,
        args: &[ArgValue],
        current: &Option<StateValue>,
    ) -> bool {
        if self.method != *method {
            return false;
        }
        if let Some(guard) = &self.required_state {
            if !guard.admits(current) {
                return false;
            }
        }
        self.matching.admits(args)
    }

    /// Notify this rule's matchers that it was chosen to service `args`.
    pub(crate) fn notify_selected(&self, args: &[ArgValue], ctx: Option<&ContextId>) {
        if let ArgMatching::WithMatchers { matchers, .. } = &self.matching {
            matchers::notify_selected(matchers, args, ctx);
        }
    }

    pub(crate) fn describe_args(&self) -> String {
        self.matching.describe()
    }
}

impl fmt::Debug for StubbingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}) -> {:?}",
            self.method.name(),
            self.matching.describe(),
            self.action
        )?;
        if let Some(guard) = &self.required_state {
            write!(f, " requires {:?}", guard)?;
        }
        if let Some(next) = &self.next_state {
            write!(f, " then {:?}", next)?;
        }
        if let Some(ttl) = self.ttl {
            write!(f, " ttl={}ms", ttl.as_millis())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GREET: MethodDescriptor = MethodDescriptor::new("Greeter", "greet", &["String"]);
    const SAVE: MethodDescriptor = MethodDescriptor::new("Greeter", "save", &["String"]);

    fn literal_rule(expected: &str) -> StubbingRule {
        StubbingRule::new(
            GREET,
            ArgMatching::Literal(vec![ArgValue::of(expected.to_string())]),
            RuleAction::Return(ReturnValue::of("hi".to_string())),
            None,
            None,
            None,
        )
    }

    #[test]
    fn literal_matching_is_positional_deep_equality() {
        let rule = literal_rule("Alice");
        assert!(rule.admits(&GREET, &[ArgValue::of("Alice".to_string())], &None));
        assert!(!rule.admits(&GREET, &[ArgValue::of("Bob".to_string())], &None));
        assert!(!rule.admits(&SAVE, &[ArgValue::of("Alice".to_string())], &None));
        assert!(!rule.admits(&GREET, &[], &None));
    }

    #[test]
    fn state_guards() {
        let logged_in = StateValue::from("LOGGED_IN");
        let rule = StubbingRule::new(
            GREET,
            ArgMatching::Wildcard,
            RuleAction::Default,
            Some(StateGuard::Is(logged_in.clone())),
            None,
            None,
        );
        assert!(!rule.admits(&GREET, &[], &None));
        assert!(rule.admits(&GREET, &[], &Some(logged_in)));
        assert!(!rule.admits(&GREET, &[], &Some(StateValue::from("LOGGED_OUT"))));

        let unset_only = StubbingRule::new(
            GREET,
            ArgMatching::Wildcard,
            RuleAction::Default,
            Some(StateGuard::Unset),
            None,
            None,
        );
        assert!(unset_only.admits(&GREET, &[], &None));
        assert!(!unset_only.admits(&GREET, &[], &Some(StateValue::from("X"))));
    }

    #[test]
    fn ttl_expiry() {
        let rule = StubbingRule::new(
            GREET,
            ArgMatching::Wildcard,
            RuleAction::Default,
            None,
            None,
            Some(Duration::from_millis(50)),
        );
        let created = rule.created_at();
        assert!(!rule.expired(created));
        assert!(!rule.expired(created + Duration::from_millis(49)));
        assert!(rule.expired(created + Duration::from_millis(50)));

        let eternal = literal_rule("x");
        assert!(!eternal.expired(created + Duration::from_secs(3600)));
    }

    #[test]
    fn wildcard_admits_anything() {
        let rule = StubbingRule::new(
            GREET,
            ArgMatching::Wildcard,
            RuleAction::Default,
            None,
            None,
            None,
        );
        assert!(rule.admits(&GREET, &[], &None));
        assert!(rule.admits(&GREET, &[ArgValue::of(1u8)], &None));
    }
}
