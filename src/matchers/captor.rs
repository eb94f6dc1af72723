//! Argument captors.
//!
//! A captor is a matcher that always matches and, as a side effect, records
//! every value it was matched against — globally and keyed by context. The
//! captured values survive the verification they were registered in, so a
//! test can assert on the full sequence afterwards:
//!
//! ```ignore
//! let captor = Captor::<String>::for_type();
//! verify(&*mock)
//!     .for_context("ctx-f")
//!     .that(times(3), || mock.save(&captor.capture()))?;
//! assert_eq!(captor.all_values(), ["a", "b", "c"]);
//! ```

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};

use crate::context::ContextId;
use crate::matchers::{channel, ArgMatcher};
use crate::mock::defaults::MockDefault;
use crate::values::ArgValue;

struct CaptorState<T> {
    all: Mutex<Vec<T>>,
    by_context: Mutex<HashMap<ContextId, Vec<T>>>,
}

/// Records argument values seen during matching. Cheap to clone; clones
/// share the captured values.
pub struct Captor<T> {
    state: Arc<CaptorState<T>>,
}

impl<T> Clone for Captor<T> {
    fn clone(&self) -> Self {
        Captor {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T> Default for Captor<T> {
    fn default() -> Self {
        Self::for_type()
    }
}

impl<T> Captor<T> {
    /// Create a captor for arguments of type `T`.
    pub fn for_type() -> Captor<T> {
        Captor {
            state: Arc::new(CaptorState {
                all: Mutex::new(Vec::new()),
                by_context: Mutex::new(HashMap::new()),
            }),
        }
    }
}

impl<T> Captor<T>
where
    T: Clone + Debug + MockDefault + Send + Sync + 'static,
{
    /// Register this captor as the matcher for one argument position.
    /// Always matches; the seen value is recorded when the surrounding
    /// rule or verification selects.
    pub fn capture(&self) -> T {
        channel::register_matcher(Arc::new(CaptorMatcher {
            state: Arc::clone(&self.state),
        }));
        T::mock_default()
    }
}

impl<T: Clone> Captor<T> {
    /// The most recently captured value.
    pub fn value(&self) -> Option<T> {
        self.state.all.lock().unwrap().last().cloned()
    }

    /// Every captured value, oldest first.
    pub fn all_values(&self) -> Vec<T> {
        self.state.all.lock().unwrap().clone()
    }

    /// The most recently captured value under `ctx`.
    pub fn value_for_context(&self, ctx: impl Into<ContextId>) -> Option<T> {
        self.state
            .by_context
            .lock()
            .unwrap()
            .get(&ctx.into())
            .and_then(|values| values.last().cloned())
    }

    /// Every value captured under `ctx`, oldest first.
    pub fn all_values_for_context(&self, ctx: impl Into<ContextId>) -> Vec<T> {
        self.state
            .by_context
            .lock()
            .unwrap()
            .get(&ctx.into())
            .cloned()
            .unwrap_or_default()
    }

    /// Discard everything captured so far.
    pub fn reset(&self) {
        self.state.all.lock().unwrap().clear();
        self.state.by_context.lock().unwrap().clear();
    }
}

struct CaptorMatcher<T> {
    state: Arc<CaptorState<T>>,
}

impl<T> ArgMatcher for CaptorMatcher<T>
where
    T: Clone + Debug + Send + Sync + 'static,
{
    fn matches(&self, _arg: &ArgValue) -> bool {
        true
    }

    fn describe(&self) -> String {
        format!("capture::<{}>()", std::any::type_name::<T>())
    }

    fn on_selected(&self, arg: &ArgValue, ctx: Option<&ContextId>) {
        // A value of the wrong type is skipped, not an error.
        let Some(value) = arg.downcast_ref::<T>() else {
            debug!(
                "captor for {} skipped a {} argument",
                std::any::type_name::<T>(),
                arg.type_name()
            );
            return;
        };
        self.state.all.lock().unwrap().push(value.clone());
        if let Some(ctx) = ctx {
            self.state
                .by_context
                .lock()
                .unwrap()
                .entry(ctx.clone())
                .or_default()
                .push(value.clone());
        }
    }
}
