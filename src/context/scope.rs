//! Per-thread context scope.
//!
//! Each thread owns a stack of context frames. `set_context` pushes a frame,
//! `clear_context` pops the whole stack, and `scoped_context` returns a guard
//! whose release restores the previous top. Inner frames fully shadow outer
//! frames; nesting is unlimited.
//!
//! Releasing a frame (guard drop or `clear_context`) purges the invocation
//! log of the released context on every mock this thread interacted with
//! under it. This is a deliberate leak-prevention policy, not incidental
//! cleanup: contexts are routinely reused across test cases and must not
//! accumulate stale interaction history.
//!
//! Thread-locals do not cross `std::thread` boundaries. A spawned worker's
//! initial frame adopts the parent context explicitly:
//!
//! ```ignore
//! let ctx = current_context().unwrap();
//! std::thread::spawn(move || {
//!     let _scope = scoped_context(ctx);
//!     // ...
//! });
//! ```
//!
//! Submitting work to a pool never carries the scope implicitly.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::context::ContextId;
use crate::engine;
use crate::error::MockError;
use crate::mock::MockRef;

thread_local! {
    static STACK: RefCell<Vec<ContextId>> = RefCell::new(Vec::new());
    // Mocks this thread has dispatched on, keyed by the context that was
    // current at the time. Drives the release purge.
    static TOUCHED: RefCell<HashMap<ContextId, Vec<MockRef>>> =
        RefCell::new(HashMap::new());
}

/// Push `ctx` as the current context of this thread.
pub fn set_context(ctx: impl Into<ContextId>) {
    let ctx = ctx.into();
    trace!("scope: set {:?}", ctx);
    STACK.with(|stack| stack.borrow_mut().push(ctx));
}

/// Pop every frame of this thread's context stack, purging the interaction
/// history of each released context.
pub fn clear_context() {
    let released = STACK.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    trace!("scope: clear ({} frames)", released.len());
    for ctx in released {
        purge_released(&ctx);
    }
}

/// The current top of this thread's context stack.
pub fn current_context() -> Option<ContextId> {
    STACK.with(|stack| stack.borrow().last().cloned())
}

pub(crate) fn require_current() -> Result<ContextId, MockError> {
    current_context().ok_or(MockError::NoContext)
}

/// Enter `ctx` for the lifetime of the returned guard. Dropping the guard
/// restores the prior top exactly.
#[must_use = "the context is released as soon as the guard is dropped"]
pub fn scoped_context(ctx: impl Into<ContextId>) -> ContextScope {
    let ctx = ctx.into();
    set_context(ctx.clone());
    ContextScope { ctx }
}

/// Guard returned by [`scoped_context`].
pub struct ContextScope {
    ctx: ContextId,
}

impl ContextScope {
    /// The context this guard holds open.
    pub fn context(&self) -> &ContextId {
        &self.ctx
    }
}

impl Drop for ContextScope {
    fn drop(&mut self) {
        let popped = STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            match stack.last() {
                Some(top) if *top == self.ctx => {
                    stack.pop();
                    true
                }
                _ => false,
            }
        });
        if popped {
            purge_released(&self.ctx);
        } else {
            // clear_context already tore the stack down under us.
            warn!("scope: guard for {:?} released out of order", self.ctx);
        }
    }
}

/// Record that `mock` was dispatched on under `ctx` by this thread.
pub(crate) fn note_interaction(mock: &MockRef, ctx: &ContextId) {
    TOUCHED.with(|touched| {
        let mut touched = touched.borrow_mut();
        let mocks = touched.entry(ctx.clone()).or_default();
        if !mocks.iter().any(|m| m.id() == mock.id()) {
            mocks.push(mock.clone());
        }
    });
}

fn purge_released(ctx: &ContextId) {
    // A context can appear in multiple frames; purge only once the last
    // frame holding it is gone.
    let still_active = STACK.with(|stack| stack.borrow().iter().any(|c| c == ctx));
    if still_active {
        return;
    }
    let mocks = TOUCHED.with(|touched| touched.borrow_mut().remove(ctx));
    if let Some(mocks) = mocks {
        debug!("scope: purging {:?} across {} mock(s)", ctx, mocks.len());
        for mock in mocks {
            engine::global().purge_invocations(&mock, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear() {
        clear_context();
        assert!(current_context().is_none());
        set_context("ctx-a");
        assert_eq!(current_context(), Some(ContextId::from("ctx-a")));
        clear_context();
        assert!(current_context().is_none());
    }

    #[test]
    fn require_current_reports_no_context() {
        clear_context();
        assert!(matches!(require_current(), Err(MockError::NoContext)));
    }

    #[test]
    fn scopes_nest_and_restore() {
        clear_context();
        set_context("outer");
        {
            let _inner = scoped_context("inner");
            assert_eq!(current_context(), Some(ContextId::from("inner")));
            {
                let _innermost = scoped_context("innermost");
                assert_eq!(current_context(), Some(ContextId::from("innermost")));
            }
            assert_eq!(current_context(), Some(ContextId::from("inner")));
        }
        assert_eq!(current_context(), Some(ContextId::from("outer")));
        clear_context();
    }

    #[test]
    fn scope_inside_cleared_stack_is_harmless() {
        clear_context();
        let scope = scoped_context("doomed");
        clear_context();
        drop(scope);
        assert!(current_context().is_none());
    }
}
