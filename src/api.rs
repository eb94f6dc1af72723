//! Safe free-function API over the engine.
//!
//! This module mirrors the fluent surface as plain functions: mock and spy
//! creation, the stubbing and verification entry points, the per-thread
//! context operations, and registry administration. It is the whole public
//! entry surface; the fluent builders it returns drive the engine through
//! the same internals the doubles use.

use std::sync::{Arc, Weak};

use crate::context::ContextId;
use crate::engine;
use crate::error::MockError;
use crate::mock::{Mock, MockDouble, MockKind, SpyDouble};
use crate::registry::identity::Referent;
use crate::stubbing::StubbingInitiator;
use crate::util::options::CleanupOptions;
use crate::verify::VerificationInitiator;

pub use crate::context::scope::{
    clear_context, current_context, scoped_context, set_context, ContextScope,
};
pub use crate::registry::stats::{CleanupStats, MemoryUsage};

/// Create a mock double of type `M`. The engine stamps an identity onto the
/// double and registers it; unstubbed calls return zero values.
pub fn mock<M: MockDouble>() -> Arc<M> {
    Arc::new_cyclic(|weak: &Weak<M>| {
        let referent: Weak<Referent> = weak.clone();
        M::with_ref(engine::global().register_mock(referent, MockKind::Mock))
    })
}

/// Create a spy double of type `M` wrapping `subject`. Unstubbed calls
/// delegate to the subject; everything else behaves like a mock.
pub fn spy<M: SpyDouble>(subject: M::Subject) -> Arc<M> {
    Arc::new_cyclic(|weak: &Weak<M>| {
        let referent: Weak<Referent> = weak.clone();
        M::with_parts(
            engine::global().register_mock(referent, MockKind::Spy),
            subject,
        )
    })
}

/// Begin stubbing `mock`:
/// `given(&*mock).for_context("ctx").when(|m| { m.greet(&eq(..)); }).then_return(..)`.
pub fn given<M: Mock>(mock: &M) -> StubbingInitiator<'_, M> {
    StubbingInitiator::new(mock)
}

/// Begin verifying `mock`:
/// `verify(&*mock).for_context("ctx").that(times(1), |m| { m.greet(..); })`.
pub fn verify<M: Mock>(mock: &M) -> VerificationInitiator<'_, M> {
    VerificationInitiator::new(mock)
}

/// Fail iff any invocation was recorded for `(mock, ctx)`.
pub fn verify_no_interactions<M: Mock>(
    mock: &M,
    ctx: impl Into<ContextId>,
) -> Result<(), MockError> {
    crate::verify::no_interactions(mock.mock_ref(), &ctx.into())
}

/// Fail iff `(mock, ctx)` holds an invocation no verification has matched.
pub fn verify_no_more_interactions<M: Mock>(
    mock: &M,
    ctx: impl Into<ContextId>,
) -> Result<(), MockError> {
    crate::verify::no_more_interactions(mock.mock_ref(), &ctx.into())
}

/// Replace the cleanup configuration. Takes effect immediately; the
/// background thread is bounced or stopped to match.
pub fn set_cleanup_config(options: CleanupOptions) {
    engine::global().set_cleanup_config(options);
}

/// The current cleanup configuration.
pub fn get_cleanup_config() -> CleanupOptions {
    engine::global().cleanup_config()
}

/// Point-in-time registry size.
pub fn memory_usage() -> MemoryUsage {
    engine::global().memory_usage()
}

/// Run one cleanup pass synchronously.
pub fn perform_cleanup() -> CleanupStats {
    engine::global().perform_cleanup()
}

/// Start the background cleanup thread. Returns false if it was already
/// running.
pub fn enable_auto_cleanup() -> bool {
    engine::global().enable_auto_cleanup()
}

/// Stop the background cleanup thread. Returns false if it was not running.
pub fn disable_auto_cleanup() -> bool {
    engine::global().disable_auto_cleanup()
}

/// Drop every rule, record, and state cell of `mock`. Returns whether the
/// registry held anything for it.
pub fn clear_mock<M: Mock>(mock: &M) -> bool {
    engine::global().registry().clear_mock(mock.mock_ref())
}

/// Drop everything the registry holds, for every mock.
pub fn clear_all() {
    engine::global().registry().clear_all();
}
