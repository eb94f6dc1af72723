//! ctxmock produces programmable test doubles ("mocks") whose behavior and
//! recorded interactions are partitioned by two independent axes: the mock
//! instance, and a caller-supplied *context identifier* (a tenant, a session,
//! a request, ...). Concurrent stubbing, invocation, and verification over a
//! shared mock, each acting on its own context, are isolated and free of
//! cross-thread interference.
//!
//! Logically, this crate includes these major parts:
//! * The [mock registry](registry::MockRegistry): the concurrent store that maps
//!   `(mock, context)` to ordered stubbing rules, per-context invocation logs, and
//!   per-context state, together with its cleanup engine.
//! * The [invocation handler](handler::dispatch): the engine invoked on every
//!   intercepted call. It resolves the current context, selects a matching rule
//!   (most recently installed first), applies state transitions atomically, records
//!   the invocation, and produces the call's outcome.
//! * [Stubbing](stubbing) and [verification](verify) initiators: the "capture a
//!   method call plus matchers, then act" protocol shared by `given(..).when(..)`
//!   and `verify(..).that(..)`.
//! * [Matchers](matchers) and [argument captors](matchers::captor::Captor): inline
//!   argument predicates communicated through a thread-local capture channel.
//! * Interfaces: the [`Mock`](mock::Mock) trait that an interception facility (or a
//!   hand-written double) implements, and [the safe free-function API](api)
//!   mirroring the fluent surface.
//!
//! Doubles delegate every intercepted call to [`handler::dispatch`]; everything
//! else in the crate is bookkeeping around that single entry point.

#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;

pub mod util;

pub mod api;
pub mod context;
mod engine;
pub mod error;
pub mod handler;
pub mod invocation;
pub mod matchers;
pub mod mock;
pub mod registry;
pub mod stubbing;
pub mod values;
pub mod verify;

#[cfg(test)]
mod tests;

pub use crate::api::*;
pub use crate::context::{ContextId, StateValue};
pub use crate::engine::MockEngine;
pub use crate::error::MockError;
pub use crate::invocation::MethodDescriptor;
pub use crate::matchers::captor::Captor;
pub use crate::mock::{Mock, MockDouble, MockRef, SpyDouble};
pub use crate::util::options::CleanupOptions;
pub use crate::verify::mode::{at_least, at_least_once, at_most, never, times};
