//! The interception collaborator contract.
//!
//! The engine never generates proxies. A mock object is any type that (1)
//! holds the [`MockRef`] the engine stamped onto it at creation and (2)
//! forwards every intercepted method to [`glue`] with a stable
//! [`MethodDescriptor`](crate::invocation::MethodDescriptor) and the argument
//! array. Code generators, macros, and hand-written doubles all satisfy the
//! contract the same way; `util::test_util::doubles` shows the hand-written
//! form.
//!
//! Identity methods (`PartialEq`, `Hash`) of the double must not be routed
//! through the engine: registry keys compare mocks by reference identity.

use std::sync::Weak;

use atomic::{Atomic, Ordering};

use crate::registry::identity::{IdentityKey, MockId, Referent};

pub mod defaults;
pub mod glue;

/// Whether unstubbed calls fall through to a real object.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MockKind {
    Mock,
    Spy,
}

static NEXT_MOCK_ID: Atomic<u64> = Atomic::new(1);

pub(crate) fn next_id() -> MockId {
    MockId::from_raw(NEXT_MOCK_ID.fetch_add(1, Ordering::Relaxed))
}

/// The engine-assigned identity a mock carries: a stable monotonic id plus
/// a weak back-reference to the mock object itself. Cloning is cheap; all
/// clones denote the same mock.
#[derive(Clone)]
pub struct MockRef {
    id: MockId,
    referent: Weak<Referent>,
    kind: MockKind,
}

impl MockRef {
    pub(crate) fn new(id: MockId, referent: Weak<Referent>, kind: MockKind) -> MockRef {
        MockRef { id, referent, kind }
    }

    pub fn id(&self) -> MockId {
        self.id
    }

    pub fn kind(&self) -> MockKind {
        self.kind
    }

    pub(crate) fn identity_key(&self) -> IdentityKey {
        IdentityKey::new(self.id, self.referent.clone())
    }

    #[cfg(test)]
    pub(crate) fn for_tests(referent: Weak<Referent>, kind: MockKind) -> MockRef {
        MockRef::new(next_id(), referent, kind)
    }
}

impl std::fmt::Debug for MockRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "MockRef({}, {:?})", self.id, self.kind)
    }
}

/// Implemented by every mock object: hands the engine the identity stamped
/// at creation.
pub trait Mock: std::any::Any + Send + Sync {
    fn mock_ref(&self) -> &MockRef;
}

/// A double that can be constructed by [`crate::api::mock`].
pub trait MockDouble: Mock + Sized {
    fn with_ref(mock_ref: MockRef) -> Self;
}

/// A double that wraps a real subject and delegates unstubbed calls to it.
/// Constructed by [`crate::api::spy`].
pub trait SpyDouble: Mock + Sized {
    type Subject;

    fn with_parts(mock_ref: MockRef, subject: Self::Subject) -> Self;
}
