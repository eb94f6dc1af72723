//! Identity keys for the registry indexes.
//!
//! A mock is represented in the registry by its runtime identity, not by
//! `Eq`: the engine stamps a monotonic [`MockId`] onto every mock at
//! creation and keeps a weak back-reference to the mock object. The key
//! never owns the mock, so registry entries cannot keep a reclaimed mock
//! alive; once the referent is gone the key stops comparing equal to
//! anything and the entry becomes unreachable, waiting for the sweep.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

/// Engine-assigned stable identity of a mock instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MockId(u64);

impl MockId {
    pub(crate) fn from_raw(raw: u64) -> MockId {
        MockId(raw)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Debug for MockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MockId({})", self.0)
    }
}

/// The erased mock object the registry refers back to.
pub type Referent = dyn Any + Send + Sync;

/// Registry map key for one mock instance.
///
/// Equality holds iff both keys carry the same id *and* both referents are
/// still alive; the hash is the referent's identity hash captured at
/// construction, so it stays stable after reclamation.
#[derive(Clone)]
pub struct IdentityKey {
    id: MockId,
    referent: Weak<Referent>,
    identity_hash: u64,
}

impl IdentityKey {
    pub(crate) fn new(id: MockId, referent: Weak<Referent>) -> IdentityKey {
        let identity_hash = referent.as_ptr() as *const () as usize as u64;
        IdentityKey {
            id,
            referent,
            identity_hash,
        }
    }

    pub fn id(&self) -> MockId {
        self.id
    }

    /// The mock object, or `None` once it has been reclaimed.
    pub fn referent(&self) -> Option<Arc<Referent>> {
        self.referent.upgrade()
    }

    pub fn is_live(&self) -> bool {
        self.referent.strong_count() > 0
    }
}

impl PartialEq for IdentityKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.is_live() && other.is_live()
    }
}

impl Eq for IdentityKey {}

impl Hash for IdentityKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity_hash.hash(state);
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IdentityKey({}, {})",
            self.id,
            if self.is_live() { "live" } else { "reclaimed" }
        )
    }
}
