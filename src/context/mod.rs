//! Context identifiers and opaque state values.
//!
//! A context identifier partitions everything the registry stores for a mock:
//! stubbing rules, invocation logs, and state. The library treats contexts as
//! opaque values with stable equality and hashing; any
//! `Eq + Hash + Debug + Send + Sync + 'static` type qualifies via the blanket
//! [`OpaqueValue`] impl, and strings work out of the box. Mutating a value
//! after it has been used as a key is a caller bug the library cannot detect.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use downcast_rs::{impl_downcast, DowncastSync};

pub mod scope;

/// Dynamic value equality and hashing over an erased type.
///
/// Implemented for every `Eq + Hash + Debug + Send + Sync + 'static` type
/// through the blanket impl below; user code does not implement this
/// directly.
pub trait OpaqueValue: DowncastSync + fmt::Debug {
    fn dyn_eq(&self, other: &dyn OpaqueValue) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}
impl_downcast!(sync OpaqueValue);

impl<T> OpaqueValue for T
where
    T: Any + Eq + Hash + fmt::Debug + Send + Sync,
{
    fn dyn_eq(&self, other: &dyn OpaqueValue) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .map_or(false, |other| self == other)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

macro_rules! opaque_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone)]
        pub struct $name(Arc<dyn OpaqueValue>);

        impl $name {
            pub fn new<T: OpaqueValue>(value: T) -> Self {
                $name(Arc::new(value))
            }

            pub fn downcast_ref<T: OpaqueValue>(&self) -> Option<&T> {
                self.0.as_any().downcast_ref::<T>()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.dyn_eq(other.0.as_ref())
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                // Two distinct types may hash their payloads identically;
                // the type id keeps them in separate buckets.
                self.0.as_any().type_id().hash(state);
                self.0.dyn_hash(state);
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name::new(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                $name::new(value)
            }
        }

        impl From<&$name> for $name {
            fn from(value: &$name) -> Self {
                value.clone()
            }
        }
    };
}

opaque_wrapper! {
    /// A caller-supplied context identifier. The shipped concrete
    /// implementation wraps a string (`ContextId::from("tenant-a")`); any
    /// opaque value type can be supplied instead.
    ContextId
}

opaque_wrapper! {
    /// An opaque per-`(mock, context)` state value, compared by value
    /// equality. The unset state is represented by the *absence* of a
    /// `StateValue`, not by a sentinel instance.
    StateValue
}
