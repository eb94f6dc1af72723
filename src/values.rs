//! Dynamically typed argument, return, and thrown payloads.
//!
//! Doubles hand the engine their arguments as [`ArgValue`]s: an `Arc`-shared
//! snapshot of the value plus enough type information to deep-compare it
//! against stubbing literals and to render it in diagnostics. Return values
//! and thrown payloads follow the same shape. All three erase the concrete
//! type behind `dyn Any` and keep a monomorphized function pointer per
//! payload so equality and cloning stay exact without trait bounds leaking
//! into the registry.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

type Payload = dyn Any + Send + Sync;

/// One argument of an intercepted call, captured at the proxy boundary.
///
/// Equality is the value's own `PartialEq`, applied only when both sides
/// carry the same concrete type.
#[derive(Clone)]
pub struct ArgValue {
    payload: Arc<Payload>,
    type_name: &'static str,
    rendered: String,
    eq_fn: fn(&Payload, &Payload) -> bool,
}

impl ArgValue {
    /// Wrap a concrete argument value.
    pub fn of<T>(value: T) -> ArgValue
    where
        T: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        ArgValue {
            rendered: format!("{:?}", value),
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            eq_fn: |a, b| match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Deep equality against another captured argument. Differing concrete
    /// types compare unequal rather than panicking.
    pub fn deep_eq(&self, other: &ArgValue) -> bool {
        (self.eq_fn)(self.payload.as_ref(), other.payload.as_ref())
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The `Debug` rendering snapshotted at capture time.
    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Debug for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A stubbed return value. Extraction clones the stored value, so one rule
/// can serve any number of calls.
#[derive(Clone)]
pub struct ReturnValue {
    payload: Arc<Payload>,
    type_name: &'static str,
    rendered: String,
}

impl ReturnValue {
    pub fn of<T>(value: T) -> ReturnValue
    where
        T: Clone + fmt::Debug + Send + Sync + 'static,
    {
        ReturnValue {
            rendered: format!("{:?}", value),
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Clone the stored value out as `T`, or `None` if the stored type is
    /// not `T`.
    pub fn extract<T: Clone + 'static>(&self) -> Option<T> {
        self.payload.downcast_ref::<T>().cloned()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Debug for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// A payload installed by `then_throw` (or raised by a dynamic answer).
///
/// The engine never inspects or re-wraps it: on a `Result` surface it is
/// downcast to the error type, anywhere else it is re-raised verbatim as a
/// panic payload.
#[derive(Clone)]
pub struct ThrownValue {
    payload: Arc<Payload>,
    type_name: &'static str,
    rendered: String,
    clone_fn: fn(&Payload) -> Box<Payload>,
}

impl ThrownValue {
    pub fn of<E>(value: E) -> ThrownValue
    where
        E: Clone + fmt::Debug + Send + Sync + 'static,
    {
        ThrownValue {
            rendered: format!("{:?}", value),
            payload: Arc::new(value),
            type_name: std::any::type_name::<E>(),
            clone_fn: |p| Box::new(p.downcast_ref::<E>().unwrap().clone()),
        }
    }

    /// Clone the payload out as `E`, or `None` if it is not an `E`.
    pub fn extract<E: Clone + 'static>(&self) -> Option<E> {
        self.payload.downcast_ref::<E>().cloned()
    }

    /// The payload in the shape `std::panic::resume_unwind` expects.
    pub fn panic_payload(&self) -> Box<dyn Any + Send> {
        (self.clone_fn)(self.payload.as_ref())
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn rendered(&self) -> &str {
        &self.rendered
    }
}

impl fmt::Debug for ThrownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_eq_same_type() {
        let a = ArgValue::of("alpha".to_string());
        let b = ArgValue::of("alpha".to_string());
        let c = ArgValue::of("beta".to_string());
        assert!(a.deep_eq(&b));
        assert!(!a.deep_eq(&c));
    }

    #[test]
    fn deep_eq_type_mismatch_is_false() {
        let s = ArgValue::of("1".to_string());
        let n = ArgValue::of(1u64);
        assert!(!s.deep_eq(&n));
        assert!(!n.deep_eq(&s));
    }

    #[test]
    fn rendered_snapshot_survives_sharing() {
        let v = ArgValue::of(vec![1u8, 2, 3]);
        assert_eq!(v.rendered(), "[1, 2, 3]");
        assert_eq!(format!("{:?}", v), "[1, 2, 3]");
    }

    #[test]
    fn return_value_extracts_clones() {
        let rv = ReturnValue::of("payload".to_string());
        let first: Option<String> = rv.extract();
        let second: Option<String> = rv.extract();
        assert_eq!(first.as_deref(), Some("payload"));
        assert_eq!(second.as_deref(), Some("payload"));
        assert!(rv.extract::<u32>().is_none());
    }

    #[test]
    fn thrown_value_round_trips() {
        #[derive(Clone, Debug, PartialEq)]
        struct Boom(&'static str);

        let tv = ThrownValue::of(Boom("overflow"));
        assert_eq!(tv.extract::<Boom>(), Some(Boom("overflow")));
        let payload = tv.panic_payload();
        assert_eq!(payload.downcast_ref::<Boom>(), Some(&Boom("overflow")));
    }
}
