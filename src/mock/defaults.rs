//! Canonical zero values for unstubbed calls.
//!
//! When no rule matches, and while a stubbing or verification capture is in
//! flight, a double returns the zero value of its return type: `false`,
//! numeric zero, `'\0'`, the empty string, an empty collection or map, `None`,
//! an array of zeros. [`MockDefault`] defines that value per type;
//! [`cached`] serves repeated lookups from a process-wide cache keyed by
//! `TypeId`.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet, LinkedList, VecDeque};
use std::hash::Hash;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// The canonical zero value of a type, as returned by an unstubbed mock
/// method.
pub trait MockDefault: Sized {
    fn mock_default() -> Self;
}

macro_rules! zero_default {
    ($($ty:ty => $value:expr),* $(,)?) => {
        $(
            impl MockDefault for $ty {
                fn mock_default() -> Self {
                    $value
                }
            }
        )*
    };
}

zero_default! {
    () => (),
    bool => false,
    char => '\0',
    u8 => 0, u16 => 0, u32 => 0, u64 => 0, u128 => 0, usize => 0,
    i8 => 0, i16 => 0, i32 => 0, i64 => 0, i128 => 0, isize => 0,
    f32 => 0.0, f64 => 0.0,
    String => String::new(),
    &'static str => "",
    Duration => Duration::ZERO,
}

impl<T> MockDefault for Option<T> {
    fn mock_default() -> Self {
        None
    }
}

impl<T> MockDefault for Vec<T> {
    fn mock_default() -> Self {
        Vec::new()
    }
}

impl<T> MockDefault for VecDeque<T> {
    fn mock_default() -> Self {
        VecDeque::new()
    }
}

impl<T> MockDefault for LinkedList<T> {
    fn mock_default() -> Self {
        LinkedList::new()
    }
}

impl<T: Ord> MockDefault for BinaryHeap<T> {
    fn mock_default() -> Self {
        BinaryHeap::new()
    }
}

impl<K: Eq + Hash, V> MockDefault for HashMap<K, V> {
    fn mock_default() -> Self {
        HashMap::new()
    }
}

impl<K: Ord, V> MockDefault for BTreeMap<K, V> {
    fn mock_default() -> Self {
        BTreeMap::new()
    }
}

impl<T: Eq + Hash> MockDefault for HashSet<T> {
    fn mock_default() -> Self {
        HashSet::new()
    }
}

impl<T: Ord> MockDefault for BTreeSet<T> {
    fn mock_default() -> Self {
        BTreeSet::new()
    }
}

impl<T: MockDefault, const N: usize> MockDefault for [T; N] {
    fn mock_default() -> Self {
        std::array::from_fn(|_| T::mock_default())
    }
}

impl<T: MockDefault> MockDefault for Box<T> {
    fn mock_default() -> Self {
        Box::new(T::mock_default())
    }
}

impl<T: MockDefault> MockDefault for Arc<T> {
    fn mock_default() -> Self {
        Arc::new(T::mock_default())
    }
}

impl MockDefault for Cow<'static, str> {
    fn mock_default() -> Self {
        Cow::Borrowed("")
    }
}

lazy_static! {
    // Fast path for repeated unstubbed calls: one constructed zero value per
    // observed return type, cloned out on each hit.
    static ref CACHE: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>> =
        RwLock::new(HashMap::new());
}

/// The zero value for `T`, served from the per-type cache.
pub fn cached<T>() -> T
where
    T: MockDefault + Clone + Send + Sync + 'static,
{
    let key = TypeId::of::<T>();
    {
        let cache = CACHE.read().unwrap();
        if let Some(hit) = cache.get(&key) {
            if let Some(value) = hit.downcast_ref::<T>() {
                return value.clone();
            }
        }
    }
    let value = T::mock_default();
    CACHE
        .write()
        .unwrap()
        .insert(key, Arc::new(value.clone()));
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_zeroes() {
        assert!(!bool::mock_default());
        assert_eq!(u64::mock_default(), 0);
        assert_eq!(i32::mock_default(), 0);
        assert_eq!(char::mock_default(), '\0');
        assert_eq!(String::mock_default(), "");
        assert_eq!(<&'static str>::mock_default(), "");
    }

    #[test]
    fn container_zeroes_are_empty() {
        assert!(Vec::<u8>::mock_default().is_empty());
        assert!(HashMap::<String, u8>::mock_default().is_empty());
        assert!(VecDeque::<u8>::mock_default().is_empty());
        assert_eq!(Option::<String>::mock_default(), None);
        assert_eq!(<[u32; 4]>::mock_default(), [0, 0, 0, 0]);
    }

    #[test]
    fn cache_round_trips() {
        let first: Vec<u64> = cached();
        let second: Vec<u64> = cached();
        assert_eq!(first, second);
        let s: String = cached();
        assert_eq!(s, "");
    }
}
