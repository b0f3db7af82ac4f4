use std::{
    borrow::Borrow,
    cell::RefCell,
    collections::{BTreeMap, HashMap},
    hash::{BuildHasher, Hash},
    rc::Rc,
};

/// # Documentation
/// Keyed read access to a host object.
///
/// A probe only ever reads through this trait, it never iterates, writes or removes.
/// A missing key reads as `None`, which probes compare like any other value.
pub trait Properties<K: ?Sized> {
    type Value: Clone;

    fn property(&self, key: &K) -> Option<Self::Value>;
}

impl<Q, K, V, S> Properties<Q> for HashMap<K, V, S>
where
    Q: Hash + Eq + ?Sized,
    K: Hash + Eq + Borrow<Q>,
    V: Clone,
    S: BuildHasher,
{
    type Value = V;

    fn property(&self, key: &Q) -> Option<V> {
        self.get(key).cloned()
    }
}

impl<Q, K, V> Properties<Q> for BTreeMap<K, V>
where
    Q: Ord + ?Sized,
    K: Ord + Borrow<Q>,
    V: Clone,
{
    type Value = V;

    fn property(&self, key: &Q) -> Option<V> {
        self.get(key).cloned()
    }
}

impl<Q: AsRef<str> + ?Sized> Properties<Q> for serde_json::Map<String, serde_json::Value> {
    type Value = serde_json::Value;

    fn property(&self, key: &Q) -> Option<serde_json::Value> {
        self.get(key.as_ref()).cloned()
    }
}

// Anything other than a JSON object has no properties
impl<Q: AsRef<str> + ?Sized> Properties<Q> for serde_json::Value {
    type Value = Self;

    fn property(&self, key: &Q) -> Option<Self> {
        self.as_object().and_then(|map| map.get(key.as_ref())).cloned()
    }
}

impl<Q: AsRef<str> + ?Sized> Properties<Q> for toml::Table {
    type Value = toml::Value;

    fn property(&self, key: &Q) -> Option<toml::Value> {
        self.get(key.as_ref()).cloned()
    }
}

// Shared handles, so that a probe can read an object the caller keeps mutating

impl<K: ?Sized, T: Properties<K> + ?Sized> Properties<K> for &T {
    type Value = T::Value;

    fn property(&self, key: &K) -> Option<Self::Value> {
        (**self).property(key)
    }
}

impl<K: ?Sized, T: Properties<K> + ?Sized> Properties<K> for Rc<T> {
    type Value = T::Value;

    fn property(&self, key: &K) -> Option<Self::Value> {
        (**self).property(key)
    }
}

impl<K: ?Sized, T: Properties<K>> Properties<K> for RefCell<T> {
    type Value = T::Value;

    /// # Panics
    /// Panics if the object is mutably borrowed while being read
    fn property(&self, key: &K) -> Option<Self::Value> {
        self.borrow().property(key)
    }
}
