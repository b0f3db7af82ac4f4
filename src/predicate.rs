use std::{collections::HashMap, fmt, rc::Rc};

use tracing::instrument;

use crate::error::WatchError;

pub const NOT_EQUAL: &str = "not_equal";

/// # Documentation
/// Decides whether the `current` value counts as changed from the `reference` value.
/// `None` stands for a missing key on either side.
pub trait Predicate<V> {
    fn changed(&self, current: Option<&V>, reference: Option<&V>) -> bool;
}

impl<V, F> Predicate<V> for F
where
    F: Fn(Option<&V>, Option<&V>) -> bool,
{
    fn changed(&self, current: Option<&V>, reference: Option<&V>) -> bool {
        self(current, reference)
    }
}

/// # Documentation
/// The default predicate, `PartialEq` inequality without any coercion.
///
/// Rust values have no reference identity, so this is only as shallow as the value's `PartialEq`:
/// `Rc<T>` and `serde_json::Value` compare their contents, and a new but equal value is not a change.
/// Use `not_identical` to treat any new `Rc` allocation as a change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NotEqual;

impl<V: PartialEq> Predicate<V> for NotEqual {
    fn changed(&self, current: Option<&V>, reference: Option<&V>) -> bool {
        not_equal(current, reference)
    }
}

#[must_use]
pub fn not_equal<V: PartialEq>(current: Option<&V>, reference: Option<&V>) -> bool {
    current != reference
}

/// # Documentation
/// Reference inequality for shared values, a new allocation counts as a change even if its contents are equal
#[must_use]
pub fn not_identical<T: ?Sized>(current: Option<&Rc<T>>, reference: Option<&Rc<T>>) -> bool {
    match (current, reference) {
        (Some(current), Some(reference)) => !Rc::ptr_eq(current, reference),
        (None, None) => false,
        _ => true,
    }
}

/// # Documentation
/// A type-erased predicate which can be shared between the probes of an aggregate
pub struct SharedPredicate<V>(Rc<dyn Fn(Option<&V>, Option<&V>) -> bool>);

impl<V> SharedPredicate<V> {
    pub fn new<F: Fn(Option<&V>, Option<&V>) -> bool + 'static>(f: F) -> Self {
        Self(Rc::new(f))
    }
}

impl<V> Clone for SharedPredicate<V> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<V> fmt::Debug for SharedPredicate<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedPredicate")
    }
}

impl<V> Predicate<V> for SharedPredicate<V> {
    fn changed(&self, current: Option<&V>, reference: Option<&V>) -> bool {
        (self.0)(current, reference)
    }
}

/// # Documentation
/// Predicates which can be selected by name, used when probes are built from configuration.
/// `not_equal` is always registered.
pub struct PredicateRegistry<V> {
    predicates: HashMap<String, SharedPredicate<V>>,
}

impl<V: PartialEq + 'static> Default for PredicateRegistry<V> {
    fn default() -> Self {
        let mut registry = Self {
            predicates: HashMap::new(),
        };
        registry.register(NOT_EQUAL, not_equal::<V>);

        registry
    }
}

impl<V: PartialEq + 'static> PredicateRegistry<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<V> PredicateRegistry<V> {
    /// # Documentation
    /// Adds a predicate under `name`, replacing any predicate already registered with that name
    pub fn register<S, F>(&mut self, name: S, predicate: F) -> &mut Self
    where
        S: Into<String>,
        F: Fn(Option<&V>, Option<&V>) -> bool + 'static,
    {
        self.predicates.insert(name.into(), SharedPredicate::new(predicate));
        self
    }

    /// # Errors
    /// Returns an error if no predicate has been registered with `name`
    #[instrument(skip(self))]
    pub fn resolve(&self, name: &str) -> Result<SharedPredicate<V>, WatchError> {
        self.predicates
            .get(name)
            .cloned()
            .ok_or_else(|| WatchError::UnknownPredicate(name.to_string()))
    }

    /// Registered names, sorted
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names = self.predicates.keys().map(String::as_str).collect::<Vec<_>>();
        names.sort_unstable();

        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_equal_is_strict() {
        assert!(!not_equal(Some(&1), Some(&1)));
        assert!(not_equal(Some(&1), Some(&2)));
        assert!(not_equal(Some(&0), None));
        assert!(!not_equal::<i32>(None, None));
    }

    #[test]
    fn not_identical_compares_allocations() {
        let first = Rc::new(vec![1]);
        let same_contents = Rc::new(vec![1]);

        assert!(!not_identical(Some(&first), Some(&Rc::clone(&first))));
        assert!(not_identical(Some(&same_contents), Some(&first)));
        assert!(not_identical(None, Some(&first)));
    }

    #[test]
    fn closures_are_predicates() {
        let within_ten = |current: Option<&i32>, reference: Option<&i32>| match (current, reference) {
            (Some(current), Some(reference)) => (current - reference).abs() > 10,
            _ => true,
        };

        assert!(!within_ten.changed(Some(&5), Some(&0)));
        assert!(within_ten.changed(Some(&11), Some(&0)));
    }

    #[test]
    fn registry_resolves_registered_names() {
        let mut registry = PredicateRegistry::<i32>::new();
        registry.register("always", |_: Option<&i32>, _: Option<&i32>| true);

        assert_eq!(registry.names(), vec!["always", NOT_EQUAL]);
        assert!(registry.resolve("always").is_ok_and(|p| p.changed(Some(&1), Some(&1))));
        assert!(registry.resolve(NOT_EQUAL).is_ok_and(|p| !p.changed(Some(&1), Some(&1))));
        assert!(matches!(
            registry.resolve("deep_equal"),
            Err(WatchError::UnknownPredicate(name)) if name == "deep_equal"
        ));
    }
}
