use std::fmt;

use tracing::{debug, instrument, trace};

use crate::{
    config::ProbeOptions,
    error::WatchError,
    predicate::{NotEqual, Predicate, PredicateRegistry, SharedPredicate},
    properties::Properties,
};

/// # Documentation
/// What a probe does with its reference value after it reports a change
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Retention {
    /// Move the reference to the value which was just reported, so each change is reported once
    #[default]
    Advance,
    /// Keep comparing against the value seen at construction
    RetainInitial,
}

impl Retention {
    #[must_use]
    pub const fn retains_initial(self) -> bool {
        matches!(self, Self::RetainInitial)
    }
}

impl From<bool> for Retention {
    fn from(retain_initial: bool) -> Self {
        if retain_initial { Self::RetainInitial } else { Self::Advance }
    }
}

/// # Documentation
/// The pair of values which made a probe report a change
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change<V> {
    pub previous: Option<V>,
    pub current: Option<V>,
}

/// # Documentation
/// Reports whether the value at `key` on `source` has changed since the last poll.
///
/// The reference value is seeded when the probe is built. It only moves after a poll which
/// reports a change, and never when the probe was built with `Retention::RetainInitial`.
pub struct Probe<O, K, P = NotEqual>
where
    O: Properties<K>,
{
    source: O,
    key: K,
    predicate: P,
    retention: Retention,
    reference: Option<O::Value>,
}

impl<O, K> Probe<O, K, NotEqual>
where
    O: Properties<K>,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
{
    /// # Documentation
    /// Watch `key` using strict inequality, reporting each change once
    #[must_use]
    pub fn new(source: O, key: K) -> Self {
        Self::with_predicate(source, key, NotEqual, Retention::Advance)
    }

    /// # Documentation
    /// Watch `key` using strict inequality with the given retention.
    /// Passing `true` keeps the initial value as the reference forever.
    #[must_use]
    pub fn retaining<R: Into<Retention>>(source: O, key: K, retention: R) -> Self {
        Self::with_predicate(source, key, NotEqual, retention)
    }
}

impl<O, K> Probe<O, K, SharedPredicate<O::Value>>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
{
    /// # Errors
    /// Returns `WatchError::InvalidArgument` if the options name a predicate which isn't in `registry`
    pub fn from_options(
        source: O,
        key: K,
        options: &ProbeOptions,
        registry: &PredicateRegistry<O::Value>,
    ) -> Result<Self, WatchError> {
        let predicate = options.predicate(registry)?;

        Ok(Self::with_predicate(source, key, predicate, options.retention()))
    }
}

impl<O, K, P> Probe<O, K, P>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    P: Predicate<O::Value>,
{
    #[must_use]
    #[instrument(skip(source, predicate, retention))]
    pub fn with_predicate<R: Into<Retention>>(source: O, key: K, predicate: P, retention: R) -> Self {
        let reference = source.property(&key);
        trace!("Probe seeded with {reference:?}");

        Self {
            source,
            key,
            predicate,
            retention: retention.into(),
            reference,
        }
    }

    /// # Documentation
    /// Read the current value and compare it with the reference, `true` means changed
    pub fn changed(&mut self) -> bool {
        self.poll().is_some()
    }

    /// # Documentation
    /// Same as `changed()` but returns the values which were compared when a change is reported
    pub fn poll(&mut self) -> Option<Change<O::Value>> {
        let current = self.source.property(&self.key);
        let changed = self.predicate.changed(current.as_ref(), self.reference.as_ref());

        trace!(key = ?self.key, changed, "Probe polled");

        if !changed {
            return None;
        }

        let previous = if self.retention.retains_initial() {
            self.reference.clone()
        } else {
            let previous = std::mem::replace(&mut self.reference, current.clone());
            debug!(key = ?self.key, "Reference advanced: {previous:?} -> {current:?}");

            previous
        };

        Some(Change { previous, current })
    }
}

impl<O, K, P> Probe<O, K, P>
where
    O: Properties<K>,
{
    #[must_use]
    pub const fn key(&self) -> &K {
        &self.key
    }

    #[must_use]
    pub const fn retention(&self) -> Retention {
        self.retention
    }

    /// The value the next poll will be compared against
    #[must_use]
    pub const fn reference(&self) -> Option<&O::Value> {
        self.reference.as_ref()
    }
}

impl<O, K, P> fmt::Debug for Probe<O, K, P>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Probe")
            .field("key", &self.key)
            .field("retention", &self.retention)
            .field("reference", &self.reference)
            .finish_non_exhaustive()
    }
}

/// # Documentation
/// Shorthand for `Probe::new`
#[must_use]
pub fn watch<O, K>(source: O, key: K) -> Probe<O, K>
where
    O: Properties<K>,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
{
    Probe::new(source, key)
}

/// # Documentation
/// Shorthand for `Probe::retaining`
#[must_use]
pub fn watch_retaining<O, K, R>(source: O, key: K, retention: R) -> Probe<O, K>
where
    O: Properties<K>,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
    R: Into<Retention>,
{
    Probe::retaining(source, key, retention)
}

/// # Documentation
/// Shorthand for `Probe::with_predicate`
#[must_use]
pub fn watch_with<O, K, P, R>(source: O, key: K, predicate: P, retention: R) -> Probe<O, K, P>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    P: Predicate<O::Value>,
    R: Into<Retention>,
{
    Probe::with_predicate(source, key, predicate, retention)
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, collections::HashMap, rc::Rc};

    use serde_json::{Map, Value, json};

    use super::*;

    fn object(value: Value) -> Rc<RefCell<Map<String, Value>>> {
        match value {
            Value::Object(map) => Rc::new(RefCell::new(map)),
            other => panic!("Not an object: {other}"),
        }
    }

    fn set(object: &Rc<RefCell<Map<String, Value>>>, key: &str, value: Value) {
        object.borrow_mut().insert(key.to_string(), value);
    }

    #[test]
    fn reports_each_change_once() {
        let obj = object(json!({ "num": 0, "str": "Hello", "bool": false }));

        let mut num_changed = watch(Rc::clone(&obj), "num");
        let mut str_changed = watch(Rc::clone(&obj), "str");
        let mut bool_changed = watch(Rc::clone(&obj), "bool");

        assert!(!num_changed.changed(), "A fresh probe should not report a change");
        set(&obj, "num", json!(1));
        assert!(num_changed.changed());
        assert!(!num_changed.changed(), "Should have re-baselined to 1");

        assert!(!str_changed.changed());
        set(&obj, "str", json!("hello"));
        assert!(str_changed.changed());
        assert!(!str_changed.changed());

        assert!(!bool_changed.changed());
        set(&obj, "bool", json!(true));
        assert!(bool_changed.changed());
        assert!(!bool_changed.changed());
    }

    #[test]
    fn retaining_reports_until_value_returns() {
        let obj = object(json!({ "pressed": false }));
        let mut pressed_changed = watch_retaining(Rc::clone(&obj), "pressed", true);

        assert!(!pressed_changed.changed());
        set(&obj, "pressed", json!(true));
        assert!(pressed_changed.changed());
        assert!(pressed_changed.changed(), "Should continue to report the value as changed");
        assert!(pressed_changed.changed());
        set(&obj, "pressed", json!(false));
        assert!(!pressed_changed.changed(), "Returned to the initial value");

        assert_eq!(pressed_changed.reference(), Some(&json!(false)));
    }

    #[test]
    fn retaining_ignores_intermediate_values() {
        let obj = object(json!({ "num": 0 }));
        let mut num_changed = watch_retaining(Rc::clone(&obj), "num", Retention::RetainInitial);

        set(&obj, "num", json!(1));
        assert!(num_changed.changed());
        set(&obj, "num", json!(2));
        assert!(num_changed.changed());
        set(&obj, "num", json!(0));
        assert!(!num_changed.changed());
    }

    #[test]
    fn custom_predicate_decides_change() {
        let obj = object(json!({ "nested": { "a": true } }));

        // serde_json::Value equality is structural, an equal replacement is not a change
        let mut nested_changed = watch_with(
            Rc::clone(&obj),
            "nested",
            |current: Option<&Value>, reference: Option<&Value>| current != reference,
            false,
        );

        assert!(!nested_changed.changed());
        set(&obj, "nested", json!({ "a": true }));
        assert!(!nested_changed.changed(), "Equal contents should not be a change");
        set(&obj, "nested", json!({ "b": true }));
        assert!(nested_changed.changed());
    }

    #[test]
    fn identity_predicate_sees_new_allocations() {
        let obj = Rc::new(RefCell::new(HashMap::from([("nested", Rc::new(vec![1]))])));
        let mut nested_changed = watch_with(
            Rc::clone(&obj),
            "nested",
            crate::predicate::not_identical::<Vec<i32>>,
            Retention::Advance,
        );

        assert!(!nested_changed.changed());
        obj.borrow_mut().insert("nested", Rc::new(vec![1]));
        assert!(nested_changed.changed(), "Should be a change, it's a new allocation");
        assert!(!nested_changed.changed());
    }

    #[test]
    fn default_predicate_compares_contents() {
        let obj = Rc::new(RefCell::new(HashMap::from([("nested", Rc::new(vec![1]))])));
        let mut nested_changed = watch(Rc::clone(&obj), "nested");

        obj.borrow_mut().insert("nested", Rc::new(vec![1]));
        assert!(!nested_changed.changed(), "A new allocation with equal contents is not a change by default");
        obj.borrow_mut().insert("nested", Rc::new(vec![2]));
        assert!(nested_changed.changed());
    }

    #[test]
    fn predicate_receives_current_then_reference() {
        let obj = Rc::new(RefCell::new(HashMap::from([("num", 0)])));

        // Only increases count as changes
        let mut increased = watch_with(
            Rc::clone(&obj),
            "num",
            |current: Option<&i32>, reference: Option<&i32>| current > reference,
            false,
        );

        obj.borrow_mut().insert("num", -1);
        assert!(!increased.changed());
        assert_eq!(increased.reference(), Some(&0), "Reference should only move on a change");
        obj.borrow_mut().insert("num", 3);
        assert!(increased.changed());
        assert_eq!(increased.reference(), Some(&3));
    }

    #[test]
    fn missing_key_is_compared_as_absent() {
        let obj = Rc::new(RefCell::new(HashMap::<&str, i32>::new()));
        let mut num_changed = watch(Rc::clone(&obj), "num");

        assert!(!num_changed.changed(), "Absent compared with absent is unchanged");
        obj.borrow_mut().insert("num", 0);
        assert_eq!(
            num_changed.poll(),
            Some(Change {
                previous: None,
                current: Some(0)
            })
        );
        obj.borrow_mut().remove("num");
        assert!(num_changed.changed(), "Removing the key is a change");
        assert!(!num_changed.changed());
    }

    #[test]
    fn poll_reports_values_compared() {
        let obj = object(json!({ "num": 0 }));
        let mut advancing = watch(Rc::clone(&obj), "num");
        let mut retaining = watch_retaining(Rc::clone(&obj), "num", true);

        set(&obj, "num", json!(1));
        set(&obj, "num", json!(2));

        let expected = Some(Change {
            previous: Some(json!(0)),
            current: Some(json!(2)),
        });
        assert_eq!(advancing.poll(), expected);
        assert_eq!(retaining.poll(), expected);
        assert_eq!(advancing.poll(), None);
        assert_eq!(retaining.poll(), expected);
    }

    #[test]
    fn probe_never_writes_the_source() {
        let map = HashMap::from([("num", 0)]);
        let mut num_changed = watch(&map, "num");

        assert!(!num_changed.changed());
        assert_eq!(map.get("num"), Some(&0));
    }

    #[test]
    fn options_select_registered_predicate() {
        let obj = object(json!({ "num": 0 }));
        let mut registry = PredicateRegistry::new();
        registry.register("never", |_: Option<&Value>, _: Option<&Value>| false);

        let options = ProbeOptions {
            retain_initial: false,
            predicate: Some("never".to_string()),
        };
        let probe = Probe::from_options(Rc::clone(&obj), "num", &options, &registry);
        assert!(probe.is_ok());

        if let Ok(mut probe) = probe {
            set(&obj, "num", json!(1));
            assert!(!probe.changed(), "The registered predicate never reports changes");
        }

        let unknown = ProbeOptions {
            retain_initial: false,
            predicate: Some("deep_equal".to_string()),
        };
        assert!(matches!(
            Probe::from_options(Rc::clone(&obj), "num", &unknown, &registry),
            Err(WatchError::InvalidArgument { .. })
        ));
    }
}
