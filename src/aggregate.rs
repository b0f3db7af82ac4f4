use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{instrument, trace};

use crate::{
    config::ProbeOptions,
    error::WatchError,
    predicate::{NotEqual, Predicate, PredicateRegistry, SharedPredicate},
    probe::{Probe, Retention},
    properties::Properties,
};

/// # Documentation
/// How the results of the child probes are combined
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Fold {
    /// Changed if any key changed
    #[value(alias = "some")]
    Any,
    /// Changed only if every key changed in the same poll
    #[value(alias = "every")]
    All,
}

impl Fold {
    // Result for an aggregate with no keys
    const fn identity(self) -> bool {
        matches!(self, Self::All)
    }

    const fn combine(self, acc: bool, changed: bool) -> bool {
        match self {
            Self::Any => acc || changed,
            Self::All => acc && changed,
        }
    }
}

/// # Documentation
/// One probe per key over the same source, combined with `Fold` on each poll.
///
/// Every child is polled on every call, even once the result is already decided,
/// so that each child's reference value keeps advancing.
pub struct Aggregate<O, K, P = NotEqual>
where
    O: Properties<K>,
{
    fold: Fold,
    probes: Vec<Probe<O, K, P>>,
}

impl<O, K> Aggregate<O, K, NotEqual>
where
    O: Properties<K> + Clone,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
{
    #[must_use]
    pub fn new<I: IntoIterator<Item = K>>(fold: Fold, source: &O, keys: I) -> Self {
        Self::with_predicate(fold, source, keys, NotEqual, Retention::Advance)
    }

    #[must_use]
    pub fn retaining<I, R>(fold: Fold, source: &O, keys: I, retention: R) -> Self
    where
        I: IntoIterator<Item = K>,
        R: Into<Retention>,
    {
        Self::with_predicate(fold, source, keys, NotEqual, retention)
    }
}

impl<O, K> Aggregate<O, K, SharedPredicate<O::Value>>
where
    O: Properties<K> + Clone,
    O::Value: fmt::Debug,
    K: fmt::Debug,
{
    /// # Errors
    /// Returns `WatchError::InvalidArgument` if the options name a predicate which isn't in `registry`
    pub fn from_options<I: IntoIterator<Item = K>>(
        fold: Fold,
        source: &O,
        keys: I,
        options: &ProbeOptions,
        registry: &PredicateRegistry<O::Value>,
    ) -> Result<Self, WatchError> {
        let predicate = options.predicate(registry)?;

        Ok(Self::with_predicate(fold, source, keys, predicate, options.retention()))
    }
}

impl<O, K, P> Aggregate<O, K, P>
where
    O: Properties<K> + Clone,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    P: Predicate<O::Value> + Clone,
{
    /// # Documentation
    /// Build one probe per key, duplicates included, all sharing `source`, `predicate` and `retention`
    #[must_use]
    #[instrument(skip(source, keys, predicate, retention))]
    pub fn with_predicate<I, R>(fold: Fold, source: &O, keys: I, predicate: P, retention: R) -> Self
    where
        I: IntoIterator<Item = K>,
        R: Into<Retention>,
    {
        let retention = retention.into();
        let probes = keys
            .into_iter()
            .map(|key| Probe::with_predicate(source.clone(), key, predicate.clone(), retention))
            .collect::<Vec<_>>();

        Self { fold, probes }
    }
}

impl<O, K, P> Aggregate<O, K, P>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    P: Predicate<O::Value>,
{
    /// # Documentation
    /// Poll every child probe in order and combine the results
    pub fn changed(&mut self) -> bool {
        let fold = self.fold;

        // No short-circuit, each probe has to be polled to advance its reference
        let changed = self
            .probes
            .iter_mut()
            .fold(fold.identity(), |acc, probe| fold.combine(acc, probe.changed()));

        trace!(?fold, changed, "Aggregate polled");

        changed
    }
}

impl<O, K, P> Aggregate<O, K, P>
where
    O: Properties<K>,
{
    #[must_use]
    pub const fn fold(&self) -> Fold {
        self.fold
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.probes.iter().map(Probe::key)
    }

    #[must_use]
    pub fn probes(&self) -> &[Probe<O, K, P>] {
        &self.probes
    }
}

impl<O, K, P> fmt::Debug for Aggregate<O, K, P>
where
    O: Properties<K>,
    O::Value: fmt::Debug,
    K: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregate")
            .field("fold", &self.fold)
            .field("probes", &self.probes)
            .finish()
    }
}

/// # Documentation
/// Changed if any of `keys` changed, see `Aggregate::retaining` and `Aggregate::with_predicate` for the other forms
#[must_use]
pub fn any<O, K, I>(source: &O, keys: I) -> Aggregate<O, K>
where
    O: Properties<K> + Clone,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
{
    Aggregate::new(Fold::Any, source, keys)
}

#[must_use]
pub fn any_retaining<O, K, I, R>(source: &O, keys: I, retention: R) -> Aggregate<O, K>
where
    O: Properties<K> + Clone,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
    R: Into<Retention>,
{
    Aggregate::retaining(Fold::Any, source, keys, retention)
}

#[must_use]
pub fn any_with<O, K, I, P, R>(source: &O, keys: I, predicate: P, retention: R) -> Aggregate<O, K, P>
where
    O: Properties<K> + Clone,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
    P: Predicate<O::Value> + Clone,
    R: Into<Retention>,
{
    Aggregate::with_predicate(Fold::Any, source, keys, predicate, retention)
}

/// # Documentation
/// Changed only if all of `keys` changed in the same poll
#[must_use]
pub fn all<O, K, I>(source: &O, keys: I) -> Aggregate<O, K>
where
    O: Properties<K> + Clone,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
{
    Aggregate::new(Fold::All, source, keys)
}

#[must_use]
pub fn all_retaining<O, K, I, R>(source: &O, keys: I, retention: R) -> Aggregate<O, K>
where
    O: Properties<K> + Clone,
    O::Value: PartialEq + fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
    R: Into<Retention>,
{
    Aggregate::retaining(Fold::All, source, keys, retention)
}

#[must_use]
pub fn all_with<O, K, I, P, R>(source: &O, keys: I, predicate: P, retention: R) -> Aggregate<O, K, P>
where
    O: Properties<K> + Clone,
    O::Value: fmt::Debug,
    K: fmt::Debug,
    I: IntoIterator<Item = K>,
    P: Predicate<O::Value> + Clone,
    R: Into<Retention>,
{
    Aggregate::with_predicate(Fold::All, source, keys, predicate, retention)
}

pub use self::{all as every, any as some};
