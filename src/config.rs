use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::instrument;

use crate::{
    aggregate::Fold,
    error::WatchError,
    predicate::{NOT_EQUAL, PredicateRegistry, SharedPredicate},
    probe::Retention,
};

/// # Documentation
/// Named configuration for building a probe, in place of positional optional arguments
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ProbeOptions {
    /// Keep comparing against the initial value instead of the last reported one
    #[serde(default)]
    pub retain_initial: bool,
    /// Name of a registered predicate, strict inequality (`not_equal`) when missing
    #[serde(default)]
    pub predicate: Option<String>,
}

impl ProbeOptions {
    #[must_use]
    pub fn retention(&self) -> Retention {
        Retention::from(self.retain_initial)
    }

    /// # Errors
    /// Returns `WatchError::InvalidArgument` if the predicate named in these options isn't in `registry`
    pub fn predicate<V>(&self, registry: &PredicateRegistry<V>) -> Result<SharedPredicate<V>, WatchError> {
        let name = self.predicate.as_deref().unwrap_or(NOT_EQUAL);

        registry.resolve(name).map_err(|e| {
            WatchError::invalid_argument(
                "predicate",
                format!("{e} (registered: {})", registry.names().join(", ")),
            )
        })
    }
}

/// # Documentation
/// Configuration for the `replay` command, read from a TOML file
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReplayConfig {
    /// Keys to watch, in order
    #[serde(default)]
    pub keys: Vec<String>,
    /// How the results of multiple keys are combined, a single key is watched directly when missing
    #[serde(default)]
    pub fold: Option<Fold>,
    #[serde(default)]
    pub probe: ProbeOptions,
    /// Append logs to this file instead of stderr
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

impl ReplayConfig {
    /// # Errors
    /// Returns `WatchError::PathRwError` if the file can't be read, and the errors of `from_toml_str` otherwise
    #[instrument]
    pub fn from_file(path: &Path) -> Result<Self, WatchError> {
        let text = fs::read_to_string(path)?;

        Self::from_toml_str(text.as_str())
    }

    /// # Errors
    /// Returns `WatchError::InvalidArgument` if the text isn't valid TOML, `retain_initial` isn't a boolean,
    /// `predicate` isn't a string, or an unknown field is present
    #[instrument]
    pub fn from_toml_str(text: &str) -> Result<Self, WatchError> {
        toml::from_str(text).map_err(|e| WatchError::invalid_argument("config", e.to_string()))
    }
}
