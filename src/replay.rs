use std::{cell::RefCell, fmt, fs, path::Path, rc::Rc};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, instrument};

use crate::{
    aggregate::Aggregate,
    config::ReplayConfig,
    error::WatchError,
    predicate::{PredicateRegistry, SharedPredicate},
    probe::Probe,
};

pub type Object = Rc<RefCell<Map<String, Value>>>;

/// # Documentation
/// The result of polling once after a frame was applied
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Round {
    pub round: usize,
    pub changed: bool,
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round {}: {}", self.round, self.changed)
    }
}

/// # Documentation
/// Either a single probe or an aggregate, both polled the same way
#[derive(Debug)]
pub enum Watcher {
    Single(Probe<Object, String, SharedPredicate<Value>>),
    Aggregate(Aggregate<Object, String, SharedPredicate<Value>>),
}

impl Watcher {
    /// # Errors
    /// Returns `WatchError::InvalidArgument` if there are no keys, if more than one key is given without a fold,
    /// or if the configured predicate isn't registered
    #[instrument(skip(object, registry))]
    pub fn build(object: &Object, config: &ReplayConfig, registry: &PredicateRegistry<Value>) -> Result<Self, WatchError> {
        if config.keys.is_empty() {
            return Err(WatchError::invalid_argument("keys", "at least one key is needed"));
        }

        match config.fold {
            Some(fold) => Ok(Self::Aggregate(Aggregate::from_options(
                fold,
                object,
                config.keys.iter().cloned(),
                &config.probe,
                registry,
            )?)),
            None => match config.keys.as_slice() {
                [key] => Ok(Self::Single(Probe::from_options(
                    Rc::clone(object),
                    key.clone(),
                    &config.probe,
                    registry,
                )?)),
                keys => Err(WatchError::invalid_argument(
                    "keys",
                    format!("{} keys given without `any` or `all`", keys.len()),
                )),
            },
        }
    }

    pub fn changed(&mut self) -> bool {
        match self {
            Self::Single(probe) => probe.changed(),
            Self::Aggregate(aggregate) => aggregate.changed(),
        }
    }
}

pub const TYPE_CHANGED: &str = "type_changed";

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// # Documentation
/// Changed only when the JSON type of the value differs, or the key appeared or disappeared
#[must_use]
pub fn type_changed(current: Option<&Value>, reference: Option<&Value>) -> bool {
    current.map(json_type) != reference.map(json_type)
}

/// # Documentation
/// Predicates available to replayed frames: `not_equal` and `type_changed`
#[must_use]
pub fn json_registry() -> PredicateRegistry<Value> {
    let mut registry = PredicateRegistry::new();
    registry.register(TYPE_CHANGED, type_changed);

    registry
}

fn frame_to_object(index: usize, frame: &Value) -> Result<Map<String, Value>, WatchError> {
    frame.as_object().cloned().ok_or_else(|| {
        WatchError::invalid_argument(format!("frames[{index}]"), format!("expected a JSON object, found {frame}"))
    })
}

/// # Documentation
/// Seed a watcher from the first frame, then apply each frame in turn to the shared object and poll once.
/// The first frame is polled too, so its round is always unchanged.
///
/// # Errors
/// Returns an error if a frame isn't a JSON object or the watcher can't be built from `config`
#[instrument(skip(frames, registry))]
pub fn replay(
    frames: &[Value],
    config: &ReplayConfig,
    registry: &PredicateRegistry<Value>,
) -> Result<Vec<Round>, WatchError> {
    let Some(first) = frames.first() else {
        info!("No frames to replay");
        return Ok(Vec::new());
    };

    let object: Object = Rc::new(RefCell::new(frame_to_object(0, first)?));
    let mut watcher = Watcher::build(&object, config, registry)?;

    let mut rounds = Vec::with_capacity(frames.len());
    for (round, frame) in frames.iter().enumerate() {
        if round > 0 {
            let next = frame_to_object(round, frame)?;
            *object.borrow_mut() = next;
        }

        let changed = watcher.changed();
        debug!("Replay round {round}: {changed}");

        rounds.push(Round { round, changed });
    }

    Ok(rounds)
}

/// # Errors
/// Returns an error if the file can't be read, isn't JSON, or isn't an array
#[instrument]
pub fn read_frames(path: &Path) -> Result<Vec<Value>, WatchError> {
    let text = fs::read_to_string(path)?;

    match serde_json::from_str(text.as_str())? {
        Value::Array(frames) => Ok(frames),
        other => Err(WatchError::invalid_argument(
            "frames",
            format!("expected a JSON array of objects, found {other}"),
        )),
    }
}
