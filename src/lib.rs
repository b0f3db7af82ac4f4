#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![allow(clippy::module_name_repetitions)]

//! Pull-based change detection for a keyed value.
//!
//! A [`Probe`] reads `key` from a shared object each time it is polled and reports whether the
//! value changed since the last poll. [`any`] and [`all`] combine one probe per key.
//!
//! ```
//! use std::{cell::RefCell, collections::HashMap, rc::Rc};
//!
//! let object = Rc::new(RefCell::new(HashMap::from([("num", 0)])));
//! let mut num_changed = watch_property::watch(Rc::clone(&object), "num");
//!
//! assert!(!num_changed.changed());
//! object.borrow_mut().insert("num", 1);
//! assert!(num_changed.changed());
//! assert!(!num_changed.changed());
//! ```

pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod predicate;
pub mod probe;
pub mod properties;
pub mod replay;

pub use aggregate::{Aggregate, Fold, all, all_retaining, all_with, any, any_retaining, any_with, every, some};
pub use config::ProbeOptions;
pub use error::WatchError;
pub use predicate::{NotEqual, Predicate, PredicateRegistry, SharedPredicate, not_equal, not_identical};
pub use probe::{Change, Probe, Retention, watch, watch_retaining, watch_with};
pub use properties::Properties;
