use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Invalid Argument '{argument}':\n\t\"{reason}\"")]
    InvalidArgument { argument: String, reason: String },

    #[error("No Predicate Registered With Name:\n\t\"{0}\"")]
    UnknownPredicate(String),

    #[error("Serde JSON Serialization Failed:\n\t\"{0}\"")]
    JsonError(#[from] serde_json::Error),

    #[error("Could not read/write to path:\n\t\"{0}\"")]
    PathRwError(#[from] std::io::Error),
}

impl WatchError {
    #[must_use]
    pub fn invalid_argument<A: Into<String>, R: Into<String>>(argument: A, reason: R) -> Self {
        Self::InvalidArgument {
            argument: argument.into(),
            reason: reason.into(),
        }
    }
}
