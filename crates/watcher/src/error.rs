//! Watcher construction errors

use idlewatch_core::HostError;
use thiserror::Error;

/// Errors that abort watcher construction
///
/// Nothing is subscribed when construction fails.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WatchError {
    /// Neither a selector nor an element with an id attribute was given
    #[error("invalid watcher configuration: {0}")]
    Configuration(String),

    /// The target could not be resolved to exactly one live element
    #[error("selector {selector:?} resolved to {matches} elements, expected exactly one")]
    Resolution { selector: String, matches: usize },

    /// An argument could not be interpreted
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<HostError> for WatchError {
    fn from(err: HostError) -> Self {
        WatchError::InvalidArgument(err.to_string())
    }
}
