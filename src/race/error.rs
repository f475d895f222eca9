use std::time::Duration;

use thiserror::Error;

/// Why a race ended without a successful check.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RaceError<E> {
    /// There were no items to check.
    #[error("no items to check")]
    EmptyInput,
    /// Every dispatched check failed. Holds one of the failures, picked uniformly at random.
    #[error("no check succeeded: {0}")]
    AllFailed(E),
    /// Every dispatched check failed and the individual errors were discarded.
    #[error("non-error response not found")]
    NotFound,
    /// The caller's token was cancelled before any check succeeded.
    #[error("race cancelled before any check succeeded")]
    Cancelled,
    /// The configured deadline passed before any check succeeded.
    #[error("race timed out after {0:?}")]
    TimedOut(Duration),
}

impl<E> RaceError<E> {
    /// Returns true if the race was cut short from the outside, by cancellation or deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RaceError::Cancelled | RaceError::TimedOut(_))
    }

    /// Returns the sampled checker error, if this error carries one.
    pub fn into_failure(self) -> Option<E> {
        match self {
            RaceError::AllFailed(err) => Some(err),
            _ => None,
        }
    }
}
