//! Run a fallible async check over many items at once and keep the first success.
//!
//! [`race`] spreads the items over a bounded pool of workers. The first `Ok` wins and every
//! other check is cancelled. When everything fails, one of the errors is returned, picked
//! uniformly at random without holding on to the others.

pub mod probe;
pub mod race;

pub use race::{race, FailureMode, Race, RaceError, Reservoir};
