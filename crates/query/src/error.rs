//! The one error kind that crosses the public boundary.
//!
//! Queries and updates are "safe" by contract: bad selectors, bad input
//! shapes, and unknown patch keys are recovered locally with a warning.
//! Only wait expiry is surfaced, because absence is meaningful to callers.

use std::fmt;
use std::time::Duration;

/// Errors returned by the engine's future-returning operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// A `wait_for*` call exceeded its deadline.
    WaitTimeout {
        /// The selector that never produced enough matches.
        selector: String,
        /// The full timeout that elapsed.
        waited: Duration,
    },
}

impl fmt::Display for QueryError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitTimeout { selector, waited } => write!(
                formatter,
                "timed out after {waited:?} waiting for `{selector}`"
            ),
        }
    }
}

impl std::error::Error for QueryError {}
