//! Core invariant-violation errors.
//!
//! Uses `thiserror` for structured, matchable variants. These describe
//! defects in event producers (negative-progress ids, time running
//! backwards), never user-program failures -- those are modeled as
//! [`crate::trace::Fault`] values instead.

use thiserror::Error;

/// Violations of the trace data-model invariants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// `events[index].id` was not equal to `index`.
    #[error("event at position {index} carries id {id}, expected {index}")]
    NonSequentialEventId { index: usize, id: u64 },

    /// An event's timestamp was earlier than its predecessor's.
    #[error("event at position {index} has timestamp {timestamp_ms}ms, earlier than previous {previous_ms}ms")]
    TimestampRegression {
        index: usize,
        timestamp_ms: u64,
        previous_ms: u64,
    },
}
