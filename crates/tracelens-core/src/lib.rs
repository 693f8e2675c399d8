//! Shared data model for the tracelens instrumentation-and-trace pipeline.
//!
//! This crate is the vocabulary every other stage reads and writes: trace
//! events and their kinds, the per-run [`ExecutionTrace`], the pipeline
//! outcome enum, and the wire messages pushed to transport collaborators.
//! Pure value types -- no behavior beyond constructors, validation, and
//! serde.

pub mod error;
pub mod event;
pub mod outcome;
pub mod trace;
pub mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use event::{
    array_write_payload, error_payload, indices_payload, named_value_payload, swap_payload,
    EventKind, Payload, TraceEvent,
};
pub use outcome::PipelineOutcome;
pub use trace::{ExecutionTrace, Fault};
pub use wire::{TraceMessage, TraceSummary};
