//! Execution half of the tracelens pipeline.
//!
//! Pairs a per-run [`TraceRecorder`] with a sandboxed, resource-bounded
//! interpreter, wraps both behind the [`Runner`] contract (one bounded
//! execution, one [`ExecutionTrace`]), and composes runner and transformer
//! into the [`Pipeline`] orchestrator.
//!
//! [`ExecutionTrace`]: tracelens_core::ExecutionTrace

pub mod interpreter;
pub mod pipeline;
pub mod recorder;
pub mod runner;

pub use interpreter::{RuntimeError, Value};
pub use pipeline::Pipeline;
pub use recorder::TraceRecorder;
pub use runner::{Runner, RunnerConfig};
