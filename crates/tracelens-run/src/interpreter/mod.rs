//! Sandboxed tree-walking interpreter.
//!
//! Executes instrumented source against a per-run [`TraceRecorder`]
//! (bound as `__trace__`) with three resource bounds: a wall-clock
//! deadline, an operation budget, and a call-depth limit. The host surface
//! is deterministic and side-effect-free; no I/O primitive is reachable
//! from inside a program.
//!
//! [`TraceRecorder`]: crate::recorder::TraceRecorder

mod env;
mod error;
mod eval;
mod value;

pub use error::RuntimeError;
pub use value::{FunctionDef, Value};

pub(crate) use eval::{ExecLimits, Interpreter};
