//! Runtime fault taxonomy for the sandboxed interpreter.
//!
//! Every variant is a trap: execution stops, the runner converts the error
//! into a fault descriptor, and the events recorded so far become the
//! partial trace. Nothing here ever crosses the pipeline boundary as a
//! panic.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("'{name}' is not defined")]
    UndefinedVariable { name: String },

    #[error("assignment to constant variable '{name}'")]
    AssignToConst { name: String },

    #[error("index {index} is out of bounds for array of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("type error: {message}")]
    TypeError { message: String },

    #[error("'{name}' is not a function")]
    NotAFunction { name: String },

    #[error("unknown property '{property}'")]
    UnknownProperty { property: String },

    #[error("unknown trace method '{method}'")]
    UnknownTraceMethod { method: String },

    #[error("call depth limit of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("operation budget of {limit} exhausted")]
    OpBudgetExhausted { limit: u64 },

    #[error("execution timed out after {timeout_ms} ms")]
    TimedOut { timeout_ms: u64 },
}

impl RuntimeError {
    /// Shorthand for ad hoc type errors.
    pub fn type_error(message: impl Into<String>) -> RuntimeError {
        RuntimeError::TypeError {
            message: message.into(),
        }
    }
}
