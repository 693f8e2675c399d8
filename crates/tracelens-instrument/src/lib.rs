//! Source-to-source instrumentation.
//!
//! `transform` parses the input, collects probe insertions for recognized
//! constructs (array-initialized declarations, reciprocal element swaps,
//! indexed writes), and splices them back into the original text. The
//! transform is additive: unrecognized constructs pass through
//! byte-for-byte, and a parse failure yields an error with nothing emitted.
//!
//! Probes call the `__trace__` object the runner binds into the execution
//! context; running the instrumented text without that binding is an error.

mod probes;
mod splice;

use thiserror::Error;
use tracelens_syntax::{parse_program, SyntaxError};
use tracing::debug;

/// Options threaded through for diagnostics only.
#[derive(Debug, Clone, Default)]
pub struct TransformOptions {
    /// Display name of the source (path or label) for error messages.
    pub source_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    #[error("failed to parse {}: {error}", source_name.as_deref().unwrap_or("<source>"))]
    Parse {
        source_name: Option<String>,
        error: SyntaxError,
    },
}

/// Instrumented source text, or the reason the input could not be parsed.
pub type InstrumentationOutcome = Result<String, TransformError>;

/// Transforms source text by inserting trace probes after each recognized
/// construct. Pure function of its input; a fresh parse per call.
pub fn transform(source: &str, options: &TransformOptions) -> InstrumentationOutcome {
    let program = parse_program(source).map_err(|error| TransformError::Parse {
        source_name: options.source_name.clone(),
        error,
    })?;
    let insertions = probes::collect(&program, source);
    debug!(
        insertions = insertions.len(),
        source_name = options.source_name.as_deref().unwrap_or("<source>"),
        "collected probe insertions"
    );
    Ok(splice::apply(source, insertions))
}
