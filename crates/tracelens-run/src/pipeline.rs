//! Pipeline orchestrator: transform, then at most one run.

use tracelens_core::PipelineOutcome;
use tracelens_instrument::{transform, TransformOptions};
use tracing::debug;

use crate::runner::{Runner, RunnerConfig};

/// Composes the transformer and the sandboxed runner.
///
/// One source change produces exactly one invocation; there are no retries
/// inside the pipeline. A transform failure short-circuits before any
/// execution is attempted.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: RunnerConfig,
}

impl Pipeline {
    pub fn new(config: RunnerConfig) -> Self {
        Pipeline { config }
    }

    pub fn process(&self, source: &str, source_name: Option<&str>) -> PipelineOutcome {
        let options = TransformOptions {
            source_name: source_name.map(str::to_string),
        };
        let instrumented = match transform(source, &options) {
            Ok(instrumented) => instrumented,
            Err(err) => {
                debug!(error = %err, "transform failed, skipping execution");
                return PipelineOutcome::TransformFailed {
                    error: err.to_string(),
                };
            }
        };

        let mut runner = Runner::new(self.config);
        if let Some(name) = source_name {
            runner = runner.with_source_name(name);
        }
        PipelineOutcome::from_trace(runner.run(&instrumented))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_source_completes() {
        let outcome = Pipeline::default().process("const a = [2, 1];", None);
        match outcome {
            PipelineOutcome::Completed { trace } => {
                assert_eq!(trace.events.len(), 1);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
    }

    #[test]
    fn invalid_syntax_short_circuits_before_execution() {
        let outcome = Pipeline::default().process("const = [1];", Some("bad.js"));
        match outcome {
            PipelineOutcome::TransformFailed { error } => {
                assert!(error.contains("bad.js"));
            }
            other => panic!("expected TransformFailed, got {other:?}"),
        }
    }

    #[test]
    fn runtime_fault_yields_partial_trace() {
        let outcome =
            Pipeline::default().process("const a = [1, 2];\nboom();", Some("demo.js"));
        match outcome {
            PipelineOutcome::Faulted {
                fault,
                partial_trace,
                ..
            } => {
                assert_eq!(fault.location.as_deref(), Some("demo.js"));
                // declare probe + appended error event
                assert_eq!(partial_trace.len(), 2);
            }
            other => panic!("expected Faulted, got {other:?}"),
        }
    }
}
