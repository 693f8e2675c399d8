//! Tagged pipeline outcome returned to the external caller.

use serde::{Deserialize, Serialize};

use crate::event::TraceEvent;
use crate::trace::{ExecutionTrace, Fault};

/// Result of one pipeline invocation: transform, then at most one run.
///
/// Both failure shapes are returned as values, never thrown across the
/// pipeline boundary. A `TransformFailed` means execution was never
/// attempted and no partial trace exists; a `Faulted` always carries the
/// best-effort partial trace accumulated before the fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum PipelineOutcome {
    TransformFailed {
        error: String,
    },
    Completed {
        trace: ExecutionTrace,
    },
    #[serde(rename_all = "camelCase")]
    Faulted {
        fault: Fault,
        partial_trace: Vec<TraceEvent>,
        duration_ms: u64,
    },
}

impl PipelineOutcome {
    /// Folds a runner trace into the outcome shape.
    pub fn from_trace(trace: ExecutionTrace) -> Self {
        match trace.fault {
            None => PipelineOutcome::Completed { trace },
            Some(fault) => PipelineOutcome::Faulted {
                fault,
                partial_trace: trace.events,
                duration_ms: trace.duration_ms,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completed_trace_folds_to_completed() {
        let outcome = PipelineOutcome::from_trace(ExecutionTrace::completed(vec![], 3));
        assert!(matches!(outcome, PipelineOutcome::Completed { .. }));
    }

    #[test]
    fn faulted_trace_folds_to_faulted_with_partial_events() {
        let fault = Fault {
            message: "timed out".to_string(),
            location: None,
            event_index_at_fault: 0,
        };
        let outcome = PipelineOutcome::from_trace(ExecutionTrace::faulted(vec![], 50, fault));
        match outcome {
            PipelineOutcome::Faulted {
                fault,
                partial_trace,
                duration_ms,
            } => {
                assert_eq!(fault.message, "timed out");
                assert!(partial_trace.is_empty());
                assert_eq!(duration_ms, 50);
            }
            other => panic!("expected Faulted, got {other:?}"),
        }
    }

    #[test]
    fn outcome_serializes_with_tag() {
        let outcome = PipelineOutcome::TransformFailed {
            error: "unexpected token".to_string(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "transformFailed");
        assert_eq!(json["error"], "unexpected token");
    }
}
