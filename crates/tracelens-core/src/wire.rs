//! Wire messages pushed to the transport/broadcast collaborator.
//!
//! One run produces `trace:start` before execution, then exactly one of
//! `trace:complete` or `trace:error`. Retention/replay for late-joining
//! consumers is the transport collaborator's responsibility.

use serde::{Deserialize, Serialize};

use crate::event::TraceEvent;
use crate::outcome::PipelineOutcome;

/// Summary block carried by `trace:complete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummary {
    #[serde(rename = "totalEvents")]
    pub total_events: usize,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
}

/// One serialized message per run phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TraceMessage {
    #[serde(rename = "trace:start")]
    Start,
    #[serde(rename = "trace:complete")]
    Complete {
        events: Vec<TraceEvent>,
        summary: TraceSummary,
    },
    #[serde(rename = "trace:error")]
    Error {
        error: String,
        #[serde(rename = "partialTrace")]
        partial_trace: Vec<TraceEvent>,
    },
}

impl TraceMessage {
    /// Shapes a pipeline outcome into the terminal message for its run.
    ///
    /// A transform failure maps to `trace:error` with an empty partial
    /// trace, since execution was never attempted.
    pub fn from_outcome(outcome: PipelineOutcome) -> TraceMessage {
        match outcome {
            PipelineOutcome::TransformFailed { error } => TraceMessage::Error {
                error,
                partial_trace: Vec::new(),
            },
            PipelineOutcome::Completed { trace } => TraceMessage::Complete {
                summary: TraceSummary {
                    total_events: trace.events.len(),
                    duration_ms: trace.duration_ms,
                },
                events: trace.events,
            },
            PipelineOutcome::Faulted {
                fault,
                partial_trace,
                ..
            } => TraceMessage::Error {
                error: fault.message,
                partial_trace,
            },
        }
    }
}
