//! The complete record of one execution run.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::event::TraceEvent;

/// Description of why a run did not complete normally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault {
    pub message: String,
    /// Diagnostic source name/path, when the caller supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Number of events that had been recorded when the fault occurred.
    ///
    /// The runner then appends a terminal `error` event, which therefore
    /// sits at exactly this index in `events`. A consumer replaying only
    /// the pre-fault events should stop here.
    #[serde(rename = "eventIndexAtFault")]
    pub event_index_at_fault: usize,
}

/// Ordered, append-only event record of a single run.
///
/// Created fresh per run by the sandboxed runner, owned exclusively by that
/// run, and handed to the orchestrator by value. `fault` is present exactly
/// when the run did not complete normally; the events then form a
/// best-effort partial trace (possibly empty if the execution context could
/// not even be constructed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub events: Vec<TraceEvent>,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl ExecutionTrace {
    /// A trace for a run that completed normally.
    pub fn completed(events: Vec<TraceEvent>, duration_ms: u64) -> Self {
        ExecutionTrace {
            events,
            duration_ms,
            fault: None,
        }
    }

    /// A partial trace for a run that faulted.
    pub fn faulted(events: Vec<TraceEvent>, duration_ms: u64, fault: Fault) -> Self {
        ExecutionTrace {
            events,
            duration_ms,
            fault: Some(fault),
        }
    }

    /// Whether the run completed without a fault.
    pub fn is_complete(&self) -> bool {
        self.fault.is_none()
    }

    /// Checks the internal invariants every well-formed trace upholds:
    /// `events[i].id == i` and non-decreasing timestamps.
    ///
    /// A violation is a programming defect in a producer, not a recoverable
    /// runtime condition; tests fail loudly on it.
    pub fn validate(&self) -> Result<(), CoreError> {
        let mut last_timestamp = 0u64;
        for (index, event) in self.events.iter().enumerate() {
            if event.id != index as u64 {
                return Err(CoreError::NonSequentialEventId {
                    index,
                    id: event.id,
                });
            }
            if event.timestamp_ms < last_timestamp {
                return Err(CoreError::TimestampRegression {
                    index,
                    timestamp_ms: event.timestamp_ms,
                    previous_ms: last_timestamp,
                });
            }
            last_timestamp = event.timestamp_ms;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{named_value_payload, EventKind};
    use serde_json::json;

    fn event(id: u64, timestamp_ms: u64) -> TraceEvent {
        TraceEvent {
            id,
            timestamp_ms,
            kind: EventKind::VariableAssign,
            payload: named_value_payload("x", json!(1)),
        }
    }

    #[test]
    fn validate_accepts_well_formed_trace() {
        let trace = ExecutionTrace::completed(vec![event(0, 0), event(1, 0), event(2, 5)], 6);
        assert!(trace.validate().is_ok());
        assert!(trace.is_complete());
    }

    #[test]
    fn validate_rejects_non_sequential_ids() {
        let trace = ExecutionTrace::completed(vec![event(0, 0), event(3, 1)], 2);
        match trace.validate() {
            Err(CoreError::NonSequentialEventId { index: 1, id: 3 }) => {}
            other => panic!("expected NonSequentialEventId, got {other:?}"),
        }
    }

    #[test]
    fn validate_rejects_timestamp_regression() {
        let trace = ExecutionTrace::completed(vec![event(0, 9), event(1, 4)], 10);
        assert!(matches!(
            trace.validate(),
            Err(CoreError::TimestampRegression { index: 1, .. })
        ));
    }

    #[test]
    fn faulted_trace_serializes_fault_fields() {
        let trace = ExecutionTrace::faulted(
            vec![event(0, 1)],
            20,
            Fault {
                message: "boom".to_string(),
                location: Some("sort.js".to_string()),
                event_index_at_fault: 1,
            },
        );
        assert!(!trace.is_complete());

        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["durationMs"], json!(20));
        assert_eq!(json["fault"]["eventIndexAtFault"], json!(1));
        assert_eq!(json["fault"]["location"], json!("sort.js"));
    }

    #[test]
    fn completed_trace_omits_fault_key() {
        let trace = ExecutionTrace::completed(vec![], 0);
        let json = serde_json::to_value(&trace).unwrap();
        assert!(json.get("fault").is_none());
    }
}
