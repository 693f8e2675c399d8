//! Trace runtime: the per-run event accumulator.

use std::time::Instant;

use serde_json::Value as Json;
use tracelens_core::{
    array_write_payload, error_payload, indices_payload, named_value_payload, swap_payload,
    EventKind, Payload, TraceEvent,
};

/// Accumulates trace events for exactly one run.
///
/// Ids are assigned at emission time, strictly increasing from 0, and
/// timestamps are elapsed milliseconds since the recorder was created.
/// Payload values are `serde_json` snapshots taken by the caller before
/// emission, so later mutation of interpreter state never reaches a
/// recorded event.
#[derive(Debug)]
pub struct TraceRecorder {
    started: Instant,
    events: Vec<TraceEvent>,
}

impl TraceRecorder {
    pub fn new() -> Self {
        TraceRecorder {
            started: Instant::now(),
            events: Vec::new(),
        }
    }

    /// Appends one event. Callable any number of times, including zero.
    pub fn emit(&mut self, kind: EventKind, payload: Payload) {
        self.events.push(TraceEvent {
            id: self.events.len() as u64,
            timestamp_ms: self.elapsed_ms(),
            kind,
            payload,
        });
    }

    pub fn declare(&mut self, name: &str, value: Json) {
        self.emit(EventKind::VariableDeclare, named_value_payload(name, value));
    }

    pub fn assign(&mut self, name: &str, value: Json) {
        self.emit(EventKind::VariableAssign, named_value_payload(name, value));
    }

    pub fn array_write(&mut self, name: &str, index: Json, value: Json) {
        self.emit(EventKind::ArrayWrite, array_write_payload(name, index, value));
    }

    pub fn compare(&mut self, i: Json, j: Json) {
        self.emit(EventKind::Compare, indices_payload(i, j));
    }

    pub fn swap(&mut self, name: &str, i: Json, j: Json) {
        self.emit(EventKind::Swap, swap_payload(name, i, j));
    }

    /// The error event the runner appends when a run faults.
    pub fn record_error(&mut self, message: &str) {
        self.emit(EventKind::Error, error_payload(message));
    }

    /// Events accumulated so far. Safe at any time, including after a
    /// fault; this is what makes partial traces possible.
    pub fn snapshot(&self) -> Vec<TraceEvent> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Milliseconds since this recorder (and its run) started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    /// Drains the recorder into the final event list.
    pub fn into_events(self) -> Vec<TraceEvent> {
        self.events
    }
}

impl Default for TraceRecorder {
    fn default() -> Self {
        TraceRecorder::new()
    }
}
