//! Sandboxed runner: one bounded execution, one trace.

use std::time::Instant;

use tracelens_core::{ExecutionTrace, Fault};
use tracelens_syntax::parse_program;
use tracing::{debug, warn};

use crate::interpreter::{ExecLimits, Interpreter};
use crate::recorder::TraceRecorder;

/// Resource bounds for a run.
#[derive(Debug, Clone, Copy)]
pub struct RunnerConfig {
    /// Hard wall-clock timeout for one execution.
    pub timeout_ms: u64,
    /// Operation budget, a deterministic bound alongside the timeout.
    pub max_ops: u64,
    /// Maximum interpreter call depth.
    pub max_call_depth: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            timeout_ms: 5000,
            max_ops: 25_000_000,
            max_call_depth: 256,
        }
    }
}

/// Executes instrumented source in an isolated, time-bounded context.
///
/// Every call builds a fresh recorder and interpreter; nothing is shared
/// between runs, so concurrent or sequential runs are mutually independent.
/// Faults never escape as panics: any trap becomes a best-effort partial
/// trace plus a fault descriptor.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    config: RunnerConfig,
    source_name: Option<String>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Runner {
            config,
            source_name: None,
        }
    }

    /// Attaches a diagnostic source name carried into fault locations.
    pub fn with_source_name(mut self, source_name: impl Into<String>) -> Self {
        self.source_name = Some(source_name.into());
        self
    }

    pub fn run(&self, instrumented: &str) -> ExecutionTrace {
        let started = Instant::now();

        let program = match parse_program(instrumented) {
            Ok(program) => program,
            Err(err) => {
                // The execution context could not even be constructed; the
                // partial trace is legitimately empty.
                warn!(error = %err, "instrumented source failed to parse");
                let fault = Fault {
                    message: format!("execution context could not be constructed: {err}"),
                    location: self.source_name.clone(),
                    event_index_at_fault: 0,
                };
                return ExecutionTrace::faulted(Vec::new(), elapsed_ms(started), fault);
            }
        };

        let mut recorder = TraceRecorder::new();
        let limits = ExecLimits {
            timeout_ms: self.config.timeout_ms,
            max_ops: self.config.max_ops,
            max_call_depth: self.config.max_call_depth,
        };
        let result = Interpreter::new(&mut recorder, limits).run(&program);

        match result {
            Ok(()) => {
                let duration_ms = elapsed_ms(started);
                debug!(events = recorder.len(), duration_ms, "run completed");
                ExecutionTrace::completed(recorder.into_events(), duration_ms)
            }
            Err(err) => {
                let event_index_at_fault = recorder.len();
                recorder.record_error(&err.to_string());
                let duration_ms = elapsed_ms(started);
                warn!(error = %err, events = event_index_at_fault, "run faulted");
                let fault = Fault {
                    message: err.to_string(),
                    location: self.source_name.clone(),
                    event_index_at_fault,
                };
                ExecutionTrace::faulted(recorder.into_events(), duration_ms, fault)
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracelens_core::EventKind;

    fn runner() -> Runner {
        Runner::new(RunnerConfig::default())
    }

    #[test]
    fn completed_run_has_no_fault() {
        let trace = runner().run("const a = [1]; __trace__.declare(\"a\", a);");
        assert!(trace.is_complete());
        assert_eq!(trace.events.len(), 1);
        trace.validate().unwrap();
    }

    #[test]
    fn faulted_run_keeps_partial_trace_and_appends_error_event() {
        let trace = runner().run(
            "__trace__.declare(\"a\", [1]);\n\
             __trace__.declare(\"b\", [2]);\n\
             boom();",
        );
        let fault = trace.fault.as_ref().expect("run should fault");
        assert_eq!(fault.event_index_at_fault, 2);
        assert!(fault.message.contains("boom"));

        assert_eq!(trace.events.len(), 3);
        assert_eq!(trace.events[2].kind, EventKind::Error);
        assert_eq!(
            trace.events[2].payload.get("message"),
            Some(&json!("'boom' is not defined"))
        );
        trace.validate().unwrap();
    }

    #[test]
    fn unparseable_input_is_a_fault_with_empty_trace() {
        let trace = runner().run("let = ;");
        let fault = trace.fault.as_ref().expect("parse failure should fault");
        assert!(fault.message.contains("could not be constructed"));
        assert_eq!(fault.event_index_at_fault, 0);
        assert!(trace.events.is_empty());
    }

    #[test]
    fn timeout_aborts_within_a_bounded_margin() {
        let config = RunnerConfig {
            timeout_ms: 50,
            max_ops: u64::MAX,
            ..RunnerConfig::default()
        };
        let started = Instant::now();
        let trace = Runner::new(config).run("__trace__.declare(\"a\", [1]);\nwhile (true) {}");
        assert!(started.elapsed().as_millis() < 500);

        let fault = trace.fault.as_ref().expect("infinite loop should fault");
        assert!(fault.message.contains("timed out"));
        assert_eq!(fault.event_index_at_fault, 1);
        assert_eq!(trace.events[0].kind, EventKind::VariableDeclare);
    }

    #[test]
    fn fault_location_carries_the_source_name() {
        let trace = runner().with_source_name("sort.js").run("boom();");
        assert_eq!(trace.fault.unwrap().location.as_deref(), Some("sort.js"));
    }

    #[test]
    fn sequential_runs_share_nothing() {
        let runner = runner();
        let first = runner.run("__trace__.declare(\"a\", [1]);");
        let second = runner.run("__trace__.declare(\"b\", [2]);");
        assert_eq!(first.events.len(), 1);
        assert_eq!(second.events.len(), 1);
        assert_eq!(second.events[0].id, 0);
    }
}
