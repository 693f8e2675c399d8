//! End-to-end pipeline properties: instrument real programs, execute them,
//! and check the resulting traces.

use proptest::prelude::*;
use serde_json::json;
use std::time::Instant;
use tracelens_core::{EventKind, PipelineOutcome, TraceEvent, TraceMessage};
use tracelens_run::{Pipeline, Runner, RunnerConfig};

fn process(source: &str) -> PipelineOutcome {
    Pipeline::default().process(source, None)
}

fn completed_events(source: &str) -> Vec<TraceEvent> {
    match process(source) {
        PipelineOutcome::Completed { trace } => {
            trace.validate().unwrap();
            trace.events
        }
        other => panic!("expected Completed, got {other:?}"),
    }
}

#[test]
fn swap_symmetry() {
    let events = completed_events("const a = [2, 1];\n[a[0], a[1]] = [a[1], a[0]];");
    assert_eq!(events.len(), 4);

    assert_eq!(events[0].kind, EventKind::VariableDeclare);
    assert_eq!(events[0].payload.get("value"), Some(&json!([2, 1])));

    assert_eq!(events[1].kind, EventKind::ArrayWrite);
    assert_eq!(events[1].payload.get("index"), Some(&json!(0)));
    assert_eq!(events[1].payload.get("value"), Some(&json!(1)));

    assert_eq!(events[2].kind, EventKind::ArrayWrite);
    assert_eq!(events[2].payload.get("index"), Some(&json!(1)));
    assert_eq!(events[2].payload.get("value"), Some(&json!(2)));

    assert_eq!(events[3].kind, EventKind::VariableAssign);
    assert_eq!(events[3].payload.get("value"), Some(&json!([1, 2])));
}

#[test]
fn indexed_write_fidelity() {
    let events = completed_events("const a = [1, 2, 3];\na[1] = a[1] + 5;");
    let writes: Vec<&TraceEvent> = events
        .iter()
        .filter(|e| e.kind == EventKind::ArrayWrite)
        .collect();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].payload.get("index"), Some(&json!(1)));
    assert_eq!(writes[0].payload.get("value"), Some(&json!(7)));
}

#[test]
fn side_effecting_index_keeps_program_semantics() {
    // `a[i++] = 9` must advance `i` exactly once; the instrumented program
    // passes the write through uninstrumented rather than re-running `i++`.
    let events = completed_events(
        "let i = 0;\n\
         const a = [5, 6, 7];\n\
         a[i++] = 9;\n\
         __trace__.assign(\"i\", i);\n\
         __trace__.assign(\"a\", a);",
    );
    assert!(events.iter().all(|e| e.kind != EventKind::ArrayWrite));

    let assigns: Vec<&TraceEvent> = events
        .iter()
        .filter(|e| e.kind == EventKind::VariableAssign)
        .collect();
    assert_eq!(assigns.len(), 2);
    assert_eq!(assigns[0].payload.get("value"), Some(&json!(1)));
    assert_eq!(assigns[1].payload.get("value"), Some(&json!([9, 6, 7])));
}

#[test]
fn monotonic_ids_and_timestamps_on_a_real_sort() {
    let events = completed_events(
        "const a = [5, 3, 8, 1, 9, 2, 7];\n\
         for (let i = 0; i < a.length - 1; i++) {\n\
           for (let j = 0; j < a.length - 1 - i; j++) {\n\
             __trace__.compare(j, j + 1);\n\
             if (a[j] > a[j + 1]) {\n\
               [a[j], a[j + 1]] = [a[j + 1], a[j]];\n\
             }\n\
           }\n\
         }\n\
         __trace__.assign(\"sorted\", a);",
    );
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.id, i as u64);
    }
    for pair in events.windows(2) {
        assert!(pair[0].timestamp_ms <= pair[1].timestamp_ms);
    }
    let last = events.last().unwrap();
    assert_eq!(last.payload.get("value"), Some(&json!([1, 2, 3, 5, 7, 8, 9])));
}

#[test]
fn clone_isolation() {
    let events = completed_events("const a = [1, 2];\na[0] = 9;\na[1] = 8;");
    // The declare snapshot predates both writes and must not reflect them.
    assert_eq!(events[0].kind, EventKind::VariableDeclare);
    assert_eq!(events[0].payload.get("value"), Some(&json!([1, 2])));
}

#[test]
fn timeout_soundness() {
    let config = RunnerConfig {
        timeout_ms: 50,
        max_ops: u64::MAX,
        ..RunnerConfig::default()
    };
    let started = Instant::now();
    let outcome = Pipeline::new(config).process(
        "const a = [1, 2];\nwhile (true) { a[0] = a[0] + 1; }",
        None,
    );
    assert!(started.elapsed().as_millis() < 500);

    match outcome {
        PipelineOutcome::Faulted {
            fault,
            partial_trace,
            ..
        } => {
            assert!(fault.message.contains("timed out"));
            // Events recorded before the abort survive, in order: the
            // declare probe plus however many write probes ran.
            assert_eq!(partial_trace[0].kind, EventKind::VariableDeclare);
            for (i, event) in partial_trace.iter().enumerate() {
                assert_eq!(event.id, i as u64);
            }
        }
        other => panic!("expected Faulted, got {other:?}"),
    }
}

#[test]
fn transform_failure_isolation() {
    match process("const = [1, 2];") {
        PipelineOutcome::TransformFailed { error } => {
            assert!(!error.is_empty());
        }
        other => panic!("expected TransformFailed, got {other:?}"),
    }
}

#[test]
fn concurrent_runs_are_independent() {
    let handles: Vec<_> = (0..4)
        .map(|i| {
            std::thread::spawn(move || {
                let runner = Runner::new(RunnerConfig::default());
                let source = format!("__trace__.declare(\"a\", [{i}]);");
                runner.run(&source)
            })
        })
        .collect();
    for handle in handles {
        let trace = handle.join().unwrap();
        assert!(trace.is_complete());
        assert_eq!(trace.events.len(), 1);
        assert_eq!(trace.events[0].id, 0);
    }
}

#[test]
fn wire_messages_match_the_outcome() {
    let message = TraceMessage::from_outcome(process("const a = [2, 1];"));
    match message {
        TraceMessage::Complete { events, summary } => {
            assert_eq!(summary.total_events as usize, events.len());
        }
        other => panic!("expected Complete, got {other:?}"),
    }

    let message = TraceMessage::from_outcome(process("const = ;"));
    match message {
        TraceMessage::Error {
            error,
            partial_trace,
        } => {
            assert!(!error.is_empty());
            assert!(partial_trace.is_empty());
        }
        other => panic!("expected Error, got {other:?}"),
    }

    let message = TraceMessage::from_outcome(process("const a = [1];\nboom();"));
    match message {
        TraceMessage::Error { partial_trace, .. } => {
            // declare probe + appended error event
            assert_eq!(partial_trace.len(), 2);
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Every generated program yields a well-formed trace: ids count up from
    // 0 and timestamps never decrease, with one write event per element.
    #[test]
    fn generated_write_programs_trace_monotonically(
        values in proptest::collection::vec(0i64..100, 1..20),
    ) {
        let literals = values
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        let mut source = format!("const a = [{literals}];\n");
        for i in 0..values.len() {
            source.push_str(&format!("a[{i}] = a[{i}] * 2;\n"));
        }

        let events = completed_events(&source);
        prop_assert_eq!(events.len(), values.len() + 1);
        for (i, value) in values.iter().enumerate() {
            let payload = &events[i + 1].payload;
            prop_assert_eq!(payload.get("index"), Some(&json!(i)));
            prop_assert_eq!(payload.get("value"), Some(&json!(value * 2)));
        }
    }
}
