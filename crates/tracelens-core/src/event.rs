//! Trace event record and the closed set of event kinds.
//!
//! Every producer supplies a [`EventKind`] from the known set together with
//! a payload shaped for that kind. Consumers must treat unknown kinds as
//! opaque and skip them rather than fail, so [`EventKind`] round-trips
//! unrecognized names through [`EventKind::Other`] instead of rejecting
//! them at deserialization time.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// Kind-dependent event payload. Insertion order is preserved so serialized
/// traces are byte-for-byte deterministic across runs.
pub type Payload = IndexMap<String, Json>;

/// The kind of an observed state change.
///
/// The first five kinds are the core probe vocabulary inserted by the
/// transformer; the remainder are reserved for richer probes. Names
/// serialize as the wire strings (`"variable:declare"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    VariableDeclare,
    VariableAssign,
    ArrayWrite,
    Compare,
    Swap,
    ArrayCreate,
    ArrayRead,
    ArrayMethod,
    LoopEnter,
    LoopIteration,
    LoopExit,
    FunctionCall,
    FunctionReturn,
    Error,
    /// A kind this build does not know about. Preserved verbatim so newer
    /// producers and older consumers can coexist.
    Other(String),
}

impl EventKind {
    /// The wire name for this kind.
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::VariableDeclare => "variable:declare",
            EventKind::VariableAssign => "variable:assign",
            EventKind::ArrayWrite => "array:write",
            EventKind::Compare => "compare",
            EventKind::Swap => "swap",
            EventKind::ArrayCreate => "array:create",
            EventKind::ArrayRead => "array:read",
            EventKind::ArrayMethod => "array:method",
            EventKind::LoopEnter => "loop:enter",
            EventKind::LoopIteration => "loop:iteration",
            EventKind::LoopExit => "loop:exit",
            EventKind::FunctionCall => "function:call",
            EventKind::FunctionReturn => "function:return",
            EventKind::Error => "error",
            EventKind::Other(name) => name,
        }
    }

    /// Parses a wire name, falling back to [`EventKind::Other`] for names
    /// outside the known set.
    pub fn from_name(name: &str) -> EventKind {
        match name {
            "variable:declare" => EventKind::VariableDeclare,
            "variable:assign" => EventKind::VariableAssign,
            "array:write" => EventKind::ArrayWrite,
            "compare" => EventKind::Compare,
            "swap" => EventKind::Swap,
            "array:create" => EventKind::ArrayCreate,
            "array:read" => EventKind::ArrayRead,
            "array:method" => EventKind::ArrayMethod,
            "loop:enter" => EventKind::LoopEnter,
            "loop:iteration" => EventKind::LoopIteration,
            "loop:exit" => EventKind::LoopExit,
            "function:call" => EventKind::FunctionCall,
            "function:return" => EventKind::FunctionReturn,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }

    /// Whether this kind is part of the known probe vocabulary.
    pub fn is_known(&self) -> bool {
        !matches!(self, EventKind::Other(_))
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for EventKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KindVisitor;

        impl Visitor<'_> for KindVisitor {
            type Value = EventKind;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an event kind string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<EventKind, E> {
                Ok(EventKind::from_name(v))
            }
        }

        deserializer.deserialize_str(KindVisitor)
    }
}

/// One observed state change.
///
/// `id` is assigned by the trace runtime at emission time (never by the
/// transformer) and is strictly increasing from 0 within a trace.
/// `timestamp_ms` is elapsed milliseconds since the start of the run and is
/// monotonically non-decreasing. Payload values are structural snapshots of
/// the state at the moment of emission; mutating the original structure
/// afterwards never changes a recorded event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub id: u64,
    #[serde(rename = "timestamp")]
    pub timestamp_ms: u64,
    pub kind: EventKind,
    pub payload: Payload,
}

// Payload constructors -- one per probe shape, preserving field order.

/// `{name, value}` payload for declarations and whole-variable assignments.
pub fn named_value_payload(name: &str, value: Json) -> Payload {
    let mut payload = Payload::new();
    payload.insert("name".to_string(), Json::String(name.to_string()));
    payload.insert("value".to_string(), value);
    payload
}

/// `{name, index, value}` payload for indexed array writes.
pub fn array_write_payload(name: &str, index: Json, value: Json) -> Payload {
    let mut payload = Payload::new();
    payload.insert("name".to_string(), Json::String(name.to_string()));
    payload.insert("index".to_string(), index);
    payload.insert("value".to_string(), value);
    payload
}

/// `{indices: [i, j]}` payload for comparison probes.
pub fn indices_payload(i: Json, j: Json) -> Payload {
    let mut payload = Payload::new();
    payload.insert("indices".to_string(), Json::Array(vec![i, j]));
    payload
}

/// `{name, indices: [i, j]}` payload for swap probes.
pub fn swap_payload(name: &str, i: Json, j: Json) -> Payload {
    let mut payload = Payload::new();
    payload.insert("name".to_string(), Json::String(name.to_string()));
    payload.insert("indices".to_string(), Json::Array(vec![i, j]));
    payload
}

/// `{message}` payload for the error event appended on a fault.
pub fn error_payload(message: &str) -> Payload {
    let mut payload = Payload::new();
    payload.insert("message".to_string(), Json::String(message.to_string()));
    payload
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_wire_names_roundtrip() {
        let kinds = [
            EventKind::VariableDeclare,
            EventKind::VariableAssign,
            EventKind::ArrayWrite,
            EventKind::Compare,
            EventKind::Swap,
            EventKind::ArrayCreate,
            EventKind::ArrayRead,
            EventKind::ArrayMethod,
            EventKind::LoopEnter,
            EventKind::LoopIteration,
            EventKind::LoopExit,
            EventKind::FunctionCall,
            EventKind::FunctionReturn,
            EventKind::Error,
        ];
        for kind in kinds {
            assert_eq!(EventKind::from_name(kind.as_str()), kind);
            assert!(kind.is_known());
        }
    }

    #[test]
    fn unknown_kind_is_preserved_opaquely() {
        let kind = EventKind::from_name("gpu:upload");
        assert_eq!(kind, EventKind::Other("gpu:upload".to_string()));
        assert!(!kind.is_known());
        assert_eq!(kind.as_str(), "gpu:upload");
    }

    #[test]
    fn kind_serde_uses_wire_string() {
        let json = serde_json::to_string(&EventKind::VariableDeclare).unwrap();
        assert_eq!(json, "\"variable:declare\"");

        let back: EventKind = serde_json::from_str("\"array:write\"").unwrap();
        assert_eq!(back, EventKind::ArrayWrite);

        let future: EventKind = serde_json::from_str("\"heap:snapshot\"").unwrap();
        assert_eq!(future, EventKind::Other("heap:snapshot".to_string()));
    }

    #[test]
    fn event_serde_roundtrip() {
        let event = TraceEvent {
            id: 3,
            timestamp_ms: 12,
            kind: EventKind::ArrayWrite,
            payload: array_write_payload("a", json!(1), json!(7)),
        };
        let text = serde_json::to_string(&event).unwrap();
        let back: TraceEvent = serde_json::from_str(&text).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn payload_field_order_is_stable() {
        let payload = array_write_payload("a", json!(0), json!([2, 1]));
        let keys: Vec<&str> = payload.keys().map(String::as_str).collect();
        assert_eq!(keys, ["name", "index", "value"]);

        let text = serde_json::to_string(&payload).unwrap();
        assert_eq!(text, r#"{"name":"a","index":0,"value":[2,1]}"#);
    }

    #[test]
    fn indices_payload_shape() {
        let payload = indices_payload(json!(2), json!(5));
        assert_eq!(payload.get("indices"), Some(&json!([2, 5])));
    }
}
