//! Runtime values.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::Value as Json;
use tracelens_syntax::Stmt;

use super::error::RuntimeError;

/// Arrays deeper than this cannot be snapshotted; treated as a trap rather
/// than recursing forever on a self-referential array.
const MAX_SNAPSHOT_DEPTH: usize = 64;

/// A user-declared function. Bodies are cloned out of the parsed program so
/// the value owns everything it needs.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

/// A value inside the sandbox. Arrays are shared mutable cells, so aliased
/// bindings observe each other's writes the way the input language expects.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Function(Rc<FunctionDef>),
}

impl Value {
    pub fn array(elements: Vec<Value>) -> Value {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Array(_) => "array",
            Value::Function(_) => "function",
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            Value::Array(_) | Value::Function(_) => true,
        }
    }

    pub fn as_number(&self) -> Result<f64, RuntimeError> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(RuntimeError::type_error(format!(
                "expected a number, found {}",
                other.type_name()
            ))),
        }
    }

    /// Interprets this value as an array index: a non-negative integer.
    pub fn as_index(&self) -> Result<i64, RuntimeError> {
        let n = self.as_number()?;
        if n.fract() != 0.0 || !n.is_finite() {
            return Err(RuntimeError::type_error(format!(
                "array index must be an integer, found {n}"
            )));
        }
        Ok(n as i64)
    }

    /// Structural snapshot for the trace: the serialize half of the clone
    /// round-trip. Later mutation of this value cannot reach the snapshot.
    pub fn to_json(&self) -> Result<Json, RuntimeError> {
        self.to_json_bounded(0)
    }

    fn to_json_bounded(&self, depth: usize) -> Result<Json, RuntimeError> {
        if depth > MAX_SNAPSHOT_DEPTH {
            return Err(RuntimeError::type_error(
                "value is too deeply nested to snapshot",
            ));
        }
        Ok(match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Str(s) => Json::String(s.clone()),
            Value::Array(elements) => {
                let elements = elements.borrow();
                let mut out = Vec::with_capacity(elements.len());
                for element in elements.iter() {
                    out.push(element.to_json_bounded(depth + 1)?);
                }
                Json::Array(out)
            }
            Value::Function(def) => Json::String(format!("[function {}]", def.name)),
        })
    }

    /// Loose display form used for string concatenation.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Value::Str(s) => s.clone(),
            Value::Array(elements) => {
                let elements = elements.borrow();
                let parts: Vec<String> =
                    elements.iter().map(|v| v.to_display_string()).collect();
                parts.join(",")
            }
            Value::Function(def) => format!("[function {}]", def.name),
        }
    }

    /// Strict equality: same type, same value. Arrays and functions compare
    /// by identity.
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Integral finite floats serialize as JSON integers so trace payloads read
/// as `7` rather than `7.0`. Non-finite numbers have no JSON form and map
/// to null.
fn number_to_json(n: f64) -> Json {
    if n.is_finite() && n.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(&n) {
        Json::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integral_numbers_snapshot_as_json_integers() {
        assert_eq!(Value::Number(7.0).to_json().unwrap(), json!(7));
        assert_eq!(Value::Number(2.5).to_json().unwrap(), json!(2.5));
        assert_eq!(Value::Number(f64::INFINITY).to_json().unwrap(), Json::Null);
    }

    #[test]
    fn array_snapshot_is_structural() {
        let inner = Value::array(vec![Value::Number(1.0), Value::Number(2.0)]);
        let outer = Value::array(vec![inner.clone(), Value::Str("x".to_string())]);
        assert_eq!(outer.to_json().unwrap(), json!([[1, 2], "x"]));

        // Mutating after the snapshot leaves the snapshot untouched.
        let snapshot = outer.to_json().unwrap();
        if let Value::Array(cell) = &inner {
            cell.borrow_mut().push(Value::Number(3.0));
        }
        assert_eq!(snapshot, json!([[1, 2], "x"]));
    }

    #[test]
    fn self_referential_array_traps_instead_of_recursing() {
        let cell = Rc::new(RefCell::new(Vec::new()));
        cell.borrow_mut().push(Value::Array(Rc::clone(&cell)));
        let value = Value::Array(cell);
        assert!(matches!(
            value.to_json(),
            Err(RuntimeError::TypeError { .. })
        ));
    }

    #[test]
    fn truthiness_follows_the_input_language() {
        assert!(!Value::Null.truthy());
        assert!(!Value::Number(0.0).truthy());
        assert!(!Value::Str(String::new()).truthy());
        assert!(Value::Number(-1.0).truthy());
        assert!(Value::array(vec![]).truthy());
    }

    #[test]
    fn arrays_compare_by_identity() {
        let a = Value::array(vec![Value::Number(1.0)]);
        let b = Value::array(vec![Value::Number(1.0)]);
        assert!(a.strict_eq(&a.clone()));
        assert!(!a.strict_eq(&b));
    }

    #[test]
    fn index_must_be_a_non_fractional_number() {
        assert_eq!(Value::Number(3.0).as_index().unwrap(), 3);
        assert!(Value::Number(1.5).as_index().is_err());
        assert!(Value::Str("0".to_string()).as_index().is_err());
    }
}
