//! Scope stack for the interpreter.
//!
//! Blocks push plain scopes; function calls push a frame boundary so a
//! callee sees its own scopes plus globals, never the caller's locals.

use indexmap::IndexMap;

use super::error::RuntimeError;
use super::value::Value;

#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub constant: bool,
}

#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<IndexMap<String, Binding>>,
    /// Index of the first scope visible to the current call frame.
    frame_bases: Vec<usize>,
}

impl Scopes {
    pub fn new() -> Self {
        Scopes {
            scopes: vec![IndexMap::new()],
            frame_bases: vec![0],
        }
    }

    pub fn push(&mut self) {
        self.scopes.push(IndexMap::new());
    }

    pub fn pop(&mut self) {
        self.scopes.pop();
    }

    pub fn push_frame(&mut self) {
        self.frame_bases.push(self.scopes.len());
        self.scopes.push(IndexMap::new());
    }

    pub fn pop_frame(&mut self) {
        let base = self.frame_bases.pop().unwrap_or(0);
        self.scopes.truncate(base);
    }

    fn frame_base(&self) -> usize {
        *self.frame_bases.last().unwrap_or(&0)
    }

    /// Declares in the innermost scope. Redeclaration shadows silently, as
    /// the input language allows.
    pub fn declare(&mut self, name: &str, value: Value, constant: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), Binding { value, constant });
        }
    }

    /// Resolves a name: innermost scope outward to the frame base, then the
    /// global scope.
    fn resolve(&mut self, name: &str) -> Option<&mut Binding> {
        let base = self.frame_base();
        let global_has = self.scopes[0].contains_key(name);
        let mut found = None;
        for (i, scope) in self.scopes.iter().enumerate().rev() {
            if i < base {
                break;
            }
            if scope.contains_key(name) {
                found = Some(i);
                break;
            }
        }
        let index = found.or(if global_has { Some(0) } else { None })?;
        self.scopes[index].get_mut(name)
    }

    pub fn get(&mut self, name: &str) -> Result<Value, RuntimeError> {
        self.resolve(name)
            .map(|binding| binding.value.clone())
            .ok_or_else(|| RuntimeError::UndefinedVariable {
                name: name.to_string(),
            })
    }

    pub fn assign(&mut self, name: &str, value: Value) -> Result<(), RuntimeError> {
        match self.resolve(name) {
            Some(binding) if binding.constant => Err(RuntimeError::AssignToConst {
                name: name.to_string(),
            }),
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(RuntimeError::UndefinedVariable {
                name: name.to_string(),
            }),
        }
    }
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::new()
    }
}
