//! Lexical environments.
//!
//! One global scope per script run plus one scope per active function call.
//! Lookups check the innermost call scope and then the globals; function
//! bodies do not see the scopes of their callers.

use std::collections::HashMap;

use super::value::{Builtin, Value};

/// Accessor names bound per run. Together with the [`Builtin`] functions
/// these can never be assigned, defined or used as parameters.
const RESERVED_ACCESSORS: [&str; 4] = ["Owner", "Target", "Ruleset", "Self"];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_ACCESSORS.contains(&name) || Builtin::from_name(name).is_some()
}

#[derive(Debug, Default)]
pub struct Environment {
    globals: HashMap<String, Value>,
    frames: Vec<HashMap<String, Value>>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.frames
            .last()
            .and_then(|frame| frame.get(name))
            .or_else(|| self.globals.get(name))
    }

    /// Global bindings only, used to find event handlers after the top level ran.
    pub fn get_global(&self, name: &str) -> Option<&Value> {
        self.globals.get(name)
    }

    /// Bind in the innermost scope, shadowing any outer binding.
    pub fn define(&mut self, name: impl Into<String>, value: Value) {
        self.innermost().insert(name.into(), value);
    }

    /// Update an existing binding, otherwise define in the innermost scope.
    pub fn set(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.frames.last_mut().and_then(|frame| frame.get_mut(name)) {
            *slot = value;
            return;
        }
        if let Some(slot) = self.globals.get_mut(name) {
            *slot = value;
            return;
        }
        self.define(name, value);
    }

    pub fn push_frame(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop_frame(&mut self) {
        self.frames.pop();
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn innermost(&mut self) -> &mut HashMap<String, Value> {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.globals,
        }
    }
}
