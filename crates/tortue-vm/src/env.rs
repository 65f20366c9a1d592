//! Environment and bindings for the Tortue VM.
//!
//! One namespace maps names to either a value or a procedure. Scoping is
//! dynamic: a call site snapshots the whole environment, the callee binds
//! its parameters over it, and the snapshot is reinstalled verbatim on
//! return, so nothing defined or mutated inside a call survives it.

use std::collections::HashMap;

use tortue_bytecode::{Procedure, Value};

/// What a name is bound to.
#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
    Value(Value),
    Proc(Procedure),
}

/// The runtime name table. An explicit value type so that save/restore at
/// call boundaries is an ordinary, testable operation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Env {
    names: HashMap<String, Binding>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.names.get(name)
    }

    /// Bind a value, shadowing any existing binding of the name.
    pub fn set_value(&mut self, name: String, value: Value) {
        self.names.insert(name, Binding::Value(value));
    }

    /// Install a procedure, shadowing any existing binding of its name.
    pub fn define_proc(&mut self, proc: Procedure) {
        self.names.insert(proc.name.clone(), Binding::Proc(proc));
    }

    /// A full copy of the current state, taken before a call.
    pub fn snapshot(&self) -> Env {
        self.clone()
    }

    /// Reinstall a snapshot verbatim, discarding the live state.
    pub fn restore(&mut self, snapshot: Env) {
        *self = snapshot;
    }

    /// Sorted view of the current bindings.
    pub fn names_snapshot(&self) -> Vec<(String, Binding)> {
        let mut v: Vec<(String, Binding)> = self
            .names
            .iter()
            .map(|(k, b)| (k.clone(), b.clone()))
            .collect();
        v.sort_by(|a, b| a.0.cmp(&b.0));
        v
    }
}
