//! Lexical environments.
//!
//! Every module, function call and class body gets a frame; frames link to
//! the frame they were created in. Frames are shared across threads (the
//! body of a lazily-produced sequence runs on its own thread), so bindings
//! live behind a `parking_lot` lock.
//!
//! Functions defined inside a class body close over the nearest enclosing
//! module or function frame, never the class frame: class attributes are
//! reached through the class object, not by bare name.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use rtg_ir::Name;
use rtg_types::{NameLookup, ScopeHandle, ScopeRef, Value};

/// What created a frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Builtins,
    Module,
    Function,
    Class,
}

/// Bindings in definition order.
#[derive(Default)]
struct Bindings {
    values: FxHashMap<Name, Value>,
    order: Vec<Name>,
}

struct Frame {
    name: Name,
    kind: FrameKind,
    bindings: RwLock<Bindings>,
    parent: Option<Environment>,
}

impl NameLookup for Frame {
    fn lookup(&self, name: Name) -> Option<Value> {
        if let Some(value) = self.bindings.read().values.get(&name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    fn scope_name(&self) -> Name {
        self.name
    }
}

/// Shared handle to a frame.
#[derive(Clone)]
pub struct Environment(Arc<Frame>);

impl Environment {
    fn new(name: Name, kind: FrameKind, parent: Option<Environment>) -> Self {
        Environment(Arc::new(Frame {
            name,
            kind,
            bindings: RwLock::new(Bindings::default()),
            parent,
        }))
    }

    /// The root frame holding builtin names.
    pub fn builtins(entries: impl IntoIterator<Item = (Name, Value)>) -> Self {
        let env = Environment::new(Name::intern("builtins"), FrameKind::Builtins, None);
        for (name, value) in entries {
            env.define(name, value);
        }
        env
    }

    /// A module's global frame.
    pub fn module(name: Name, builtins: &Environment) -> Self {
        Environment::new(name, FrameKind::Module, Some(builtins.clone()))
    }

    /// The frame of one call of the function `name`.
    #[must_use]
    pub fn function_child(&self, name: Name) -> Self {
        Environment::new(name, FrameKind::Function, Some(self.clone()))
    }

    /// The frame a class body executes in.
    #[must_use]
    pub fn class_child(&self, name: Name) -> Self {
        Environment::new(name, FrameKind::Class, Some(self.clone()))
    }

    pub fn name(&self) -> Name {
        self.0.name
    }

    pub fn kind(&self) -> FrameKind {
        self.0.kind
    }

    /// Bind `name` in this frame, keeping its first definition position.
    pub fn define(&self, name: Name, value: Value) {
        let mut bindings = self.0.bindings.write();
        if bindings.values.insert(name, value).is_none() {
            bindings.order.push(name);
        }
    }

    /// Look `name` up in this frame only.
    pub fn get_local(&self, name: Name) -> Option<Value> {
        self.0.bindings.read().values.get(&name).cloned()
    }

    /// Look `name` up in this frame and its parents.
    pub fn lookup(&self, name: Name) -> Option<Value> {
        self.0.lookup(name)
    }

    /// This frame's bindings in definition order.
    pub fn bindings(&self) -> Vec<(Name, Value)> {
        let bindings = self.0.bindings.read();
        bindings
            .order
            .iter()
            .filter_map(|name| bindings.values.get(name).map(|v| (*name, v.clone())))
            .collect()
    }

    /// The frame functions defined here close over.
    #[must_use]
    pub fn closure_scope(&self) -> Environment {
        let mut env = self;
        while env.kind() == FrameKind::Class {
            match &env.0.parent {
                Some(parent) => env = parent,
                None => break,
            }
        }
        env.clone()
    }

    /// This frame as a resolution scope.
    pub fn scope_ref(&self) -> ScopeRef {
        self.0.clone()
    }

    pub fn scope_handle(&self) -> ScopeHandle {
        ScopeHandle::new(self.scope_ref())
    }

    pub fn ptr_eq(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.0.name)
            .field("kind", &self.0.kind)
            .field("bindings", &self.0.bindings.read().order.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests;
