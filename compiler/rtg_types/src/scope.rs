//! Lexical scopes as seen by annotation resolution.
//!
//! The host owns its environments; checking only needs to look names up in
//! the scope a function or class was defined in. A [`ScopeRef`] is that view.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use rtg_ir::Name;

use crate::value::Value;

/// Read access to a host scope.
pub trait NameLookup: Send + Sync {
    /// Look a name up in this scope and its parents.
    fn lookup(&self, name: Name) -> Option<Value>;

    /// Dotted name of the module or function owning the scope.
    fn scope_name(&self) -> Name;
}

/// Shared handle to a host scope.
pub type ScopeRef = Arc<dyn NameLookup>;

/// A scope compared and hashed by identity.
///
/// Used inside descriptors and as part of resolution-cache keys: two
/// deferred references with the same text resolve differently in different
/// scopes.
#[derive(Clone)]
pub struct ScopeHandle(pub ScopeRef);

impl ScopeHandle {
    pub fn new(scope: ScopeRef) -> Self {
        ScopeHandle(scope)
    }

    /// Identity key of the underlying scope.
    pub fn key(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub fn lookup(&self, name: Name) -> Option<Value> {
        self.0.lookup(name)
    }
}

impl PartialEq for ScopeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for ScopeHandle {}

impl Hash for ScopeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for ScopeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ScopeHandle({})", self.0.scope_name())
    }
}

/// A fixed scope backed by a map. Used for builtins and in tests.
pub struct StaticScope {
    name: Name,
    entries: rustc_hash::FxHashMap<Name, Value>,
    parent: Option<ScopeRef>,
}

impl StaticScope {
    pub fn new(name: &str, entries: impl IntoIterator<Item = (Name, Value)>) -> Self {
        StaticScope {
            name: Name::intern(name),
            entries: entries.into_iter().collect(),
            parent: None,
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ScopeRef) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn into_ref(self) -> ScopeRef {
        Arc::new(self)
    }
}

impl NameLookup for StaticScope {
    fn lookup(&self, name: Name) -> Option<Value> {
        self.entries
            .get(&name)
            .cloned()
            .or_else(|| self.parent.as_ref().and_then(|p| p.lookup(name)))
    }

    fn scope_name(&self) -> Name {
        self.name
    }
}
