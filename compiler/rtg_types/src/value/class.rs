//! Class objects and instances.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use rtg_ir::Name;

use super::builtins::{builtin_class, BuiltinKind};
use super::heap::Heap;
use super::Value;
use crate::scope::ScopeRef;

/// One field of a typed record.
#[derive(Clone, Debug)]
pub struct RecordField {
    pub name: Name,
    /// Declared annotation, as evaluated (or a deferred string).
    pub annotation: Value,
    pub required: bool,
}

/// Field layout of a typed record class (a `TypedDict`).
#[derive(Clone, Debug, Default)]
pub struct RecordDef {
    pub fields: Vec<RecordField>,
    /// Whether fields are required unless marked otherwise.
    pub total: bool,
}

impl RecordDef {
    pub fn field(&self, name: &str) -> Option<&RecordField> {
        self.fields.iter().find(|f| f.name.as_str() == name)
    }
}

/// Shape of one declared interface member.
#[derive(Clone, Debug)]
pub enum MemberKind {
    /// A method; `positional` excludes the receiver.
    Method { positional: usize },
    /// A data attribute, with its declared annotation if any.
    Attribute { annotation: Option<Value> },
}

/// One declared member of a structural interface.
#[derive(Clone, Debug)]
pub struct MemberSig {
    pub name: Name,
    pub kind: MemberKind,
}

/// Member signatures of a structural interface (a `Protocol`), collected
/// once when the class is created.
#[derive(Clone, Debug, Default)]
pub struct InterfaceDef {
    pub members: Vec<MemberSig>,
    /// Strict interfaces also type-check attributes and reject extra public
    /// members.
    pub strict: bool,
}

/// What kind of class this is.
#[derive(Clone, Debug)]
pub enum ClassKind {
    Plain,
    Builtin(BuiltinKind),
    Record(RecordDef),
    Interface(InterfaceDef),
}

/// A class object.
pub struct ClassObj {
    pub name: Name,
    pub qualname: Name,
    pub module: Name,
    pub bases: Vec<ClassRef>,
    pub kind: ClassKind,
    pub doc: Option<Name>,
    /// Scope the class body was defined in; deferred field annotations
    /// resolve here.
    pub scope: Option<ScopeRef>,
    attrs: RwLock<Vec<(Name, Value)>>,
}

impl ClassObj {
    pub fn new(name: Name, module: Name, bases: Vec<ClassRef>, kind: ClassKind) -> Self {
        ClassObj {
            name,
            qualname: name,
            module,
            bases,
            kind,
            doc: None,
            scope: None,
            attrs: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_qualname(mut self, qualname: Name) -> Self {
        self.qualname = qualname;
        self
    }

    #[must_use]
    pub fn with_doc(mut self, doc: Option<Name>) -> Self {
        self.doc = doc;
        self
    }

    #[must_use]
    pub fn with_scope(mut self, scope: ScopeRef) -> Self {
        self.scope = Some(scope);
        self
    }

    #[must_use]
    pub fn with_attrs(self, attrs: Vec<(Name, Value)>) -> Self {
        *self.attrs.write() = attrs;
        self
    }
}

/// Shared handle to a class, compared and hashed by identity.
#[derive(Clone)]
pub struct ClassRef(Heap<ClassObj>);

impl ClassRef {
    pub(super) fn new(class: ClassObj) -> Self {
        ClassRef(Heap::new(class))
    }

    /// Identity key.
    pub fn addr(&self) -> usize {
        self.0.addr()
    }

    /// `module.Qualname`, or just the name for builtins.
    pub fn qualified_name(&self) -> String {
        let module = self.module.as_str();
        if module == "builtins" || module.is_empty() {
            self.qualname.as_str().to_string()
        } else {
            format!("{module}.{}", self.qualname)
        }
    }

    pub fn builtin_kind(&self) -> Option<BuiltinKind> {
        match self.kind {
            ClassKind::Builtin(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_builtin(&self, kind: BuiltinKind) -> bool {
        self.builtin_kind() == Some(kind)
    }

    pub fn record(&self) -> Option<&RecordDef> {
        match &self.kind {
            ClassKind::Record(def) => Some(def),
            _ => None,
        }
    }

    pub fn interface(&self) -> Option<&InterfaceDef> {
        match &self.kind {
            ClassKind::Interface(def) => Some(def),
            _ => None,
        }
    }

    /// Method resolution order: this class, its bases depth-first, `object`
    /// last.
    pub fn mro(&self) -> Vec<ClassRef> {
        let object = builtin_class(BuiltinKind::Object);
        let mut order = Vec::new();
        let mut pending = vec![self.clone()];
        while let Some(class) = pending.pop() {
            if class == object || order.contains(&class) {
                continue;
            }
            for base in class.bases.iter().rev() {
                pending.push(base.clone());
            }
            order.push(class);
        }
        order.push(object);
        order
    }

    pub fn is_subclass_of(&self, other: &ClassRef) -> bool {
        other.is_builtin(BuiltinKind::Object) || self.mro().contains(other)
    }

    /// Attribute defined directly on this class.
    pub fn own_attr(&self, name: Name) -> Option<Value> {
        self.attrs
            .read()
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.clone())
    }

    /// Attribute found along the method resolution order.
    pub fn lookup_attr(&self, name: Name) -> Option<Value> {
        self.mro().iter().find_map(|class| class.own_attr(name))
    }

    pub fn set_attr(&self, name: Name, value: Value) {
        let mut attrs = self.attrs.write();
        match attrs.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => attrs.push((name, value)),
        }
    }

    /// Attributes defined directly on this class, in definition order.
    pub fn own_attrs(&self) -> Vec<(Name, Value)> {
        self.attrs.read().clone()
    }
}

impl Deref for ClassRef {
    type Target = ClassObj;

    fn deref(&self) -> &ClassObj {
        &self.0
    }
}

impl PartialEq for ClassRef {
    fn eq(&self, other: &Self) -> bool {
        self.0.ptr_eq(&other.0)
    }
}

impl Eq for ClassRef {}

impl Hash for ClassRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<class '{}'>", self.qualified_name())
    }
}

/// An instance of a user class.
pub struct InstanceObj {
    pub class: ClassRef,
    pub attrs: RwLock<FxHashMap<Name, Value>>,
}

impl InstanceObj {
    pub fn get(&self, name: Name) -> Option<Value> {
        self.attrs.read().get(&name).cloned()
    }

    pub fn set(&self, name: Name, value: Value) {
        self.attrs.write().insert(name, value);
    }

    /// Names of the instance's own attributes.
    pub fn attr_names(&self) -> Vec<Name> {
        self.attrs.read().keys().copied().collect()
    }
}
