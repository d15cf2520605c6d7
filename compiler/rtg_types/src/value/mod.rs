//! Runtime values of the host language.
//!
//! # Heap Enforcement
//!
//! Every heap allocation goes through a factory method on `Value`. The
//! [`Heap<T>`] wrapper has a module-private constructor, so external code
//! cannot build heap values directly:
//!
//! ```text
//! let s = Value::string("hello");             // OK
//! let list = Value::list(vec![]);             // OK
//! let s = Value::Str(Heap::new(...));         // ERROR: Heap::new is pub(super)
//! ```
//!
//! # Identity
//!
//! Mutable containers (list, dict, set) and all objects are shared cells;
//! cloning a `Value` clones the handle, never the object. [`Value::is`] is
//! object identity, [`Value::equals`] is value equality.
//!
//! # Thread Safety
//!
//! All heap types use `Arc` and `parking_lot` locks, so values cross the
//! thread boundary of generator bodies freely.

mod attr;
mod builtins;
mod call;
mod class;
mod forms;
mod function;
mod generator;
mod heap;

use std::fmt;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

pub use rtg_ir::Name;

pub use attr::{get_attribute, lookup_attribute, set_attribute};
pub use builtins::{builtin_class, BuiltinKind};
pub use call::{call_value, callable_signature, construct};
pub use class::{
    ClassKind, ClassObj, ClassRef, InstanceObj, InterfaceDef, MemberKind, MemberSig, RecordDef,
    RecordField,
};
pub use forms::{
    subscript_annotation, union_of, GenericAlias, NewTypeObj, SpecialForm, TypeVarObj, UnionObj,
};
pub use function::{
    BoundArguments, BoundMethod, CallArgs, FunctionMarks, FunctionValue, Invoke, NativeFn,
    PartialObj, PropertyObj, SigParam, Signature,
};
pub use generator::{GeneratorObj, LazySequence, Step};
pub use heap::Heap;

use crate::errors::{not_iterable, RuntimeError};
use crate::scope::ScopeRef;

/// A loaded module.
pub struct ModuleObj {
    pub name: Name,
    pub namespace: ScopeRef,
}

/// Runtime value.
#[derive(Clone)]
pub enum Value {
    // Singletons
    None,
    /// The sentinel returned by binary magic methods that decline an operand.
    NotImplemented,
    Ellipsis,

    // Scalars (inline)
    Bool(bool),
    Int(i64),
    Float(f64),

    // Immutable heap values
    Str(Heap<String>),
    Bytes(Heap<Vec<u8>>),
    Tuple(Heap<Vec<Value>>),
    FrozenSet(Heap<Vec<Value>>),

    // Mutable containers
    List(Heap<RwLock<Vec<Value>>>),
    /// Insertion-ordered key/value pairs.
    Dict(Heap<RwLock<Vec<(Value, Value)>>>),
    Set(Heap<RwLock<Vec<Value>>>),

    // Objects
    Class(ClassRef),
    Instance(Heap<InstanceObj>),
    Function(Heap<FunctionValue>),
    BoundMethod(Heap<BoundMethod>),
    Partial(Heap<PartialObj>),
    Generator(Heap<GeneratorObj>),
    Module(Heap<ModuleObj>),

    // Annotation objects
    TypeVar(Heap<TypeVarObj>),
    NewType(Heap<NewTypeObj>),
    Form(SpecialForm),
    Alias(Heap<GenericAlias>),
    Union(Heap<UnionObj>),

    // Method descriptors stored in class namespaces
    StaticMethod(Heap<Value>),
    ClassMethod(Heap<Value>),
    Property(Heap<PropertyObj>),
}

// Factory Methods (ONLY way to construct heap values)

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    pub fn bytes(b: impl Into<Vec<u8>>) -> Self {
        Value::Bytes(Heap::new(b.into()))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(RwLock::new(items)))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Heap::new(items))
    }

    pub fn dict(entries: Vec<(Value, Value)>) -> Self {
        let mut unique: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match unique.iter_mut().find(|(k, _)| k.equals(&key)) {
                Some(slot) => slot.1 = value,
                None => unique.push((key, value)),
            }
        }
        Value::Dict(Heap::new(RwLock::new(unique)))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Value::Set(Heap::new(RwLock::new(dedup(items))))
    }

    pub fn frozenset(items: Vec<Value>) -> Self {
        Value::FrozenSet(Heap::new(dedup(items)))
    }

    pub fn class(class: ClassObj) -> Self {
        Value::Class(ClassRef::new(class))
    }

    pub fn instance(class: ClassRef) -> Self {
        Value::Instance(Heap::new(InstanceObj {
            class,
            attrs: RwLock::new(FxHashMap::default()),
        }))
    }

    pub fn function(func: FunctionValue) -> Self {
        Value::Function(Heap::new(func))
    }

    /// A builtin implemented in Rust.
    pub fn native(name: &str, func: NativeFn) -> Self {
        Value::function(FunctionValue::native(name, func))
    }

    pub fn bound_method(receiver: Value, func: Value) -> Self {
        Value::BoundMethod(Heap::new(BoundMethod { receiver, func }))
    }

    pub fn partial(func: Value, args: Vec<Value>, keywords: Vec<(Name, Value)>) -> Self {
        Value::Partial(Heap::new(PartialObj {
            func,
            args,
            keywords,
        }))
    }

    pub fn generator(generator: GeneratorObj) -> Self {
        Value::Generator(Heap::new(generator))
    }

    pub fn module(name: Name, namespace: ScopeRef) -> Self {
        Value::Module(Heap::new(ModuleObj { name, namespace }))
    }

    pub fn type_var(type_var: TypeVarObj) -> Self {
        Value::TypeVar(Heap::new(type_var))
    }

    pub fn new_type(name: Name, supertype: Value) -> Self {
        Value::NewType(Heap::new(NewTypeObj { name, supertype }))
    }

    pub fn alias(origin: Value, args: Vec<Value>, extras: Vec<Value>) -> Self {
        Value::Alias(Heap::new(GenericAlias {
            origin,
            args,
            extras,
        }))
    }

    pub(crate) fn union_raw(members: Vec<Value>) -> Self {
        Value::Union(Heap::new(UnionObj { members }))
    }

    pub fn static_method(func: Value) -> Self {
        Value::StaticMethod(Heap::new(func))
    }

    pub fn class_method(func: Value) -> Self {
        Value::ClassMethod(Heap::new(func))
    }

    pub fn property(getter: Value, setter: Option<Value>) -> Self {
        Value::Property(Heap::new(PropertyObj { getter, setter }))
    }
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut unique: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|u| u.equals(&item)) {
            unique.push(item);
        }
    }
    unique
}

// Queries

impl Value {
    /// The class of this value.
    pub fn class_of(&self) -> ClassRef {
        let kind = match self {
            Value::None => BuiltinKind::NoneType,
            Value::NotImplemented => BuiltinKind::NotImplementedType,
            Value::Ellipsis => BuiltinKind::EllipsisType,
            Value::Bool(_) => BuiltinKind::Bool,
            Value::Int(_) => BuiltinKind::Int,
            Value::Float(_) => BuiltinKind::Float,
            Value::Str(_) => BuiltinKind::Str,
            Value::Bytes(_) => BuiltinKind::Bytes,
            Value::Tuple(_) => BuiltinKind::Tuple,
            Value::FrozenSet(_) => BuiltinKind::FrozenSet,
            Value::List(_) => BuiltinKind::List,
            Value::Dict(_) => BuiltinKind::Dict,
            Value::Set(_) => BuiltinKind::Set,
            Value::Instance(obj) => return obj.class.clone(),
            Value::Class(_) => BuiltinKind::Type,
            Value::Function(_) | Value::Partial(_) => BuiltinKind::Function,
            Value::BoundMethod(_) => BuiltinKind::Method,
            Value::Generator(g) => match g.kind {
                rtg_ir::LazyKind::Sync => BuiltinKind::Generator,
                rtg_ir::LazyKind::Async => BuiltinKind::AsyncGenerator,
            },
            Value::Module(_) => BuiltinKind::Module,
            Value::TypeVar(_)
            | Value::NewType(_)
            | Value::Form(_)
            | Value::Alias(_)
            | Value::Union(_) => BuiltinKind::TypingForm,
            Value::StaticMethod(_) | Value::ClassMethod(_) | Value::Property(_) => {
                BuiltinKind::Descriptor
            }
        };
        builtin_class(kind)
    }

    /// Short type name, as used in runtime error messages.
    pub fn type_name(&self) -> String {
        self.class_of().name.as_str().to_string()
    }

    /// Fully qualified type name, as used in type-check failure messages.
    ///
    /// Builtin types are unqualified and `None` is spelled `None`.
    pub fn qualified_type_name(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            _ => self.class_of().qualified_name(),
        }
    }

    /// Whether `self` is an instance of `class` (or one of its subclasses).
    pub fn is_instance_of(&self, class: &ClassRef) -> bool {
        self.class_of().is_subclass_of(class)
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Tuple(items) | Value::FrozenSet(items) => !items.is_empty(),
            Value::List(items) | Value::Set(items) => !items.read().is_empty(),
            Value::Dict(entries) => !entries.read().is_empty(),
            _ => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        match self {
            Value::Function(_)
            | Value::BoundMethod(_)
            | Value::Partial(_)
            | Value::Class(_)
            | Value::NewType(_) => true,
            Value::Instance(obj) => obj.class.lookup_attr(Name::intern("__call__")).is_some(),
            _ => false,
        }
    }

    #[inline]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[inline]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassRef> {
        match self {
            Value::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&FunctionValue> {
        match self {
            Value::Function(func) => Some(func),
            _ => None,
        }
    }

    /// Number of elements of a sized container.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.chars().count()),
            Value::Bytes(b) => Some(b.len()),
            Value::Tuple(items) | Value::FrozenSet(items) => Some(items.len()),
            Value::List(items) | Value::Set(items) => Some(items.read().len()),
            Value::Dict(entries) => Some(entries.read().len()),
            _ => None,
        }
    }

    /// Snapshot of the elements of an eager container, in iteration order.
    ///
    /// Dicts iterate their keys. Lazily-produced sequences are not eager and
    /// are driven by the host instead.
    pub fn iter_snapshot(&self) -> Result<Vec<Value>, RuntimeError> {
        match self {
            Value::Str(s) => Ok(s.chars().map(|c| Value::string(c.to_string())).collect()),
            Value::Bytes(b) => Ok(b.iter().map(|byte| Value::Int(i64::from(*byte))).collect()),
            Value::Tuple(items) | Value::FrozenSet(items) => Ok(items.to_vec()),
            Value::List(items) | Value::Set(items) => Ok(items.read().clone()),
            Value::Dict(entries) => Ok(entries.read().iter().map(|(k, _)| k.clone()).collect()),
            _ => Err(not_iterable(self)),
        }
    }

    /// Snapshot of a dict's entries.
    pub fn dict_entries(&self) -> Option<Vec<(Value, Value)>> {
        match self {
            Value::Dict(entries) => Some(entries.read().clone()),
            _ => None,
        }
    }

    /// Look a key up in a dict.
    pub fn dict_get(&self, key: &Value) -> Option<Value> {
        match self {
            Value::Dict(entries) => entries
                .read()
                .iter()
                .find(|(k, _)| k.equals(key))
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    /// Insert or replace a dict entry. Returns false for non-dicts.
    pub fn dict_set(&self, key: Value, value: Value) -> bool {
        let Value::Dict(entries) = self else {
            return false;
        };
        let mut entries = entries.write();
        match entries.iter_mut().find(|(k, _)| k.equals(&key)) {
            Some(slot) => slot.1 = value,
            None => entries.push((key, value)),
        }
        true
    }

    /// Append to a list. Returns false for non-lists.
    pub fn list_push(&self, value: Value) -> bool {
        let Value::List(items) = self else {
            return false;
        };
        items.write().push(value);
        true
    }

    /// Object identity (`is`).
    pub fn is(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None)
            | (Value::NotImplemented, Value::NotImplemented)
            | (Value::Ellipsis, Value::Ellipsis) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Form(a), Value::Form(b)) => a == b,
            (Value::Class(a), Value::Class(b)) => a == b,
            _ => match (self.heap_addr(), other.heap_addr()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    fn heap_addr(&self) -> Option<usize> {
        Some(match self {
            Value::Str(h) => h.addr(),
            Value::Bytes(h) => h.addr(),
            Value::Tuple(h) | Value::FrozenSet(h) => h.addr(),
            Value::List(h) | Value::Set(h) => h.addr(),
            Value::Dict(h) => h.addr(),
            Value::Class(c) => c.addr(),
            Value::Instance(h) => h.addr(),
            Value::Function(h) => h.addr(),
            Value::BoundMethod(h) => h.addr(),
            Value::Partial(h) => h.addr(),
            Value::Generator(h) => h.addr(),
            Value::Module(h) => h.addr(),
            Value::TypeVar(h) => h.addr(),
            Value::NewType(h) => h.addr(),
            Value::Alias(h) => h.addr(),
            Value::Union(h) => h.addr(),
            Value::StaticMethod(h) | Value::ClassMethod(h) => h.addr(),
            Value::Property(h) => h.addr(),
            _ => return None,
        })
    }

    /// Value equality (`==`).
    ///
    /// Numbers compare across bool, int and float. Containers compare
    /// element-wise. Everything else compares by identity.
    pub fn equals(&self, other: &Value) -> bool {
        rtg_ir::ensure_sufficient_stack(|| match (self, other) {
            (Value::Bool(_) | Value::Int(_), Value::Bool(_) | Value::Int(_)) => {
                self.as_int() == other.as_int()
            }
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Float(f), Value::Bool(_) | Value::Int(_))
            | (Value::Bool(_) | Value::Int(_), Value::Float(f)) => {
                let n = self.as_int().or_else(|| other.as_int()).unwrap_or_default();
                *f == int_to_float(n)
            }
            (Value::Str(a), Value::Str(b)) => **a == **b,
            (Value::Bytes(a), Value::Bytes(b)) => **a == **b,
            (Value::Tuple(a), Value::Tuple(b)) => seq_equals(a, b),
            (Value::List(a), Value::List(b)) => a.ptr_eq(b) || seq_equals(&a.read(), &b.read()),
            (Value::Set(_) | Value::FrozenSet(_), Value::Set(_) | Value::FrozenSet(_)) => {
                let (Ok(a), Ok(b)) = (self.iter_snapshot(), other.iter_snapshot()) else {
                    return false;
                };
                a.len() == b.len() && a.iter().all(|x| b.iter().any(|y| x.equals(y)))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if a.ptr_eq(b) {
                    return true;
                }
                let (a, b) = (a.read(), b.read());
                a.len() == b.len()
                    && a.iter().all(|(k, v)| {
                        b.iter()
                            .find(|(k2, _)| k.equals(k2))
                            .is_some_and(|(_, v2)| v.equals(v2))
                    })
            }
            (Value::Alias(a), Value::Alias(b)) => {
                a.origin.equals(&b.origin) && seq_equals(&a.args, &b.args)
            }
            (Value::Union(a), Value::Union(b)) => {
                a.members.len() == b.members.len()
                    && a.members.iter().all(|m| b.members.iter().any(|n| m.equals(n)))
            }
            _ => self.is(other),
        })
    }

    /// Text of a raised exception: `ValueError: message`.
    pub fn exception_text(&self) -> String {
        match self {
            Value::Instance(obj) => {
                let name = obj.class.name.as_str();
                match obj.attrs.read().get(&Name::intern("args")) {
                    Some(Value::Tuple(args)) if args.len() == 1 => {
                        format!("{name}: {}", args[0].display())
                    }
                    Some(Value::Tuple(args)) if !args.is_empty() => {
                        format!("{name}: {}", Value::Tuple(args.clone()).repr())
                    }
                    _ => name.to_string(),
                }
            }
            Value::Class(class) => class.name.as_str().to_string(),
            other => other.display(),
        }
    }

    /// `str()` of a value.
    pub fn display(&self) -> String {
        match self {
            Value::Str(s) => s.to_string(),
            other => other.repr(),
        }
    }

    /// `repr()` of a value.
    pub fn repr(&self) -> String {
        rtg_ir::ensure_sufficient_stack(|| match self {
            Value::None => "None".to_string(),
            Value::NotImplemented => "NotImplemented".to_string(),
            Value::Ellipsis => "Ellipsis".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => format!("{f:?}"),
            Value::Str(s) => rtg_ir::printer::quote(s),
            Value::Bytes(b) => format!("b{}", rtg_ir::printer::quote(&String::from_utf8_lossy(b))),
            Value::Tuple(items) => {
                if items.len() == 1 {
                    format!("({},)", items[0].repr())
                } else {
                    format!("({})", join_repr(items))
                }
            }
            Value::List(items) => format!("[{}]", join_repr(&items.read())),
            Value::Set(items) => {
                let items = items.read();
                if items.is_empty() {
                    "set()".to_string()
                } else {
                    format!("{{{}}}", join_repr(&items))
                }
            }
            Value::FrozenSet(items) => format!("frozenset({{{}}})", join_repr(items)),
            Value::Dict(entries) => {
                let parts: Vec<String> = entries
                    .read()
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k.repr(), v.repr()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Class(class) => format!("<class '{}'>", class.qualified_name()),
            Value::Instance(obj) => format!("<{} object>", obj.class.qualified_name()),
            Value::Function(func) => format!("<function {}>", func.qualname),
            Value::BoundMethod(method) => format!("<bound method {}>", method.func.repr()),
            Value::Partial(partial) => format!("functools.partial({})", partial.func.repr()),
            Value::Generator(g) => format!("<generator object {}>", g.qualname),
            Value::Module(m) => format!("<module '{}'>", m.name),
            Value::TypeVar(tv) => format!("~{}", tv.name),
            Value::NewType(nt) => nt.name.as_str().to_string(),
            Value::Form(form) => format!("typing.{}", form.name()),
            Value::Alias(alias) => alias.to_string(),
            Value::Union(union) => union.to_string(),
            Value::StaticMethod(_) => "<staticmethod>".to_string(),
            Value::ClassMethod(_) => "<classmethod>".to_string(),
            Value::Property(_) => "<property>".to_string(),
        })
    }

    /// Annotation-style spelling (`int`, `List[int]`, `None`).
    pub fn annotation_text(&self) -> String {
        match self {
            Value::None => "None".to_string(),
            Value::Class(class) => class.qualified_name(),
            Value::Form(form) => form.name().to_string(),
            Value::Str(s) => s.to_string(),
            other => other.repr(),
        }
    }
}

#[expect(clippy::cast_precision_loss, reason = "host float comparison semantics")]
pub(crate) fn int_to_float(n: i64) -> f64 {
    n as f64
}

fn seq_equals(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
}

fn join_repr(items: &[Value]) -> String {
    items.iter().map(Value::repr).collect::<Vec<_>>().join(", ")
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
