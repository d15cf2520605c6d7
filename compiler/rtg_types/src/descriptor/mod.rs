//! Type Descriptor Model.
//!
//! A [`TypeDesc`] is the canonical form of a declared annotation: an
//! [`Origin`] tag, positional parameter descriptors, and the opaque extras
//! attached through `Annotated`. Descriptors are built once from evaluated
//! annotation objects by [`build_descriptor`] and never mutated.
//!
//! # Parameters by origin
//!
//! | origin | parameters |
//! |---|---|
//! | `Union` | members, declaration order, at least two |
//! | `Sequence`, `Set`, `Iterable` | element |
//! | `Mapping` | key, value |
//! | `TupleFixed` | one per slot |
//! | `TupleHomogeneous` | element |
//! | `Callable` | argument types, then the return type |
//! | `TypeVar` | bound, or the constraints |
//! | `ClassOf`, `NewType` | the class / supertype |
//! | `Lazy` | produced, accepted, final |
//!
//! Unparameterized containers carry no parameters and accept any elements.
//! Records and interfaces carry none either: their member descriptors are
//! built on demand by [`record_field_descriptors`] and
//! [`interface_member_descriptors`], which keeps self-referential classes
//! finite.

use std::fmt;
use std::hash::{Hash, Hasher};

use rtg_ir::{LazyKind, Name};

use crate::errors::UnsupportedAnnotationError;
use crate::scope::ScopeHandle;
use crate::value::{BuiltinKind, ClassKind, ClassRef, MemberKind, SpecialForm, Value};

/// A literal value admitted by a `Literal[...]` annotation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl LiteralValue {
    fn from_value(value: &Value) -> Option<Self> {
        Some(match value {
            Value::None => LiteralValue::None,
            Value::Bool(b) => LiteralValue::Bool(*b),
            Value::Int(n) => LiteralValue::Int(*n),
            Value::Str(s) => LiteralValue::Str(s.to_string()),
            Value::Bytes(b) => LiteralValue::Bytes(b.to_vec()),
            _ => return None,
        })
    }

    /// Whether `value` is this literal.
    ///
    /// Booleans and integers never match each other: `Literal[True]`
    /// rejects `1`.
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (LiteralValue::None, Value::None) => true,
            (LiteralValue::Bool(a), Value::Bool(b)) => a == b,
            (LiteralValue::Int(a), Value::Int(b)) => a == b,
            (LiteralValue::Str(a), Value::Str(b)) => a.as_str() == b.as_str(),
            (LiteralValue::Bytes(a), Value::Bytes(b)) => a.as_slice() == b.as_slice(),
            _ => false,
        }
    }
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => f.write_str("None"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Int(n) => write!(f, "{n}"),
            LiteralValue::Str(s) => f.write_str(&rtg_ir::printer::quote(s)),
            LiteralValue::Bytes(b) => write!(
                f,
                "b{}",
                rtg_ir::printer::quote(&String::from_utf8_lossy(b))
            ),
        }
    }
}

/// Which sequence abstraction a `Sequence` descriptor names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SequenceKind {
    List,
    Sequence,
    MutableSequence,
    Collection,
}

/// Which mapping abstraction a `Mapping` descriptor names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MappingKind {
    Dict,
    Mapping,
    MutableMapping,
}

/// Which set abstraction a `Set` descriptor names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SetKind {
    Set,
    FrozenSet,
    AbstractSet,
    MutableSet,
}

/// Descriptor origin tag.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    Any,
    Never,
    /// `Self`, resolved against the class being checked.
    SelfType,
    /// Nominal `isinstance` check.
    Instance(ClassRef),
    /// A typed record class.
    Record(ClassRef),
    /// A structural interface class.
    Interface(ClassRef),
    Union,
    Literal(Vec<LiteralValue>),
    Sequence(SequenceKind),
    Mapping(MappingKind),
    Set(SetKind),
    TupleFixed,
    TupleHomogeneous,
    /// `arg_count` is `None` for `Callable[..., R]` and bare `Callable`.
    Callable { arg_count: Option<usize> },
    TypeVar { name: Name, bounded: bool },
    /// A reference to be resolved lazily, by source text, in `scope`.
    Deferred {
        source: Name,
        scope: Option<ScopeHandle>,
    },
    /// `Type[X]`: the value is a class.
    ClassOf,
    NewType(Name),
    /// `Iterable`/`Iterator` and their async forms.
    Iterable { is_async: bool },
    /// `Generator` / `AsyncGenerator`.
    Lazy(LazyKind),
}

/// Canonical form of a declared type.
#[derive(Clone, Debug)]
pub struct TypeDesc {
    pub origin: Origin,
    pub params: Vec<TypeDesc>,
    /// Metadata from `Annotated[...]`; ignored by the built-in checkers.
    pub extras: Vec<Value>,
}

impl TypeDesc {
    pub fn new(origin: Origin) -> Self {
        TypeDesc {
            origin,
            params: Vec::new(),
            extras: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: Vec<TypeDesc>) -> Self {
        self.params = params;
        self
    }

    pub fn any() -> Self {
        TypeDesc::new(Origin::Any)
    }

    pub fn never() -> Self {
        TypeDesc::new(Origin::Never)
    }

    /// A union; one member collapses to that member.
    pub fn union(mut members: Vec<TypeDesc>) -> Self {
        match members.len() {
            0 => TypeDesc::never(),
            1 => members.swap_remove(0),
            _ => TypeDesc::new(Origin::Union).with_params(members),
        }
    }

    pub fn instance(class: ClassRef) -> Self {
        TypeDesc::new(Origin::Instance(class))
    }

    pub fn deferred(source: &str, scope: Option<ScopeHandle>) -> Self {
        TypeDesc::new(Origin::Deferred {
            source: Name::intern(source),
            scope,
        })
    }

    pub fn is_any(&self) -> bool {
        self.origin == Origin::Any
    }

    pub fn is_never(&self) -> bool {
        self.origin == Origin::Never
    }

    /// Whether this names a lazily-produced sequence.
    pub fn lazy_kind(&self) -> Option<LazyKind> {
        match self.origin {
            Origin::Lazy(kind) => Some(kind),
            Origin::Iterable { is_async } => Some(if is_async {
                LazyKind::Async
            } else {
                LazyKind::Sync
            }),
            _ => None,
        }
    }

    /// Produced, accepted and final descriptors of a lazily-produced
    /// sequence annotation; missing parameters are `Any`.
    ///
    /// `Iterable[Y]` and `Iterator[Y]` produce `Y` and accept anything.
    pub fn lazy_components(&self) -> (TypeDesc, TypeDesc, TypeDesc) {
        let at = |i: usize| self.params.get(i).cloned().unwrap_or_else(TypeDesc::any);
        match self.origin {
            Origin::Lazy(_) => (at(0), at(1), at(2)),
            Origin::Iterable { .. } => (at(0), TypeDesc::any(), TypeDesc::any()),
            _ => (TypeDesc::any(), TypeDesc::any(), TypeDesc::any()),
        }
    }
}

impl PartialEq for TypeDesc {
    fn eq(&self, other: &Self) -> bool {
        self.origin == other.origin
            && self.params == other.params
            && self.extras.len() == other.extras.len()
            && self.extras.iter().zip(&other.extras).all(|(a, b)| a.equals(b))
    }
}

impl Eq for TypeDesc {}

impl Hash for TypeDesc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.origin.hash(state);
        self.params.hash(state);
        // Extras are opaque host values; equal descriptors still hash alike.
        self.extras.len().hash(state);
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = match &self.origin {
            Origin::Any => return f.write_str("Any"),
            Origin::Never => return f.write_str("Never"),
            Origin::SelfType => return f.write_str("Self"),
            Origin::Instance(class) if class.is_builtin(BuiltinKind::NoneType) => {
                return f.write_str("None");
            }
            Origin::Instance(class) | Origin::Record(class) | Origin::Interface(class) => {
                return f.write_str(&class.qualified_name());
            }
            Origin::Deferred { source, .. } => return f.write_str(source.as_str()),
            Origin::TypeVar { name, .. } => return write!(f, "~{name}"),
            Origin::NewType(name) => return f.write_str(name.as_str()),
            Origin::Literal(values) => {
                let parts: Vec<String> = values.iter().map(ToString::to_string).collect();
                return write!(f, "Literal[{}]", parts.join(", "));
            }
            Origin::Callable { arg_count } => {
                let Some((ret, args)) = self.params.split_last() else {
                    return f.write_str("Callable");
                };
                let args = match arg_count {
                    None => "...".to_string(),
                    Some(_) => {
                        let parts: Vec<String> = args.iter().map(ToString::to_string).collect();
                        format!("[{}]", parts.join(", "))
                    }
                };
                return write!(f, "Callable[{args}, {ret}]");
            }
            Origin::TupleFixed if self.params.is_empty() => return f.write_str("Tuple[()]"),
            Origin::TupleHomogeneous if !self.params.is_empty() => {
                return write!(f, "Tuple[{}, ...]", self.params[0]);
            }
            Origin::Union => "Union".into(),
            Origin::Sequence(kind) => format!("{kind:?}"),
            Origin::Mapping(kind) => format!("{kind:?}"),
            Origin::Set(kind) => format!("{kind:?}"),
            Origin::TupleFixed | Origin::TupleHomogeneous => "Tuple".into(),
            Origin::ClassOf => "Type".into(),
            Origin::Iterable { is_async: false } => "Iterable".into(),
            Origin::Iterable { is_async: true } => "AsyncIterable".into(),
            Origin::Lazy(LazyKind::Sync) => "Generator".into(),
            Origin::Lazy(LazyKind::Async) => "AsyncGenerator".into(),
        };
        f.write_str(&head)?;
        if self.params.is_empty() {
            return Ok(());
        }
        let parts: Vec<String> = self.params.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Build the descriptor of an evaluated annotation.
///
/// String annotations become deferred references without a scope.
pub fn build_descriptor(annotation: &Value) -> Result<TypeDesc, UnsupportedAnnotationError> {
    build_descriptor_in(annotation, None)
}

/// Build the descriptor of an evaluated annotation; string annotations
/// become deferred references resolved in `scope`.
pub fn build_descriptor_in(
    annotation: &Value,
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    rtg_ir::ensure_sufficient_stack(|| build(annotation, scope))
}

fn unsupported(annotation: &Value, reason: &str) -> UnsupportedAnnotationError {
    let text = annotation.annotation_text();
    tracing::debug!(annotation = %text, reason, "unsupported annotation");
    UnsupportedAnnotationError::new(text, reason)
}

fn build(
    annotation: &Value,
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    match annotation {
        Value::None => Ok(TypeDesc::instance(Value::None.class_of())),
        Value::Str(source) => Ok(TypeDesc::deferred(source, scope.cloned())),
        Value::Class(class) => Ok(class_descriptor(class)),
        Value::Form(form) => bare_form(*form, annotation),
        Value::Union(union) => {
            let members = union
                .members
                .iter()
                .map(|m| build(m, scope))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeDesc::union(members))
        }
        Value::TypeVar(tv) => {
            let (bounded, params) = match &tv.bound {
                Some(bound) => (true, vec![build(bound, scope)?]),
                None => (
                    false,
                    tv.constraints
                        .iter()
                        .map(|c| build(c, scope))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
            };
            Ok(TypeDesc::new(Origin::TypeVar {
                name: tv.name,
                bounded,
            })
            .with_params(params))
        }
        Value::NewType(nt) => Ok(TypeDesc::new(Origin::NewType(nt.name))
            .with_params(vec![build(&nt.supertype, scope)?])),
        Value::Alias(alias) => {
            build_alias(annotation, &alias.origin, &alias.args, &alias.extras, scope)
        }
        other => Err(unsupported(other, "not a type")),
    }
}

/// Descriptor of a class used directly as an annotation.
fn class_descriptor(class: &ClassRef) -> TypeDesc {
    match &class.kind {
        ClassKind::Builtin(kind) => match kind {
            BuiltinKind::List => TypeDesc::new(Origin::Sequence(SequenceKind::List)),
            BuiltinKind::Dict => TypeDesc::new(Origin::Mapping(MappingKind::Dict)),
            BuiltinKind::Set => TypeDesc::new(Origin::Set(SetKind::Set)),
            BuiltinKind::FrozenSet => TypeDesc::new(Origin::Set(SetKind::FrozenSet)),
            BuiltinKind::Tuple => TypeDesc::new(Origin::TupleHomogeneous),
            BuiltinKind::Type => TypeDesc::new(Origin::ClassOf),
            BuiltinKind::Object => TypeDesc::any(),
            _ => TypeDesc::instance(class.clone()),
        },
        ClassKind::Record(_) => TypeDesc::new(Origin::Record(class.clone())),
        ClassKind::Interface(_) => TypeDesc::new(Origin::Interface(class.clone())),
        ClassKind::Plain => TypeDesc::instance(class.clone()),
    }
}

fn bare_form(
    form: SpecialForm,
    annotation: &Value,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    Ok(TypeDesc::new(match form {
        SpecialForm::Any | SpecialForm::Final | SpecialForm::ClassVar => Origin::Any,
        SpecialForm::Never | SpecialForm::NoReturn => Origin::Never,
        SpecialForm::SelfType => Origin::SelfType,
        SpecialForm::Tuple => Origin::TupleHomogeneous,
        SpecialForm::List => Origin::Sequence(SequenceKind::List),
        SpecialForm::Sequence => Origin::Sequence(SequenceKind::Sequence),
        SpecialForm::MutableSequence => Origin::Sequence(SequenceKind::MutableSequence),
        SpecialForm::Collection => Origin::Sequence(SequenceKind::Collection),
        SpecialForm::Dict => Origin::Mapping(MappingKind::Dict),
        SpecialForm::Mapping => Origin::Mapping(MappingKind::Mapping),
        SpecialForm::MutableMapping => Origin::Mapping(MappingKind::MutableMapping),
        SpecialForm::Set => Origin::Set(SetKind::Set),
        SpecialForm::FrozenSet => Origin::Set(SetKind::FrozenSet),
        SpecialForm::AbstractSet => Origin::Set(SetKind::AbstractSet),
        SpecialForm::MutableSet => Origin::Set(SetKind::MutableSet),
        SpecialForm::Type => Origin::ClassOf,
        SpecialForm::Callable => Origin::Callable { arg_count: None },
        SpecialForm::Iterable | SpecialForm::Iterator => Origin::Iterable { is_async: false },
        SpecialForm::AsyncIterable | SpecialForm::AsyncIterator => {
            Origin::Iterable { is_async: true }
        }
        SpecialForm::Generator => Origin::Lazy(LazyKind::Sync),
        SpecialForm::AsyncGenerator => Origin::Lazy(LazyKind::Async),
        SpecialForm::Union
        | SpecialForm::Optional
        | SpecialForm::Literal
        | SpecialForm::Annotated => {
            return Err(unsupported(annotation, "requires type arguments"));
        }
        SpecialForm::Protocol | SpecialForm::TypedDict | SpecialForm::Generic => {
            return Err(unsupported(annotation, "only valid as a base class"));
        }
    }))
}

fn build_all(
    args: &[Value],
    scope: Option<&ScopeHandle>,
) -> Result<Vec<TypeDesc>, UnsupportedAnnotationError> {
    args.iter().map(|a| build(a, scope)).collect()
}

fn build_alias(
    annotation: &Value,
    origin: &Value,
    args: &[Value],
    extras: &[Value],
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    let form = match origin {
        Value::Form(form) => *form,
        Value::Class(class) => return class_alias(annotation, class, args, scope),
        _ => return Err(unsupported(annotation, "unknown generic origin")),
    };
    let expect = |n: usize| -> Result<Vec<TypeDesc>, UnsupportedAnnotationError> {
        if args.len() != n {
            return Err(unsupported(
                annotation,
                &format!("expected {n} type argument(s), got {}", args.len()),
            ));
        }
        build_all(args, scope)
    };
    let desc = match form {
        SpecialForm::Annotated => {
            let [inner] = args else {
                return Err(unsupported(annotation, "Annotated needs one type"));
            };
            let mut desc = build(inner, scope)?;
            desc.extras.extend(extras.iter().cloned());
            return Ok(desc);
        }
        SpecialForm::ClassVar | SpecialForm::Final => {
            let [inner] = args else {
                return Err(unsupported(annotation, "expected one type argument"));
            };
            return build(inner, scope);
        }
        SpecialForm::Literal => {
            let values = args
                .iter()
                .map(|v| {
                    LiteralValue::from_value(v).ok_or_else(|| {
                        unsupported(
                            annotation,
                            &format!("illegal literal value: {}", v.repr()),
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            TypeDesc::new(Origin::Literal(values))
        }
        SpecialForm::Union | SpecialForm::Optional => TypeDesc::union(build_all(args, scope)?),
        SpecialForm::Tuple => tuple_descriptor(annotation, args, scope)?,
        SpecialForm::List
        | SpecialForm::Sequence
        | SpecialForm::MutableSequence
        | SpecialForm::Collection
        | SpecialForm::Set
        | SpecialForm::FrozenSet
        | SpecialForm::AbstractSet
        | SpecialForm::MutableSet => bare_form(form, annotation)?.with_params(expect(1)?),
        SpecialForm::Dict | SpecialForm::Mapping | SpecialForm::MutableMapping => {
            bare_form(form, annotation)?.with_params(expect(2)?)
        }
        SpecialForm::Type => TypeDesc::new(Origin::ClassOf).with_params(expect(1)?),
        SpecialForm::Callable => callable_descriptor(annotation, args, scope)?,
        SpecialForm::Iterable
        | SpecialForm::Iterator
        | SpecialForm::AsyncIterable
        | SpecialForm::AsyncIterator => bare_form(form, annotation)?.with_params(expect(1)?),
        SpecialForm::Generator => bare_form(form, annotation)?.with_params(expect(3)?),
        SpecialForm::AsyncGenerator => bare_form(form, annotation)?.with_params(expect(2)?),
        SpecialForm::Protocol | SpecialForm::Generic => TypeDesc::any(),
        SpecialForm::Any
        | SpecialForm::Never
        | SpecialForm::NoReturn
        | SpecialForm::SelfType
        | SpecialForm::TypedDict => {
            return Err(unsupported(annotation, "does not take type arguments"));
        }
    };
    Ok(desc)
}

/// `list[int]`, `dict[str, int]`, `tuple[int, ...]`, `type[C]`, or a
/// parameterized user generic (checked nominally).
fn class_alias(
    annotation: &Value,
    class: &ClassRef,
    args: &[Value],
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    let form = match class.builtin_kind() {
        Some(BuiltinKind::List) => SpecialForm::List,
        Some(BuiltinKind::Dict) => SpecialForm::Dict,
        Some(BuiltinKind::Set) => SpecialForm::Set,
        Some(BuiltinKind::FrozenSet) => SpecialForm::FrozenSet,
        Some(BuiltinKind::Tuple) => SpecialForm::Tuple,
        Some(BuiltinKind::Type) => SpecialForm::Type,
        _ => return Ok(class_descriptor(class)),
    };
    build_alias(annotation, &Value::Form(form), args, &[], scope)
}

fn tuple_descriptor(
    annotation: &Value,
    args: &[Value],
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    match args {
        [] => Ok(TypeDesc::new(Origin::TupleFixed)),
        [elem, Value::Ellipsis] => {
            Ok(TypeDesc::new(Origin::TupleHomogeneous).with_params(vec![build(elem, scope)?]))
        }
        _ if args.iter().any(|a| matches!(a, Value::Ellipsis)) => Err(unsupported(
            annotation,
            "'...' is only allowed as the second of two arguments",
        )),
        _ => Ok(TypeDesc::new(Origin::TupleFixed).with_params(build_all(args, scope)?)),
    }
}

fn callable_descriptor(
    annotation: &Value,
    args: &[Value],
    scope: Option<&ScopeHandle>,
) -> Result<TypeDesc, UnsupportedAnnotationError> {
    let [params, ret] = args else {
        return Err(unsupported(
            annotation,
            "Callable must be used as Callable[[arg, ...], result]",
        ));
    };
    let ret = build(ret, scope)?;
    match params {
        Value::Ellipsis => {
            Ok(TypeDesc::new(Origin::Callable { arg_count: None }).with_params(vec![ret]))
        }
        Value::List(items) => {
            let mut descs = build_all(&items.read(), scope)?;
            let arg_count = Some(descs.len());
            descs.push(ret);
            Ok(TypeDesc::new(Origin::Callable { arg_count }).with_params(descs))
        }
        _ => Err(unsupported(
            annotation,
            "Callable's first argument must be a list of types or '...'",
        )),
    }
}

/// Field descriptors of a record class, in field order.
///
/// Deferred field annotations resolve in the scope the class was defined
/// in.
pub fn record_field_descriptors(
    class: &ClassRef,
) -> Result<Vec<TypeDesc>, UnsupportedAnnotationError> {
    let Some(def) = class.record() else {
        return Ok(Vec::new());
    };
    let scope = class.scope.clone().map(ScopeHandle::new);
    def.fields
        .iter()
        .map(|field| build_descriptor_in(&field.annotation, scope.as_ref()))
        .collect()
}

/// Declared data-attribute descriptors of an interface class, paired with
/// the member names. Methods and unannotated attributes are omitted.
pub fn interface_member_descriptors(
    class: &ClassRef,
) -> Result<Vec<(Name, TypeDesc)>, UnsupportedAnnotationError> {
    let Some(def) = class.interface() else {
        return Ok(Vec::new());
    };
    let scope = class.scope.clone().map(ScopeHandle::new);
    let mut out = Vec::new();
    for member in &def.members {
        if let MemberKind::Attribute {
            annotation: Some(annotation),
        } = &member.kind
        {
            out.push((member.name, build_descriptor_in(annotation, scope.as_ref())?));
        }
    }
    Ok(out)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
