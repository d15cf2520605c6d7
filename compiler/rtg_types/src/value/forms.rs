//! Annotation objects: special forms, generic aliases, unions, type
//! variables and new-types.
//!
//! These are what annotation expressions evaluate to. The descriptor
//! builder turns them into [`TypeDesc`](crate::TypeDesc)s.

use std::fmt;

use rtg_ir::Name;

use super::builtins::BuiltinKind;
use super::Value;
use crate::errors::{not_subscriptable, RuntimeError, RuntimeResult};

/// The special forms of the `typing` module.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SpecialForm {
    Any,
    Union,
    Optional,
    Literal,
    Annotated,
    ClassVar,
    Final,
    Never,
    NoReturn,
    SelfType,
    Tuple,
    List,
    Dict,
    Set,
    FrozenSet,
    Type,
    Callable,
    Sequence,
    MutableSequence,
    Mapping,
    MutableMapping,
    AbstractSet,
    MutableSet,
    Collection,
    Iterable,
    Iterator,
    AsyncIterable,
    AsyncIterator,
    Generator,
    AsyncGenerator,
    Protocol,
    TypedDict,
    Generic,
}

impl SpecialForm {
    pub const ALL: [SpecialForm; 33] = [
        SpecialForm::Any,
        SpecialForm::Union,
        SpecialForm::Optional,
        SpecialForm::Literal,
        SpecialForm::Annotated,
        SpecialForm::ClassVar,
        SpecialForm::Final,
        SpecialForm::Never,
        SpecialForm::NoReturn,
        SpecialForm::SelfType,
        SpecialForm::Tuple,
        SpecialForm::List,
        SpecialForm::Dict,
        SpecialForm::Set,
        SpecialForm::FrozenSet,
        SpecialForm::Type,
        SpecialForm::Callable,
        SpecialForm::Sequence,
        SpecialForm::MutableSequence,
        SpecialForm::Mapping,
        SpecialForm::MutableMapping,
        SpecialForm::AbstractSet,
        SpecialForm::MutableSet,
        SpecialForm::Collection,
        SpecialForm::Iterable,
        SpecialForm::Iterator,
        SpecialForm::AsyncIterable,
        SpecialForm::AsyncIterator,
        SpecialForm::Generator,
        SpecialForm::AsyncGenerator,
        SpecialForm::Protocol,
        SpecialForm::TypedDict,
        SpecialForm::Generic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SpecialForm::Any => "Any",
            SpecialForm::Union => "Union",
            SpecialForm::Optional => "Optional",
            SpecialForm::Literal => "Literal",
            SpecialForm::Annotated => "Annotated",
            SpecialForm::ClassVar => "ClassVar",
            SpecialForm::Final => "Final",
            SpecialForm::Never => "Never",
            SpecialForm::NoReturn => "NoReturn",
            SpecialForm::SelfType => "Self",
            SpecialForm::Tuple => "Tuple",
            SpecialForm::List => "List",
            SpecialForm::Dict => "Dict",
            SpecialForm::Set => "Set",
            SpecialForm::FrozenSet => "FrozenSet",
            SpecialForm::Type => "Type",
            SpecialForm::Callable => "Callable",
            SpecialForm::Sequence => "Sequence",
            SpecialForm::MutableSequence => "MutableSequence",
            SpecialForm::Mapping => "Mapping",
            SpecialForm::MutableMapping => "MutableMapping",
            SpecialForm::AbstractSet => "AbstractSet",
            SpecialForm::MutableSet => "MutableSet",
            SpecialForm::Collection => "Collection",
            SpecialForm::Iterable => "Iterable",
            SpecialForm::Iterator => "Iterator",
            SpecialForm::AsyncIterable => "AsyncIterable",
            SpecialForm::AsyncIterator => "AsyncIterator",
            SpecialForm::Generator => "Generator",
            SpecialForm::AsyncGenerator => "AsyncGenerator",
            SpecialForm::Protocol => "Protocol",
            SpecialForm::TypedDict => "TypedDict",
            SpecialForm::Generic => "Generic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|form| form.name() == name)
    }

    /// Forms that cannot take parameters.
    fn is_bare(self) -> bool {
        matches!(
            self,
            SpecialForm::Any
                | SpecialForm::Never
                | SpecialForm::NoReturn
                | SpecialForm::SelfType
                | SpecialForm::TypedDict
        )
    }
}

/// A parameterized annotation such as `List[int]` or `Annotated[int, meta]`.
pub struct GenericAlias {
    /// The subscripted form or class.
    pub origin: Value,
    pub args: Vec<Value>,
    /// Side-channel metadata of `Annotated`.
    pub extras: Vec<Value>,
}

impl fmt::Display for GenericAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.origin.annotation_text())?;
        f.write_str("[")?;
        for (i, arg) in self.args.iter().chain(&self.extras).enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            match arg {
                Value::List(items) => {
                    let parts: Vec<String> =
                        items.read().iter().map(Value::annotation_text).collect();
                    write!(f, "[{}]", parts.join(", "))?;
                }
                Value::Tuple(items) if items.is_empty() => f.write_str("()")?,
                Value::Ellipsis => f.write_str("...")?,
                Value::Str(s) if is_literal_alias(&self.origin) => f.write_str(&rtg_ir::printer::quote(s))?,
                other => f.write_str(&other.annotation_text())?,
            }
        }
        f.write_str("]")
    }
}

fn is_literal_alias(origin: &Value) -> bool {
    matches!(origin, Value::Form(SpecialForm::Literal))
}

/// A union of annotations, flattened and without duplicates.
pub struct UnionObj {
    pub members: Vec<Value>,
}

impl fmt::Display for UnionObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.members.iter().map(Value::annotation_text).collect();
        write!(f, "Union[{}]", parts.join(", "))
    }
}

/// A `TypeVar`.
pub struct TypeVarObj {
    pub name: Name,
    pub bound: Option<Value>,
    pub constraints: Vec<Value>,
    pub covariant: bool,
    pub contravariant: bool,
}

/// A `NewType`: a distinct name for an existing type, identity at run time.
pub struct NewTypeObj {
    pub name: Name,
    pub supertype: Value,
}

/// Build a union: nested unions flatten, duplicates collapse, and a single
/// member stands for itself.
pub fn union_of(members: Vec<Value>) -> Value {
    let mut flat: Vec<Value> = Vec::with_capacity(members.len());
    for member in members {
        let nested = match &member {
            Value::Union(union) => union.members.clone(),
            _ => vec![member],
        };
        for item in nested {
            if !flat.iter().any(|m| m.equals(&item)) {
                flat.push(item);
            }
        }
    }
    match flat.len() {
        0 => Value::Form(SpecialForm::Never),
        1 => flat.swap_remove(0),
        _ => Value::union_raw(flat),
    }
}

/// `base[index]` where `base` is an annotation object.
pub fn subscript_annotation(base: &Value, index: &Value) -> RuntimeResult {
    let args = match index {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    match base {
        Value::Form(form) => subscript_form(*form, index, args),
        Value::Class(class) => match class.builtin_kind() {
            Some(
                BuiltinKind::List
                | BuiltinKind::Dict
                | BuiltinKind::Set
                | BuiltinKind::FrozenSet
                | BuiltinKind::Tuple
                | BuiltinKind::Type,
            )
            | None => Ok(Value::alias(base.clone(), args, Vec::new())),
            Some(_) => Err(not_subscriptable(base)),
        },
        // Re-parameterizing a user generic alias keeps the origin class.
        Value::Alias(alias) if matches!(alias.origin, Value::Class(_)) => {
            Ok(Value::alias(alias.origin.clone(), args, Vec::new()))
        }
        other => Err(not_subscriptable(other)),
    }
}

fn subscript_form(form: SpecialForm, index: &Value, args: Vec<Value>) -> RuntimeResult {
    if form.is_bare() {
        return Err(RuntimeError::new(format!(
            "{} is not a generic class",
            form.name()
        )));
    }
    match form {
        SpecialForm::Optional => {
            let [inner] = args.as_slice() else {
                return Err(RuntimeError::new(
                    "Optional[...] requires a single type argument",
                ));
            };
            Ok(union_of(vec![inner.clone(), Value::None]))
        }
        SpecialForm::Union => {
            if args.is_empty() {
                return Err(RuntimeError::new("Cannot take a Union of no types"));
            }
            Ok(union_of(args))
        }
        SpecialForm::Literal => {
            let mut flat = Vec::with_capacity(args.len());
            for arg in args {
                match arg {
                    Value::Alias(alias) if is_literal_alias(&alias.origin) => {
                        flat.extend(alias.args.iter().cloned());
                    }
                    other => flat.push(other),
                }
            }
            Ok(Value::alias(Value::Form(form), flat, Vec::new()))
        }
        SpecialForm::Annotated => {
            let mut args = args.into_iter();
            let (Some(inner), Some(first_extra)) = (args.next(), args.next()) else {
                return Err(RuntimeError::new(
                    "Annotated[...] should be used with at least two arguments",
                ));
            };
            let mut extras = vec![first_extra];
            extras.extend(args);
            Ok(Value::alias(Value::Form(form), vec![inner], extras))
        }
        // `Tuple[()]` spells the empty fixed tuple.
        SpecialForm::Tuple if matches!(index, Value::Tuple(items) if items.is_empty()) => {
            Ok(Value::alias(Value::Form(form), Vec::new(), Vec::new()))
        }
        _ => Ok(Value::alias(Value::Form(form), args, Vec::new())),
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::value::builtin_class;
    use pretty_assertions::assert_eq;

    fn int() -> Value {
        Value::Class(builtin_class(BuiltinKind::Int))
    }

    fn str_() -> Value {
        Value::Class(builtin_class(BuiltinKind::Str))
    }

    #[test]
    fn test_optional_becomes_union_with_none() {
        let opt = subscript_annotation(&Value::Form(SpecialForm::Optional), &int()).unwrap();
        let Value::Union(union) = &opt else {
            panic!("expected union, got {opt:?}");
        };
        assert_eq!(union.members.len(), 2);
        assert!(union.members[1].is(&Value::None));
        assert_eq!(union.to_string(), "Union[int, None]");
    }

    #[test]
    fn test_union_flattens_and_collapses() {
        let inner = union_of(vec![int(), str_()]);
        let outer = union_of(vec![inner, int()]);
        let Value::Union(union) = &outer else {
            panic!("expected union");
        };
        assert_eq!(union.members.len(), 2);
        let single = union_of(vec![int(), int()]);
        assert!(single.is(&int()));
    }

    #[test]
    fn test_literal_flattens_nested_literals() {
        let literal = Value::Form(SpecialForm::Literal);
        let inner = subscript_annotation(&literal, &Value::int(1)).unwrap();
        let outer = subscript_annotation(
            &literal,
            &Value::tuple(vec![inner, Value::string("a")]),
        )
        .unwrap();
        assert_eq!(outer.repr(), "Literal[1, 'a']");
    }

    #[test]
    fn test_empty_tuple_index() {
        let empty = subscript_annotation(
            &Value::Form(SpecialForm::Tuple),
            &Value::tuple(Vec::new()),
        )
        .unwrap();
        let Value::Alias(alias) = &empty else {
            panic!("expected alias");
        };
        assert!(alias.args.is_empty());
    }

    #[test]
    fn test_annotated_splits_extras() {
        let annotated = subscript_annotation(
            &Value::Form(SpecialForm::Annotated),
            &Value::tuple(vec![int(), Value::string("meta")]),
        )
        .unwrap();
        let Value::Alias(alias) = &annotated else {
            panic!("expected alias");
        };
        assert_eq!(alias.args.len(), 1);
        assert_eq!(alias.extras.len(), 1);
    }

    #[test]
    fn test_bare_forms_reject_subscripts() {
        assert!(subscript_annotation(&Value::Form(SpecialForm::Any), &int()).is_err());
        assert!(subscript_annotation(&Value::int(3), &int()).is_err());
    }
}
