//! Builtin classes.
//!
//! One class object per builtin type, created once per process. Scalars and
//! containers report these through [`Value::class_of`](super::Value::class_of),
//! so `isinstance` and the nominal checks treat builtins and user classes
//! alike (`bool` is a subclass of `int`, every class is a subclass of
//! `object`).

use std::sync::LazyLock;

use rtg_ir::Name;

use super::class::{ClassKind, ClassObj, ClassRef};

/// Builtin types, bases declared before subclasses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BuiltinKind {
    Object,
    NoneType,
    NotImplementedType,
    EllipsisType,
    Int,
    Bool,
    Float,
    Complex,
    Str,
    Bytes,
    Tuple,
    FrozenSet,
    List,
    Dict,
    Set,
    Type,
    Function,
    Method,
    Generator,
    AsyncGenerator,
    Module,
    TypingForm,
    Descriptor,
    BaseException,
    Exception,
    ValueError,
    TypeError,
    RuntimeError,
    AttributeError,
    KeyError,
    NameError,
    NotImplementedError,
    StopIteration,
}

impl BuiltinKind {
    pub const ALL: [BuiltinKind; 33] = [
        BuiltinKind::Object,
        BuiltinKind::NoneType,
        BuiltinKind::NotImplementedType,
        BuiltinKind::EllipsisType,
        BuiltinKind::Int,
        BuiltinKind::Bool,
        BuiltinKind::Float,
        BuiltinKind::Complex,
        BuiltinKind::Str,
        BuiltinKind::Bytes,
        BuiltinKind::Tuple,
        BuiltinKind::FrozenSet,
        BuiltinKind::List,
        BuiltinKind::Dict,
        BuiltinKind::Set,
        BuiltinKind::Type,
        BuiltinKind::Function,
        BuiltinKind::Method,
        BuiltinKind::Generator,
        BuiltinKind::AsyncGenerator,
        BuiltinKind::Module,
        BuiltinKind::TypingForm,
        BuiltinKind::Descriptor,
        BuiltinKind::BaseException,
        BuiltinKind::Exception,
        BuiltinKind::ValueError,
        BuiltinKind::TypeError,
        BuiltinKind::RuntimeError,
        BuiltinKind::AttributeError,
        BuiltinKind::KeyError,
        BuiltinKind::NameError,
        BuiltinKind::NotImplementedError,
        BuiltinKind::StopIteration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            BuiltinKind::Object => "object",
            BuiltinKind::NoneType => "NoneType",
            BuiltinKind::NotImplementedType => "NotImplementedType",
            BuiltinKind::EllipsisType => "ellipsis",
            BuiltinKind::Int => "int",
            BuiltinKind::Bool => "bool",
            BuiltinKind::Float => "float",
            BuiltinKind::Complex => "complex",
            BuiltinKind::Str => "str",
            BuiltinKind::Bytes => "bytes",
            BuiltinKind::Tuple => "tuple",
            BuiltinKind::FrozenSet => "frozenset",
            BuiltinKind::List => "list",
            BuiltinKind::Dict => "dict",
            BuiltinKind::Set => "set",
            BuiltinKind::Type => "type",
            BuiltinKind::Function => "function",
            BuiltinKind::Method => "method",
            BuiltinKind::Generator => "generator",
            BuiltinKind::AsyncGenerator => "async_generator",
            BuiltinKind::Module => "module",
            BuiltinKind::TypingForm => "_SpecialForm",
            BuiltinKind::Descriptor => "method_descriptor",
            BuiltinKind::BaseException => "BaseException",
            BuiltinKind::Exception => "Exception",
            BuiltinKind::ValueError => "ValueError",
            BuiltinKind::TypeError => "TypeError",
            BuiltinKind::RuntimeError => "RuntimeError",
            BuiltinKind::AttributeError => "AttributeError",
            BuiltinKind::KeyError => "KeyError",
            BuiltinKind::NameError => "NameError",
            BuiltinKind::NotImplementedError => "NotImplementedError",
            BuiltinKind::StopIteration => "StopIteration",
        }
    }

    fn base(self) -> Option<BuiltinKind> {
        match self {
            BuiltinKind::Object => None,
            BuiltinKind::Bool => Some(BuiltinKind::Int),
            BuiltinKind::Exception | BuiltinKind::StopIteration => {
                Some(BuiltinKind::BaseException)
            }
            BuiltinKind::ValueError
            | BuiltinKind::TypeError
            | BuiltinKind::RuntimeError
            | BuiltinKind::AttributeError
            | BuiltinKind::KeyError
            | BuiltinKind::NameError => Some(BuiltinKind::Exception),
            BuiltinKind::NotImplementedError => Some(BuiltinKind::RuntimeError),
            _ => Some(BuiltinKind::Object),
        }
    }

    /// Names bound in the builtin scope (internal types are not exposed).
    pub fn is_public(self) -> bool {
        !matches!(
            self,
            BuiltinKind::NoneType
                | BuiltinKind::NotImplementedType
                | BuiltinKind::EllipsisType
                | BuiltinKind::Function
                | BuiltinKind::Method
                | BuiltinKind::Generator
                | BuiltinKind::AsyncGenerator
                | BuiltinKind::Module
                | BuiltinKind::TypingForm
                | BuiltinKind::Descriptor
        )
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

static TABLE: LazyLock<Vec<ClassRef>> = LazyLock::new(|| {
    let builtins = Name::intern("builtins");
    let mut table: Vec<ClassRef> = Vec::with_capacity(BuiltinKind::ALL.len());
    for kind in BuiltinKind::ALL {
        let bases = kind
            .base()
            .map(|base| vec![table[base.index()].clone()])
            .unwrap_or_default();
        let class = ClassObj::new(
            Name::intern(kind.name()),
            builtins,
            bases,
            ClassKind::Builtin(kind),
        );
        table.push(ClassRef::new(class));
    }
    table
});

/// The class object of a builtin type.
pub fn builtin_class(kind: BuiltinKind) -> ClassRef {
    TABLE[kind.index()].clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_discriminants() {
        for (i, kind) in BuiltinKind::ALL.iter().enumerate() {
            assert_eq!(kind.index(), i);
            assert_eq!(builtin_class(*kind).name.as_str(), kind.name());
        }
    }

    #[test]
    fn test_bool_is_subclass_of_int() {
        let bool_class = builtin_class(BuiltinKind::Bool);
        assert!(bool_class.is_subclass_of(&builtin_class(BuiltinKind::Int)));
        assert!(!builtin_class(BuiltinKind::Int).is_subclass_of(&bool_class));
    }

    #[test]
    fn test_everything_is_an_object() {
        let object = builtin_class(BuiltinKind::Object);
        for kind in BuiltinKind::ALL {
            assert!(builtin_class(kind).is_subclass_of(&object));
        }
    }
}
