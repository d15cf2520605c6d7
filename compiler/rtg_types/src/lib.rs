//! rtguard types - runtime values and type descriptors.
//!
//! This crate holds everything the checker and the host share:
//! - `Value`: the dynamic value model, with classes, functions and
//!   lazily-produced sequences
//! - Annotation objects (`SpecialForm`, `GenericAlias`, `UnionObj`, ...)
//! - `TypeDesc`: the canonical descriptor of a declared type
//! - The annotation-string lexer and parser used to resolve deferred
//!   references
//! - `TypeCheckError`, `UnsupportedAnnotationError` and `RuntimeError`
//!
//! # Re-exports
//!
//! Error constructors are re-exported at the crate root for convenience
//! (canonical path is `rtg_types::errors::*`).

pub mod annotation;
pub mod descriptor;
pub mod errors;
pub mod scope;
pub mod value;

pub use annotation::{evaluate_annotation, parse_annotation, AnnExpr};
pub use descriptor::{
    build_descriptor, build_descriptor_in, interface_member_descriptors,
    record_field_descriptors, LiteralValue, MappingKind, Origin, SequenceKind, SetKind, TypeDesc,
};
pub use errors::{
    // Access errors
    attribute_not_found, index_out_of_range, key_not_found, name_not_found,
    // Call errors
    bad_arguments, not_callable,
    // Operation errors
    invalid_operation, not_iterable, not_subscriptable,
    // Control flow
    exhausted, raised,
    // Pipeline errors
    check_failed, import_failed, instrumentation_failed,
    // Types
    RuntimeError, RuntimeErrorKind, RuntimeResult, TypeCheckError, UnsupportedAnnotationError,
};
pub use rtg_ir::Name;
pub use scope::{NameLookup, ScopeHandle, ScopeRef, StaticScope};
pub use value::{
    builtin_class, call_value, callable_signature, construct, get_attribute, lookup_attribute,
    set_attribute, subscript_annotation, union_of, BoundArguments, BoundMethod, BuiltinKind,
    CallArgs, ClassKind, ClassObj, ClassRef, FunctionMarks, FunctionValue, GeneratorObj,
    GenericAlias, Heap, InstanceObj, InterfaceDef, Invoke, LazySequence, MemberKind, MemberSig,
    ModuleObj, NativeFn, NewTypeObj, PartialObj, PropertyObj, RecordDef, RecordField, SigParam,
    Signature, SpecialForm, Step, TypeVarObj, UnionObj, Value,
};
