//! Check entry points.
//!
//! [`check_type`] is the checked identity used directly by callers. The
//! argument, return, yield and send checks are what instrumented code and
//! checking wrappers call; they label failures with the checked element and
//! honour the failure callback.

use rtg_ir::ParamKind;
use rtg_types::{
    build_descriptor_in, builtin_class, BuiltinKind, MappingKind, Name, Origin, ScopeHandle,
    TypeCheckError, TypeDesc, Value,
};

use crate::config::{ConfigOverrides, TypeCheckConfiguration};
use crate::engine::check_type_internal;
use crate::errors::CheckError;
use crate::memo::TypeCheckMemo;
use crate::suppress::type_checks_suppressed;

/// Binary operator methods that may return `NotImplemented` from a
/// `-> bool` declaration.
pub const BINARY_MAGIC_METHODS: [&str; 50] = [
    "__add__",
    "__and__",
    "__cmp__",
    "__divmod__",
    "__div__",
    "__eq__",
    "__floordiv__",
    "__ge__",
    "__gt__",
    "__iadd__",
    "__iand__",
    "__idiv__",
    "__ifloordiv__",
    "__ilshift__",
    "__imatmul__",
    "__imod__",
    "__imul__",
    "__ior__",
    "__ipow__",
    "__irshift__",
    "__isub__",
    "__itruediv__",
    "__ixor__",
    "__le__",
    "__lshift__",
    "__lt__",
    "__matmul__",
    "__mod__",
    "__mul__",
    "__ne__",
    "__or__",
    "__pow__",
    "__radd__",
    "__rand__",
    "__rdiv__",
    "__rfloordiv__",
    "__rlshift__",
    "__rmatmul__",
    "__rmod__",
    "__rmul__",
    "__ror__",
    "__rpow__",
    "__rrshift__",
    "__rshift__",
    "__rsub__",
    "__rtruediv__",
    "__rxor__",
    "__sub__",
    "__truediv__",
    "__xor__",
];

/// How a value is named in a failure path: `class Foo` for classes, the
/// qualified type name otherwise.
pub fn value_label(value: &Value) -> String {
    match value {
        Value::Class(class) => format!("class {}", class.qualified_name()),
        other => other.qualified_type_name(),
    }
}

/// Raise `err`, or hand it to the failure callback when one is configured.
fn report(err: TypeCheckError, memo: &TypeCheckMemo) -> Result<(), CheckError> {
    match &memo.config.typecheck_fail_callback {
        Some(callback) => {
            callback(&err, memo);
            Ok(())
        }
        None => Err(err.into()),
    }
}

/// Run a check and label a type-check failure with `label`.
fn check_labelled(
    value: &Value,
    desc: &TypeDesc,
    memo: &mut TypeCheckMemo,
    label: impl FnOnce() -> String,
) -> Result<(), CheckError> {
    match check_type_internal(value, desc, memo) {
        Ok(()) => Ok(()),
        Err(CheckError::TypeCheck(mut err)) => {
            err.append_path_element(label());
            report(err, memo)
        }
        Err(other) => Err(other),
    }
}

/// Check `value` against an annotation and return it unchanged.
///
/// The process-wide configuration does not apply: the check starts from
/// the defaults, with `overrides` merged over them.
pub fn check_type(
    value: Value,
    annotation: &Value,
    overrides: Option<&ConfigOverrides>,
) -> Result<Value, CheckError> {
    check_type_in(value, annotation, None, overrides)
}

/// [`check_type`] with string annotations resolved in `scope`.
#[tracing::instrument(level = "trace", skip_all)]
pub fn check_type_in(
    value: Value,
    annotation: &Value,
    scope: Option<ScopeHandle>,
    overrides: Option<&ConfigOverrides>,
) -> Result<Value, CheckError> {
    if type_checks_suppressed() {
        return Ok(value);
    }
    let desc = build_descriptor_in(annotation, scope.as_ref())?;
    if desc.is_any() {
        return Ok(value);
    }
    let config = match overrides {
        Some(overrides) => TypeCheckConfiguration::default().merged(overrides),
        None => TypeCheckConfiguration::default(),
    };
    let mut memo = TypeCheckMemo::new(scope, config);
    check_labelled(&value, &desc, &mut memo, || value_label(&value))?;
    Ok(value)
}

/// Descriptor an argument bound to a parameter of `kind` is checked
/// against: `*args: T` binds a `Tuple[T, ...]`, `**kwargs: T` a
/// `Dict[str, T]`.
pub fn parameter_descriptor(kind: ParamKind, declared: TypeDesc) -> TypeDesc {
    match kind {
        ParamKind::VarPositional => TypeDesc::new(Origin::TupleHomogeneous).with_params(vec![declared]),
        ParamKind::VarKeyword => TypeDesc::new(Origin::Mapping(MappingKind::Dict)).with_params(vec![
            TypeDesc::instance(builtin_class(BuiltinKind::Str)),
            declared,
        ]),
        _ => declared,
    }
}

/// Check bound arguments of a call to `func_name`.
pub fn check_argument_types(
    func_name: &str,
    arguments: &[(Name, Value, TypeDesc)],
    memo: &mut TypeCheckMemo,
) -> Result<(), CheckError> {
    if type_checks_suppressed() {
        return Ok(());
    }
    for (name, value, desc) in arguments {
        if desc.is_never() {
            report(
                TypeCheckError::new(format!(
                    "{func_name}() was declared never to be called but it was"
                )),
                memo,
            )?;
            continue;
        }
        check_labelled(value, desc, memo, || {
            format!("argument \"{name}\" ({})", value_label(value))
        })?;
    }
    Ok(())
}

fn is_bool(desc: &TypeDesc) -> bool {
    matches!(&desc.origin, Origin::Instance(class) if class.is_builtin(BuiltinKind::Bool))
}

/// Check the value returned by `func_name` and pass it through.
///
/// Binary operator methods declared to return `bool` may return
/// `NotImplemented`.
pub fn check_return_type(
    func_name: &str,
    value: Value,
    desc: &TypeDesc,
    memo: &mut TypeCheckMemo,
) -> Result<Value, CheckError> {
    if type_checks_suppressed() {
        return Ok(value);
    }
    if desc.is_never() {
        report(
            TypeCheckError::new(format!(
                "{func_name}() was declared never to return but it did"
            )),
            memo,
        )?;
        return Ok(value);
    }
    if matches!(value, Value::NotImplemented) && is_bool(desc) {
        let short_name = func_name.rsplit('.').next().unwrap_or(func_name);
        if BINARY_MAGIC_METHODS.contains(&short_name) {
            return Ok(value);
        }
    }
    check_labelled(&value, desc, memo, || {
        format!("the return value ({})", value_label(&value))
    })?;
    Ok(value)
}

/// Check a value produced by a lazily-produced sequence.
pub fn check_yield_type(
    func_name: &str,
    value: Value,
    desc: &TypeDesc,
    memo: &mut TypeCheckMemo,
) -> Result<Value, CheckError> {
    if type_checks_suppressed() {
        return Ok(value);
    }
    if desc.is_never() {
        report(
            TypeCheckError::new(format!("{func_name}() was declared never to yield but it did")),
            memo,
        )?;
        return Ok(value);
    }
    check_labelled(&value, desc, memo, || {
        format!("the yielded value ({})", value_label(&value))
    })?;
    Ok(value)
}

/// Check a value sent into a lazily-produced sequence.
pub fn check_send_type(
    func_name: &str,
    value: Value,
    desc: &TypeDesc,
    memo: &mut TypeCheckMemo,
) -> Result<Value, CheckError> {
    if type_checks_suppressed() {
        return Ok(value);
    }
    if desc.is_never() {
        report(
            TypeCheckError::new(format!(
                "{func_name}() was declared never to be sent a value to but it was"
            )),
            memo,
        )?;
        return Ok(value);
    }
    check_labelled(&value, desc, memo, || {
        format!("the value sent to generator ({})", value_label(&value))
    })?;
    Ok(value)
}
