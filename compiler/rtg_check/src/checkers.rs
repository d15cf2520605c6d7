//! Built-in checkers, one per descriptor origin.
//!
//! Failure messages describe the innermost mismatch ("is not a list");
//! enclosing elements are added to the path as the failure unwinds
//! ("item 2", "value of key 'a'").

use rtg_ir::Name;
use rtg_types::{
    builtin_class, callable_signature, interface_member_descriptors, lookup_attribute,
    record_field_descriptors, BuiltinKind, ClassRef, MappingKind, MemberKind, Origin,
    SequenceKind, SetKind, TypeDesc, Value,
};

use crate::engine::check_type_internal;
use crate::errors::{mismatch, CheckError};
use crate::memo::TypeCheckMemo;
use crate::registry::{CheckFn, Checker, CheckerLookup};

type CheckResult = Result<(), CheckError>;

/// Lookup for every descriptor origin the engine does not handle itself.
pub struct BuiltinLookup;

impl CheckerLookup for BuiltinLookup {
    fn name(&self) -> &str {
        "builtin"
    }

    fn lookup(&self, desc: &TypeDesc) -> Option<Checker> {
        let check: CheckFn = match &desc.origin {
            Origin::Instance(_) => check_instance,
            Origin::Record(_) => check_record,
            Origin::Interface(_) => check_interface,
            Origin::Union => check_union,
            Origin::Literal(_) => check_literal,
            Origin::Sequence(_) => check_sequence,
            Origin::Mapping(_) => check_mapping,
            Origin::Set(_) => check_set,
            Origin::TupleFixed => check_fixed_tuple,
            Origin::TupleHomogeneous => check_homogeneous_tuple,
            Origin::Callable { .. } => check_callable,
            Origin::TypeVar { .. } => check_type_var,
            Origin::ClassOf => check_class,
            Origin::NewType(_) => check_new_type,
            Origin::SelfType => check_self,
            Origin::Iterable { .. } => check_iterable,
            Origin::Lazy(_) => check_lazy,
            Origin::Any | Origin::Never | Origin::Deferred { .. } => return None,
        };
        Some(Checker::Native(check))
    }
}

fn param(desc: &TypeDesc, index: usize) -> Option<&TypeDesc> {
    desc.params.get(index).filter(|p| !p.is_any())
}

/// Check the leading elements selected by the collection strategy.
fn check_items(
    items: &[Value],
    element: &TypeDesc,
    memo: &mut TypeCheckMemo,
    label: impl Fn(usize, &Value) -> String,
) -> CheckResult {
    let count = memo.config.collection_check_strategy.sample_len(items.len());
    for (i, item) in items.iter().take(count).enumerate() {
        check_type_internal(item, element, memo).map_err(|e| e.with_path_element(label(i, item)))?;
    }
    Ok(())
}

pub(crate) fn check_instance(value: &Value, desc: &TypeDesc, _memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Instance(class) = &desc.origin else {
        return Ok(());
    };
    let is_number = |kinds: &[BuiltinKind]| {
        kinds
            .iter()
            .any(|k| value.is_instance_of(&builtin_class(*k)))
    };
    match class.builtin_kind() {
        Some(BuiltinKind::Float) if !is_number(&[BuiltinKind::Float, BuiltinKind::Int]) => {
            Err(mismatch("is neither float or int"))
        }
        Some(BuiltinKind::Complex)
            if !is_number(&[BuiltinKind::Complex, BuiltinKind::Float, BuiltinKind::Int]) =>
        {
            Err(mismatch("is neither complex, float or int"))
        }
        Some(BuiltinKind::Float | BuiltinKind::Complex) => Ok(()),
        Some(BuiltinKind::Bytes) if !value.is_instance_of(class) => {
            Err(mismatch("is not bytes-like"))
        }
        _ if !value.is_instance_of(class) => {
            Err(mismatch(format!("is not an instance of {desc}")))
        }
        _ => Ok(()),
    }
}

fn format_keys(mut keys: Vec<String>) -> String {
    keys.sort();
    keys.iter()
        .map(|k| format!("\"{k}\""))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Typed records: a dict with the declared keys.
///
/// Total records reject undeclared keys; partial records accept them.
/// Fields not marked required may be absent.
pub(crate) fn check_record(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Record(class) = &desc.origin else {
        return Ok(());
    };
    let Some(def) = class.record() else {
        return Ok(());
    };
    let Some(entries) = value.dict_entries() else {
        return Err(mismatch("is not a dict"));
    };

    let is_declared = |key: &Value| key.as_str().is_some_and(|k| def.field(k).is_some());
    if def.total {
        let extra: Vec<String> = entries
            .iter()
            .filter(|(k, _)| !is_declared(k))
            .map(|(k, _)| k.display())
            .collect();
        if !extra.is_empty() {
            return Err(mismatch(format!(
                "has unexpected extra key(s): {}",
                format_keys(extra)
            )));
        }
    }

    let present = |name: Name| value.dict_get(&Value::string(name.as_str()));
    let missing: Vec<String> = def
        .fields
        .iter()
        .filter(|f| f.required && present(f.name).is_none())
        .map(|f| f.name.as_str().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(mismatch(format!(
            "is missing required key(s): {}",
            format_keys(missing)
        )));
    }

    let field_descs = record_field_descriptors(class)?;
    memo.with_self(class, |memo| {
        for (field, field_desc) in def.fields.iter().zip(&field_descs) {
            if let Some(field_value) = present(field.name) {
                check_type_internal(&field_value, field_desc, memo).map_err(|e| {
                    e.with_path_element(format!(
                        "value of key {}",
                        Value::string(field.name.as_str()).repr()
                    ))
                })?;
            }
        }
        Ok(())
    })
}

fn protocol_failure(class: &ClassRef, reason: impl std::fmt::Display) -> CheckError {
    mismatch(format!(
        "is not compatible with the {} protocol because {reason}",
        class.qualname
    ))
}

/// Public member names of an instance: its own attributes and those of its
/// class hierarchy.
fn public_members(value: &Value) -> Vec<Name> {
    let Value::Instance(obj) = value else {
        return Vec::new();
    };
    let mut names = obj.attr_names();
    for class in obj.class.mro() {
        if class.builtin_kind().is_some() {
            continue;
        }
        names.extend(class.own_attrs().into_iter().map(|(n, _)| n));
    }
    names.retain(|n| !n.is_private());
    names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    names.dedup();
    names
}

/// Structural interfaces: compare the value's actual members with the
/// declared member signatures.
pub(crate) fn check_interface(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Interface(class) = &desc.origin else {
        return Ok(());
    };
    let Some(def) = class.interface() else {
        return Ok(());
    };

    for member in &def.members {
        let name = member.name;
        let found = lookup_attribute(value, name)?;
        match (&member.kind, found) {
            (MemberKind::Method { .. }, None) => {
                return Err(protocol_failure(
                    class,
                    format_args!("it has no method named '{name}'"),
                ));
            }
            (MemberKind::Method { positional }, Some(attr)) => {
                if !attr.is_callable() {
                    return Err(protocol_failure(
                        class,
                        format_args!("its '{name}' attribute is not a method"),
                    ));
                }
                if let Some(sig) = callable_signature(&attr) {
                    let required = sig.required_positional();
                    let accepts = !matches!(sig.max_positional(), Some(max) if max < *positional);
                    if required > *positional || !accepts {
                        return Err(protocol_failure(
                            class,
                            format_args!(
                                "its '{name}' method has the wrong number of arguments \
                                 (expected {positional}, got {required})"
                            ),
                        ));
                    }
                }
            }
            (MemberKind::Attribute { .. }, None) => {
                return Err(protocol_failure(
                    class,
                    format_args!("it has no attribute named '{name}'"),
                ));
            }
            (MemberKind::Attribute { .. }, Some(_)) => {}
        }
    }

    if !def.strict {
        return Ok(());
    }

    for (name, member_desc) in interface_member_descriptors(class)? {
        let Some(attr) = lookup_attribute(value, name)? else {
            continue;
        };
        memo.with_self(class, |memo| check_type_internal(&attr, &member_desc, memo))
            .map_err(|e| e.with_path_element(format!("attribute '{name}'")))?;
    }

    let extra: Vec<&str> = public_members(value)
        .into_iter()
        .filter(|n| !def.members.iter().any(|m| m.name == *n))
        .map(Name::as_str)
        .collect();
    if !extra.is_empty() {
        return Err(protocol_failure(
            class,
            format_args!("it has unexpected member(s): {}", extra.join(", ")),
        ));
    }
    Ok(())
}

fn union_failure(failures: &[(String, CheckError)]) -> CheckError {
    let lines: Vec<String> = failures
        .iter()
        .map(|(name, err)| format!("{name}: {err}"))
        .collect();
    let indented: Vec<String> = lines
        .join("\n")
        .lines()
        .map(|line| format!("  {line}"))
        .collect();
    mismatch(format!(
        "did not match any element in the union:\n{}",
        indented.join("\n")
    ))
}

/// Unions try every member in declaration order; the first match wins.
pub(crate) fn check_union(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let mut failures = Vec::with_capacity(desc.params.len());
    for member in &desc.params {
        match check_type_internal(value, member, memo) {
            Ok(()) => return Ok(()),
            Err(err @ CheckError::TypeCheck(_)) => failures.push((member.to_string(), err)),
            Err(other) => return Err(other),
        }
    }
    Err(union_failure(&failures))
}

pub(crate) fn check_literal(value: &Value, desc: &TypeDesc, _memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Literal(values) = &desc.origin else {
        return Ok(());
    };
    if values.iter().any(|v| v.matches(value)) {
        return Ok(());
    }
    let formatted: Vec<String> = values.iter().map(ToString::to_string).collect();
    Err(mismatch(format!("is not any of ({})", formatted.join(", "))))
}

pub(crate) fn check_sequence(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Sequence(kind) = &desc.origin else {
        return Ok(());
    };
    let conforms = match kind {
        SequenceKind::List | SequenceKind::MutableSequence => matches!(value, Value::List(_)),
        SequenceKind::Sequence => matches!(
            value,
            Value::List(_) | Value::Tuple(_) | Value::Str(_) | Value::Bytes(_)
        ),
        SequenceKind::Collection => value.len().is_some(),
    };
    if !conforms {
        return Err(mismatch(match kind {
            SequenceKind::List => "is not a list",
            SequenceKind::Sequence => "is not a sequence",
            SequenceKind::MutableSequence => "is not a mutable sequence",
            SequenceKind::Collection => "is not a collection",
        }));
    }
    let Some(element) = param(desc, 0) else {
        return Ok(());
    };
    let items = value.iter_snapshot()?;
    check_items(&items, element, memo, |i, _| format!("item {i}"))
}

pub(crate) fn check_mapping(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Mapping(kind) = &desc.origin else {
        return Ok(());
    };
    let Some(entries) = value.dict_entries() else {
        return Err(mismatch(match kind {
            MappingKind::Dict => "is not a dict",
            MappingKind::Mapping => "is not a mapping",
            MappingKind::MutableMapping => "is not a mutable mapping",
        }));
    };
    let key_desc = param(desc, 0);
    let value_desc = param(desc, 1);
    if key_desc.is_none() && value_desc.is_none() {
        return Ok(());
    }
    let count = memo.config.collection_check_strategy.sample_len(entries.len());
    for (key, item) in entries.iter().take(count) {
        if let Some(key_desc) = key_desc {
            check_type_internal(key, key_desc, memo)
                .map_err(|e| e.with_path_element(format!("key {}", key.repr())))?;
        }
        if let Some(value_desc) = value_desc {
            check_type_internal(item, value_desc, memo)
                .map_err(|e| e.with_path_element(format!("value of key {}", key.repr())))?;
        }
    }
    Ok(())
}

pub(crate) fn check_set(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Set(kind) = &desc.origin else {
        return Ok(());
    };
    let conforms = match kind {
        SetKind::Set | SetKind::MutableSet => matches!(value, Value::Set(_)),
        SetKind::FrozenSet => matches!(value, Value::FrozenSet(_)),
        SetKind::AbstractSet => matches!(value, Value::Set(_) | Value::FrozenSet(_)),
    };
    if !conforms {
        return Err(mismatch(match kind {
            SetKind::Set | SetKind::AbstractSet => "is not a set",
            SetKind::FrozenSet => "is not a frozenset",
            SetKind::MutableSet => "is not a mutable set",
        }));
    }
    let Some(element) = param(desc, 0) else {
        return Ok(());
    };
    let items = value.iter_snapshot()?;
    check_items(&items, element, memo, |_, item| format!("[{}]", item.display()))
}

fn tuple_items(value: &Value) -> Result<Vec<Value>, CheckError> {
    match value {
        Value::Tuple(items) => Ok(items.to_vec()),
        _ => Err(mismatch("is not a tuple")),
    }
}

pub(crate) fn check_fixed_tuple(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let items = tuple_items(value)?;
    if desc.params.is_empty() {
        if !items.is_empty() {
            return Err(mismatch("is not an empty tuple"));
        }
        return Ok(());
    }
    if items.len() != desc.params.len() {
        return Err(mismatch(format!(
            "has wrong number of elements (expected {}, got {} instead)",
            desc.params.len(),
            items.len()
        )));
    }
    for (i, (item, slot)) in items.iter().zip(&desc.params).enumerate() {
        check_type_internal(item, slot, memo).map_err(|e| e.with_path_element(format!("item {i}")))?;
    }
    Ok(())
}

pub(crate) fn check_homogeneous_tuple(
    value: &Value,
    desc: &TypeDesc,
    memo: &mut TypeCheckMemo,
) -> CheckResult {
    let items = tuple_items(value)?;
    let Some(element) = param(desc, 0) else {
        return Ok(());
    };
    check_items(&items, element, memo, |i, _| format!("item {i}"))
}

/// Callables: only the declared positional arity is compared; parameter
/// types are not.
pub(crate) fn check_callable(value: &Value, desc: &TypeDesc, _memo: &mut TypeCheckMemo) -> CheckResult {
    if !value.is_callable() {
        return Err(mismatch("is not callable"));
    }
    let Origin::Callable {
        arg_count: Some(expected),
    } = desc.origin
    else {
        return Ok(());
    };
    let Some(sig) = callable_signature(value) else {
        return Ok(());
    };

    let unfulfilled: Vec<&str> = sig
        .params
        .iter()
        .filter(|p| p.kind == rtg_ir::ParamKind::KeywordOnly && p.default.is_none())
        .map(|p| p.name.as_str())
        .collect();
    if !unfulfilled.is_empty() {
        return Err(mismatch(format!(
            "has mandatory keyword-only arguments in its declaration: {}",
            unfulfilled.join(", ")
        )));
    }

    let mandatory = sig.required_positional();
    let has_varargs = sig.max_positional().is_none();
    if mandatory > expected {
        return Err(mismatch(format!(
            "has too many arguments in its declaration; expected {expected} \
             but {mandatory} argument(s) declared"
        )));
    }
    if !has_varargs && mandatory < expected {
        return Err(mismatch(format!(
            "has too few arguments in its declaration; expected {expected} \
             but {mandatory} argument(s) declared"
        )));
    }
    Ok(())
}

/// Type variables: the bound, or any one of the constraints. Variance is
/// ignored.
pub(crate) fn check_type_var(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::TypeVar { bounded, .. } = desc.origin else {
        return Ok(());
    };
    if bounded {
        return match desc.params.first() {
            Some(bound) => check_type_internal(value, bound, memo),
            None => Ok(()),
        };
    }
    if desc.params.is_empty() {
        return Ok(());
    }
    for constraint in &desc.params {
        match check_type_internal(value, constraint, memo) {
            Ok(()) => return Ok(()),
            Err(CheckError::TypeCheck(_)) => {}
            Err(other) => return Err(other),
        }
    }
    let names: Vec<String> = desc.params.iter().map(ToString::to_string).collect();
    Err(mismatch(format!(
        "does not match any of the constraints ({})",
        names.join(", ")
    )))
}

/// The class a descriptor names nominally, if any.
fn nominal_class(desc: &TypeDesc) -> Option<ClassRef> {
    let kind = match &desc.origin {
        Origin::Instance(class) | Origin::Record(class) | Origin::Interface(class) => {
            return Some(class.clone());
        }
        Origin::Sequence(SequenceKind::List) => BuiltinKind::List,
        Origin::Mapping(MappingKind::Dict) => BuiltinKind::Dict,
        Origin::Set(SetKind::Set) => BuiltinKind::Set,
        Origin::Set(SetKind::FrozenSet) => BuiltinKind::FrozenSet,
        Origin::TupleFixed | Origin::TupleHomogeneous => BuiltinKind::Tuple,
        Origin::ClassOf => BuiltinKind::Type,
        _ => return None,
    };
    Some(builtin_class(kind))
}

/// Whether `class` provides every member an interface declares.
fn class_provides(class: &ClassRef, interface: &ClassRef) -> bool {
    class.is_subclass_of(interface)
        || interface.interface().is_some_and(|def| {
            def.members
                .iter()
                .all(|m| class.lookup_attr(m.name).is_some())
        })
}

/// `Type[X]`: a class that is a subclass of `X`.
fn check_subclass(class: &ClassRef, expected: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    match &expected.origin {
        Origin::Any => Ok(()),
        Origin::Deferred { source, scope } => match memo.resolve_deferred(*source, scope.as_ref())? {
            Some(resolved) => check_subclass(class, &resolved, memo),
            None => Ok(()),
        },
        Origin::Interface(interface) => {
            if class_provides(class, interface) {
                Ok(())
            } else {
                Err(mismatch(format!(
                    "is not compatible with the {} protocol",
                    interface.qualname
                )))
            }
        }
        Origin::TypeVar { bounded, .. } => {
            if expected.params.is_empty() {
                return Ok(());
            }
            if *bounded {
                return check_subclass(class, &expected.params[0], memo);
            }
            for constraint in &expected.params {
                if check_subclass(class, constraint, memo).is_ok() {
                    return Ok(());
                }
            }
            let names: Vec<String> = expected.params.iter().map(ToString::to_string).collect();
            Err(mismatch(format!(
                "does not match any of the constraints ({})",
                names.join(", ")
            )))
        }
        Origin::Union => {
            let mut failures = Vec::new();
            for member in &expected.params {
                match check_subclass(class, member, memo) {
                    Ok(()) => return Ok(()),
                    Err(err @ CheckError::TypeCheck(_)) => {
                        failures.push((member.to_string(), err));
                    }
                    Err(other) => return Err(other),
                }
            }
            Err(union_failure(&failures))
        }
        Origin::SelfType => match memo.self_type.clone() {
            Some(self_type) if class.is_subclass_of(&self_type) => Ok(()),
            Some(self_type) => Err(mismatch(format!(
                "is not a subclass of the self type ({})",
                self_type.qualified_name()
            ))),
            None => Err(CheckError::SelfWithoutContext),
        },
        _ => match nominal_class(expected) {
            Some(expected_class) if class.is_subclass_of(&expected_class) => Ok(()),
            Some(expected_class) => Err(mismatch(format!(
                "is not a subclass of {}",
                expected_class.qualified_name()
            ))),
            None => Err(CheckError::UnsupportedType {
                desc: format!("Type[{expected}]"),
            }),
        },
    }
}

pub(crate) fn check_class(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Value::Class(class) = value else {
        return Err(mismatch("is not a class"));
    };
    match desc.params.first() {
        Some(expected) => check_subclass(class, expected, memo),
        None => Ok(()),
    }
}

pub(crate) fn check_new_type(value: &Value, desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    match desc.params.first() {
        Some(supertype) => check_type_internal(value, supertype, memo),
        None => Ok(()),
    }
}

/// `Self` against the class of the method being checked.
pub(crate) fn check_self(value: &Value, _desc: &TypeDesc, memo: &mut TypeCheckMemo) -> CheckResult {
    let Some(self_type) = &memo.self_type else {
        return Err(CheckError::SelfWithoutContext);
    };
    match value {
        Value::Class(class) if !class.is_subclass_of(self_type) => Err(mismatch(format!(
            "is not a subclass of the self type ({})",
            self_type.qualified_name()
        ))),
        Value::Class(_) => Ok(()),
        _ if !value.is_instance_of(self_type) => Err(mismatch(format!(
            "is not an instance of the self type ({})",
            self_type.qualified_name()
        ))),
        _ => Ok(()),
    }
}

/// Iterables are only checked for iterability; their elements are
/// produced lazily and never consumed by a check.
pub(crate) fn check_iterable(value: &Value, desc: &TypeDesc, _memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Iterable { is_async } = desc.origin else {
        return Ok(());
    };
    let conforms = match value {
        Value::Generator(g) => (g.kind == rtg_ir::LazyKind::Async) == is_async,
        _ => !is_async && value.len().is_some(),
    };
    if conforms {
        Ok(())
    } else if is_async {
        Err(mismatch("is not an async iterable"))
    } else {
        Err(mismatch("is not an iterable"))
    }
}

pub(crate) fn check_lazy(value: &Value, desc: &TypeDesc, _memo: &mut TypeCheckMemo) -> CheckResult {
    let Origin::Lazy(kind) = desc.origin else {
        return Ok(());
    };
    match value {
        Value::Generator(g) if g.kind == kind => Ok(()),
        _ if kind == rtg_ir::LazyKind::Async => Err(mismatch("is not an async generator")),
        _ => Err(mismatch("is not a generator")),
    }
}
