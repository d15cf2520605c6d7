//! The `rtguard` module as seen by host code.

use rtg_check::{check_type, suppress_wrapper, ConfigOverrides};
use rtg_ir::{CollectionCheckStrategy, ForwardRefPolicy, Name};
use rtg_types::{
    bad_arguments, get_attribute, CallArgs, ClassKind, ClassObj, RuntimeError, RuntimeResult,
    Value,
};

use super::keyword;
use super::typing::mark_unchecked;
use crate::typechecked::typechecked;

const COLLECTION_CHECK_STRATEGY: &str = "collection_check_strategy";
const FORWARD_REF_POLICY: &str = "forward_ref_policy";

pub(super) fn entries() -> Vec<(Name, Value)> {
    let mut entries = Vec::new();
    for (name, func) in [
        ("typechecked", typechecked_native as rtg_types::NativeFn),
        ("typeguard_ignore", typeguard_ignore),
        ("check_type", check_type_native),
        ("suppress_type_checks", suppress_type_checks),
    ] {
        entries.push((Name::intern(name), Value::native(name, func)));
    }
    entries.push((
        Name::intern("CollectionCheckStrategy"),
        policy_class(
            "CollectionCheckStrategy",
            &[
                CollectionCheckStrategy::FirstItem.to_string(),
                CollectionCheckStrategy::AllItems.to_string(),
            ],
        ),
    ));
    entries.push((
        Name::intern("ForwardRefPolicy"),
        policy_class(
            "ForwardRefPolicy",
            &[
                ForwardRefPolicy::Error.to_string(),
                ForwardRefPolicy::Warn.to_string(),
                ForwardRefPolicy::Ignore.to_string(),
            ],
        ),
    ));
    entries
}

/// An enumeration class whose members are instances carrying a `name`.
fn policy_class(name: &str, members: &[String]) -> Value {
    let class = Value::class(ClassObj::new(
        Name::intern(name),
        Name::intern("rtguard"),
        Vec::new(),
        ClassKind::Plain,
    ));
    if let Value::Class(class_ref) = &class {
        for member in members {
            let instance = Value::instance(class_ref.clone());
            if let Value::Instance(obj) = &instance {
                obj.set(Name::intern("name"), Value::string(member.as_str()));
            }
            class_ref.set_attr(Name::intern(member), instance);
        }
    }
    class
}

/// A policy keyword value: the member object or its name as a string.
fn member_name(value: &Value) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.to_string()),
        Value::Instance(_) => get_attribute(value, Name::intern("name"))
            .ok()
            .and_then(|name| name.as_str().map(str::to_string)),
        _ => None,
    }
}

/// Overrides from the keyword arguments of `typechecked` or `check_type`.
fn overrides_from(function: &str, keywords: &[(Name, Value)]) -> Result<ConfigOverrides, RuntimeError> {
    let mut overrides = ConfigOverrides::default();
    for (name, value) in keywords {
        let invalid = || {
            bad_arguments(
                function,
                format!("invalid value for '{name}': {}", value.repr()),
            )
        };
        match name.as_str() {
            COLLECTION_CHECK_STRATEGY => {
                let strategy = member_name(value)
                    .and_then(|member| CollectionCheckStrategy::from_name(&member))
                    .ok_or_else(invalid)?;
                overrides = overrides.collection_check_strategy(strategy);
            }
            FORWARD_REF_POLICY => {
                let policy = member_name(value)
                    .and_then(|member| ForwardRefPolicy::from_name(&member))
                    .ok_or_else(invalid)?;
                overrides = overrides.forward_ref_policy(policy);
            }
            _ => {
                return Err(bad_arguments(
                    function,
                    format!("got an unexpected keyword argument '{name}'"),
                ))
            }
        }
    }
    Ok(overrides)
}

/// `@typechecked` and `@typechecked(**overrides)`.
fn typechecked_native(args: CallArgs) -> RuntimeResult {
    let overrides = overrides_from("typechecked", &args.keywords)?;
    match args.positional.as_slice() {
        [] => Ok(Value::partial(
            Value::native("typechecked", typechecked_native),
            Vec::new(),
            args.keywords,
        )),
        [target] => {
            let overrides = (!args.keywords.is_empty()).then_some(overrides);
            typechecked(target, overrides.as_ref()).map_err(Into::into)
        }
        _ => Err(bad_arguments("typechecked", "takes at most one positional argument")),
    }
}

fn typeguard_ignore(args: CallArgs) -> RuntimeResult {
    mark_unchecked("typeguard_ignore", &args)
}

/// `check_type(value, expected_type, **overrides)`.
fn check_type_native(args: CallArgs) -> RuntimeResult {
    let keywords: Vec<(Name, Value)> = args
        .keywords
        .iter()
        .filter(|(name, _)| name.as_str() != "expected_type")
        .cloned()
        .collect();
    let expected = args
        .arg(1)
        .or_else(|| keyword(&args.keywords, "expected_type"))
        .cloned();
    let (Some(value), Some(expected)) = (args.arg(0).cloned(), expected) else {
        return Err(bad_arguments("check_type", "expected a value and a type"));
    };
    let overrides = overrides_from("check_type", &keywords)?;
    let overrides = (!keywords.is_empty()).then_some(overrides);
    check_type(value, &expected, overrides.as_ref()).map_err(Into::into)
}

/// Wrap a function so it runs with checks suppressed.
fn suppress_type_checks(args: CallArgs) -> RuntimeResult {
    match args.positional.as_slice() {
        [func] if func.is_callable() => Ok(suppress_wrapper(func.clone())),
        _ => Err(bad_arguments(
            "suppress_type_checks",
            "expected a callable to wrap",
        )),
    }
}
