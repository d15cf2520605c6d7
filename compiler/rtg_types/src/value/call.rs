//! Calling values.

use rtg_ir::{Name, ParamKind};

use super::attr::lookup_attribute;
use super::builtins::{builtin_class, BuiltinKind};
use super::class::{ClassKind, ClassRef};
use super::function::{CallArgs, SigParam, Signature};
use super::{int_to_float, Value};
use crate::errors::{bad_arguments, not_callable, RuntimeError, RuntimeResult};

/// Call `callee` with `args`.
pub fn call_value(callee: &Value, args: CallArgs) -> RuntimeResult {
    rtg_ir::ensure_sufficient_stack(|| match callee {
        Value::Function(func) => func.call(args),
        Value::BoundMethod(method) => {
            call_value(&method.func, args.prepend(method.receiver.clone()))
        }
        Value::Partial(partial) => {
            let mut full = CallArgs::new(partial.args.iter().cloned().chain(args.positional));
            full.keywords = partial.keywords.clone();
            for (name, value) in args.keywords {
                match full.keywords.iter_mut().find(|(n, _)| *n == name) {
                    Some(slot) => slot.1 = value,
                    None => full.keywords.push((name, value)),
                }
            }
            call_value(&partial.func, full)
        }
        Value::Class(class) => construct(class, args),
        Value::NewType(nt) => match args.positional.as_slice() {
            [value] => Ok(value.clone()),
            _ => Err(bad_arguments(nt.name.as_str(), "takes exactly one argument")),
        },
        Value::Instance(obj) => match obj.class.lookup_attr(Name::intern("__call__")) {
            Some(method) => call_value(&method, args.prepend(callee.clone())),
            None => Err(not_callable(callee)),
        },
        other => Err(not_callable(other)),
    })
}

/// Instantiate `class`.
pub fn construct(class: &ClassRef, args: CallArgs) -> RuntimeResult {
    match &class.kind {
        ClassKind::Builtin(kind) => construct_builtin(*kind, class, args),
        ClassKind::Record(_) => {
            if !args.positional.is_empty() {
                return Err(bad_arguments(
                    class.name.as_str(),
                    "takes keyword arguments only",
                ));
            }
            Ok(Value::dict(
                args.keywords
                    .into_iter()
                    .map(|(n, v)| (Value::string(n.as_str()), v))
                    .collect(),
            ))
        }
        ClassKind::Interface(_) => Err(RuntimeError::new(format!(
            "protocol class '{}' cannot be instantiated",
            class.name
        ))),
        ClassKind::Plain => {
            let instance = Value::instance(class.clone());
            if is_exception_class(class) {
                if let Value::Instance(obj) = &instance {
                    obj.set(Name::intern("args"), Value::tuple(args.positional.to_vec()));
                }
            }
            if let Some(init) = lookup_attribute(&instance, Name::intern("__init__"))? {
                call_value(&init, args)?;
            }
            Ok(instance)
        }
    }
}

fn is_exception_class(class: &ClassRef) -> bool {
    class.is_subclass_of(&builtin_class(BuiltinKind::BaseException))
}

fn construct_builtin(kind: BuiltinKind, class: &ClassRef, args: CallArgs) -> RuntimeResult {
    let name = kind.name();
    if is_exception_class(class) {
        let instance = Value::instance(class.clone());
        if let Value::Instance(obj) = &instance {
            obj.set(Name::intern("args"), Value::tuple(args.positional.to_vec()));
        }
        return Ok(instance);
    }
    let arg = args.arg(0).cloned();
    if args.positional.len() > 1 {
        return Err(bad_arguments(name, "takes at most 1 argument"));
    }
    match kind {
        BuiltinKind::Object => Ok(Value::instance(class.clone())),
        BuiltinKind::NoneType => Ok(Value::None),
        BuiltinKind::Bool => Ok(Value::Bool(arg.is_some_and(|v| v.is_truthy()))),
        BuiltinKind::Int => match arg {
            None => Ok(Value::Int(0)),
            Some(Value::Int(n)) => Ok(Value::Int(n)),
            Some(Value::Bool(b)) => Ok(Value::Int(i64::from(b))),
            Some(Value::Float(f)) => float_to_int(f),
            Some(Value::Str(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| {
                    RuntimeError::new(format!(
                        "invalid literal for int(): {}",
                        Value::Str(s).repr()
                    ))
                }),
            Some(other) => Err(bad_arguments(
                name,
                format!("argument must be a string or a number, not '{}'", other.type_name()),
            )),
        },
        BuiltinKind::Float => match arg {
            None => Ok(Value::Float(0.0)),
            Some(Value::Float(f)) => Ok(Value::Float(f)),
            Some(v @ (Value::Int(_) | Value::Bool(_))) => {
                Ok(Value::Float(int_to_float(v.as_int().unwrap_or_default())))
            }
            Some(Value::Str(s)) => s
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| {
                    RuntimeError::new(format!(
                        "could not convert string to float: {}",
                        Value::Str(s).repr()
                    ))
                }),
            Some(other) => Err(bad_arguments(
                name,
                format!("argument must be a string or a number, not '{}'", other.type_name()),
            )),
        },
        BuiltinKind::Str => Ok(Value::string(arg.map(|v| v.display()).unwrap_or_default())),
        BuiltinKind::Bytes => match arg {
            None => Ok(Value::bytes(Vec::new())),
            Some(Value::Bytes(b)) => Ok(Value::Bytes(b)),
            Some(other) => {
                let mut out = Vec::new();
                for item in other.iter_snapshot()? {
                    let byte = item
                        .as_int()
                        .and_then(|n| u8::try_from(n).ok())
                        .ok_or_else(|| RuntimeError::new("bytes must be in range(0, 256)"))?;
                    out.push(byte);
                }
                Ok(Value::bytes(out))
            }
        },
        BuiltinKind::Tuple => Ok(Value::tuple(items_of(arg)?)),
        BuiltinKind::List => Ok(Value::list(items_of(arg)?)),
        BuiltinKind::Set => Ok(Value::set(items_of(arg)?)),
        BuiltinKind::FrozenSet => Ok(Value::frozenset(items_of(arg)?)),
        BuiltinKind::Dict => {
            let mut entries = match &arg {
                None => Vec::new(),
                Some(dict @ Value::Dict(_)) => dict.dict_entries().unwrap_or_default(),
                Some(other) => {
                    let mut entries = Vec::new();
                    for pair in other.iter_snapshot()? {
                        match pair.iter_snapshot()?.as_slice() {
                            [k, v] => entries.push((k.clone(), v.clone())),
                            _ => {
                                return Err(RuntimeError::new(
                                    "dictionary update sequence element has wrong length",
                                ))
                            }
                        }
                    }
                    entries
                }
            };
            entries.extend(
                args.keywords
                    .into_iter()
                    .map(|(n, v)| (Value::string(n.as_str()), v)),
            );
            Ok(Value::dict(entries))
        }
        BuiltinKind::Type => match arg {
            Some(value) => Ok(Value::Class(value.class_of())),
            None => Err(bad_arguments(name, "takes 1 argument")),
        },
        _ => Err(RuntimeError::new(format!(
            "cannot create '{name}' instances"
        ))),
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "host int() truncates toward zero"
)]
fn float_to_int(f: f64) -> RuntimeResult {
    if !f.is_finite() {
        return Err(RuntimeError::new("cannot convert float to integer"));
    }
    Ok(Value::Int(f.trunc() as i64))
}

fn items_of(arg: Option<Value>) -> Result<Vec<Value>, RuntimeError> {
    match arg {
        None => Ok(Vec::new()),
        Some(Value::Generator(g)) => {
            let mut items = Vec::new();
            while let super::Step::Yielded(item) = g.next()? {
                items.push(item);
            }
            Ok(items)
        }
        Some(value) => value.iter_snapshot(),
    }
}

/// Parameter list a call to `value` accepts, when it can be determined.
///
/// Bound methods and partials drop the parameters already supplied. Classes
/// report their `__init__` without the receiver.
pub fn callable_signature(value: &Value) -> Option<Signature> {
    match value {
        Value::Function(func) => Some(func.signature.clone()),
        Value::BoundMethod(method) => {
            callable_signature(&method.func).map(|sig| sig.without_supplied(1, &[]))
        }
        Value::Partial(partial) => {
            let keywords: Vec<Name> = partial.keywords.iter().map(|(n, _)| *n).collect();
            callable_signature(&partial.func)
                .map(|sig| sig.without_supplied(partial.args.len(), &keywords))
        }
        Value::Class(class) => match &class.kind {
            ClassKind::Plain => match class.lookup_attr(Name::intern("__init__")) {
                Some(init) => callable_signature(&init).map(|sig| sig.without_supplied(1, &[])),
                None => Some(Signature::default()),
            },
            _ => Some(Signature::variadic()),
        },
        Value::NewType(_) => Some(Signature::new(vec![SigParam::new(
            "x",
            ParamKind::PositionalOnly,
        )])),
        Value::Instance(obj) => obj
            .class
            .lookup_attr(Name::intern("__call__"))
            .and_then(|call| callable_signature(&call))
            .map(|sig| sig.without_supplied(1, &[])),
        _ => None,
    }
}
