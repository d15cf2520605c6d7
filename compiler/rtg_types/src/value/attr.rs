//! Attribute access.
//!
//! Instance lookup checks the instance's own attributes first, then the
//! class's method resolution order; functions found on the class are bound
//! to the receiver, and method descriptors (static, class, property) apply
//! their binding rules.

use rtg_ir::{LazyKind, Name};

use super::call::call_value;
use super::function::CallArgs;
use super::generator::Step;
use super::Value;
use crate::errors::{attribute_not_found, exhausted, RuntimeError, RuntimeResult};

/// `value.name`, failing when the attribute does not exist.
pub fn get_attribute(value: &Value, name: Name) -> RuntimeResult {
    lookup_attribute(value, name)?
        .ok_or_else(|| attribute_not_found(&value.type_name(), name.as_str()))
}

/// `value.name`, or `None` when the attribute does not exist.
pub fn lookup_attribute(value: &Value, name: Name) -> Result<Option<Value>, RuntimeError> {
    match value {
        Value::Instance(obj) => {
            if let Some(found) = obj.get(name) {
                return Ok(Some(found));
            }
            if name.as_str() == "__class__" {
                return Ok(Some(Value::Class(obj.class.clone())));
            }
            match obj.class.lookup_attr(name) {
                Some(found) => bind_to_instance(value, found).map(Some),
                None => Ok(None),
            }
        }
        Value::Class(class) => {
            if let Some(found) = class.lookup_attr(name) {
                return Ok(Some(match found {
                    Value::StaticMethod(func) => (*func).clone(),
                    Value::ClassMethod(func) => Value::bound_method(value.clone(), (*func).clone()),
                    other => other,
                }));
            }
            Ok(match name.as_str() {
                "__name__" => Some(Value::string(class.name.as_str())),
                "__qualname__" => Some(Value::string(class.qualname.as_str())),
                "__module__" => Some(Value::string(class.module.as_str())),
                "__doc__" => Some(doc_value(class.doc)),
                _ => None,
            })
        }
        Value::Module(module) => Ok(module.namespace.lookup(name)),
        Value::Function(func) => Ok(match name.as_str() {
            "__name__" => Some(Value::string(func.name.as_str())),
            "__qualname__" => Some(Value::string(func.qualname.as_str())),
            "__module__" => Some(Value::string(func.module.as_str())),
            "__doc__" => Some(doc_value(func.doc)),
            "__wrapped__" => func.wrapped.clone(),
            "__annotations__" => Some(Value::dict(
                func.annotations
                    .iter()
                    .map(|(n, v)| (Value::string(n.as_str()), v.clone()))
                    .collect(),
            )),
            _ => None,
        }),
        Value::BoundMethod(method) => match name.as_str() {
            "__self__" => Ok(Some(method.receiver.clone())),
            "__func__" => Ok(Some(method.func.clone())),
            _ => lookup_attribute(&method.func, name),
        },
        Value::Generator(g) => Ok(generator_method(g.kind, name.as_str())
            .map(|method| Value::bound_method(value.clone(), method))),
        Value::Dict(_) => Ok(dict_method(name.as_str())
            .map(|method| Value::bound_method(value.clone(), method))),
        Value::List(_) if name.as_str() == "append" => Ok(Some(Value::bound_method(
            value.clone(),
            Value::native("append", list_append),
        ))),
        Value::TypeVar(tv) if name.as_str() == "__name__" => {
            Ok(Some(Value::string(tv.name.as_str())))
        }
        Value::NewType(nt) => Ok(match name.as_str() {
            "__name__" => Some(Value::string(nt.name.as_str())),
            "__supertype__" => Some(nt.supertype.clone()),
            _ => None,
        }),
        Value::Alias(alias) => Ok(match name.as_str() {
            "__origin__" => Some(alias.origin.clone()),
            "__args__" => Some(Value::tuple(alias.args.clone())),
            "__metadata__" => Some(Value::tuple(alias.extras.clone())),
            _ => None,
        }),
        _ => Ok(None),
    }
}

fn doc_value(doc: Option<Name>) -> Value {
    doc.map_or(Value::None, |d| Value::string(d.as_str()))
}

fn bind_to_instance(instance: &Value, found: Value) -> RuntimeResult {
    Ok(match found {
        Value::Function(_) => Value::bound_method(instance.clone(), found),
        Value::StaticMethod(func) => (*func).clone(),
        Value::ClassMethod(func) => {
            let class = Value::Class(instance.class_of());
            Value::bound_method(class, (*func).clone())
        }
        Value::Property(prop) => {
            call_value(&prop.getter, CallArgs::new([instance.clone()]))?
        }
        other => other,
    })
}

/// `target.name = value`.
pub fn set_attribute(target: &Value, name: Name, value: Value) -> Result<(), RuntimeError> {
    match target {
        Value::Instance(obj) => {
            if let Some(Value::Property(prop)) = obj.class.lookup_attr(name) {
                let Some(setter) = &prop.setter else {
                    return Err(RuntimeError::new(format!(
                        "property '{name}' of '{}' object has no setter",
                        obj.class.name
                    )));
                };
                call_value(setter, CallArgs::new([target.clone(), value]))?;
                return Ok(());
            }
            obj.set(name, value);
            Ok(())
        }
        Value::Class(class) => {
            class.set_attr(name, value);
            Ok(())
        }
        other => Err(attribute_not_found(&other.type_name(), name.as_str())),
    }
}

fn generator_method(kind: LazyKind, name: &str) -> Option<Value> {
    match (kind, name) {
        (LazyKind::Sync, "send") | (LazyKind::Async, "asend") => {
            Some(Value::native(name, generator_send))
        }
        (LazyKind::Sync, "__next__") | (LazyKind::Async, "__anext__") => {
            Some(Value::native(name, generator_next))
        }
        (_, "close" | "aclose") => Some(Value::native(name, generator_close)),
        _ => None,
    }
}

fn generator_send(args: CallArgs) -> RuntimeResult {
    let receiver = args.arg(0).cloned().unwrap_or(Value::None);
    let sent = args.arg(1).cloned().unwrap_or(Value::None);
    resume(&receiver, sent)
}

fn generator_next(args: CallArgs) -> RuntimeResult {
    let receiver = args.arg(0).cloned().unwrap_or(Value::None);
    resume(&receiver, Value::None)
}

fn generator_close(args: CallArgs) -> RuntimeResult {
    if let Some(Value::Generator(g)) = args.arg(0) {
        g.close()?;
    }
    Ok(Value::None)
}

/// Resume a generator; completion surfaces as the exhausted error.
pub(crate) fn resume(receiver: &Value, sent: Value) -> RuntimeResult {
    let Value::Generator(g) = receiver else {
        return Err(RuntimeError::new(format!(
            "'{}' object is not a generator",
            receiver.type_name()
        )));
    };
    match g.send(sent)? {
        Step::Yielded(value) => Ok(value),
        Step::Complete(value) => Err(exhausted(value)),
    }
}

fn dict_method(name: &str) -> Option<Value> {
    match name {
        "get" => Some(Value::native("get", dict_get)),
        "keys" => Some(Value::native("keys", dict_keys)),
        "values" => Some(Value::native("values", dict_values)),
        "items" => Some(Value::native("items", dict_items)),
        _ => None,
    }
}

fn receiver_entries(args: &CallArgs) -> Vec<(Value, Value)> {
    args.arg(0)
        .and_then(Value::dict_entries)
        .unwrap_or_default()
}

fn dict_get(args: CallArgs) -> RuntimeResult {
    let key = args.arg(1).cloned().unwrap_or(Value::None);
    let fallback = args.arg(2).cloned().unwrap_or(Value::None);
    Ok(args
        .arg(0)
        .and_then(|d| d.dict_get(&key))
        .unwrap_or(fallback))
}

fn dict_keys(args: CallArgs) -> RuntimeResult {
    Ok(Value::list(
        receiver_entries(&args).into_iter().map(|(k, _)| k).collect(),
    ))
}

fn dict_values(args: CallArgs) -> RuntimeResult {
    Ok(Value::list(
        receiver_entries(&args).into_iter().map(|(_, v)| v).collect(),
    ))
}

fn dict_items(args: CallArgs) -> RuntimeResult {
    Ok(Value::list(
        receiver_entries(&args)
            .into_iter()
            .map(|(k, v)| Value::tuple(vec![k, v]))
            .collect(),
    ))
}

fn list_append(args: CallArgs) -> RuntimeResult {
    if let (Some(list), Some(item)) = (args.arg(0), args.arg(1)) {
        list.list_push(item.clone());
    }
    Ok(Value::None)
}
