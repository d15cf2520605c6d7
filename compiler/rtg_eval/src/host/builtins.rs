//! The builtins frame.

use rtg_ir::Name;
use rtg_types::{
    bad_arguments, builtin_class, exhausted, not_iterable, BuiltinKind, CallArgs, RuntimeResult,
    Step, Value,
};

pub(super) fn entries() -> Vec<(Name, Value)> {
    let mut entries: Vec<(Name, Value)> = BuiltinKind::ALL
        .into_iter()
        .filter(|kind| kind.is_public())
        .map(|kind| (Name::intern(kind.name()), Value::Class(builtin_class(kind))))
        .collect();
    let natives: [(&str, rtg_types::NativeFn); 8] = [
        ("isinstance", isinstance),
        ("len", len),
        ("next", next),
        ("range", range),
        ("repr", repr),
        ("staticmethod", staticmethod),
        ("classmethod", classmethod),
        ("property", property),
    ];
    entries.extend(
        natives
            .into_iter()
            .map(|(name, func)| (Name::intern(name), Value::native(name, func))),
    );
    entries.push((Name::intern("NotImplemented"), Value::NotImplemented));
    entries.push((Name::intern("Ellipsis"), Value::Ellipsis));
    entries
}

fn single(function: &str, args: &CallArgs) -> RuntimeResult {
    match args.positional.as_slice() {
        [value] if args.keywords.is_empty() => Ok(value.clone()),
        _ => Err(bad_arguments(function, "takes exactly one argument")),
    }
}

fn isinstance(args: CallArgs) -> RuntimeResult {
    let [value, classes] = args.positional.as_slice() else {
        return Err(bad_arguments("isinstance", "expected 2 arguments"));
    };
    let candidates = match classes {
        Value::Tuple(items) => items.to_vec(),
        other => vec![other.clone()],
    };
    let mut matched = false;
    for candidate in &candidates {
        let Some(class) = candidate.as_class() else {
            return Err(bad_arguments(
                "isinstance",
                "arg 2 must be a type or tuple of types",
            ));
        };
        matched |= value.is_instance_of(class);
    }
    Ok(Value::Bool(matched))
}

fn len(args: CallArgs) -> RuntimeResult {
    let value = single("len", &args)?;
    let n = value.len().ok_or_else(|| {
        bad_arguments(
            "len",
            format!("object of type '{}' has no len()", value.type_name()),
        )
    })?;
    Ok(Value::Int(i64::try_from(n).unwrap_or(i64::MAX)))
}

fn next(args: CallArgs) -> RuntimeResult {
    let value = single("next", &args)?;
    let Value::Generator(generator) = &value else {
        return Err(not_iterable(&value));
    };
    match generator.next()? {
        Step::Yielded(item) => Ok(item),
        Step::Complete(result) => Err(exhausted(result)),
    }
}

fn range(args: CallArgs) -> RuntimeResult {
    let bounds: Option<Vec<i64>> = args.positional.iter().map(Value::as_int).collect();
    let (start, stop) = match bounds.as_deref() {
        Some([stop]) => (0, *stop),
        Some([start, stop]) => (*start, *stop),
        _ => return Err(bad_arguments("range", "expected 1 or 2 integer arguments")),
    };
    Ok(Value::list((start..stop).map(Value::Int).collect()))
}

fn repr(args: CallArgs) -> RuntimeResult {
    Ok(Value::string(single("repr", &args)?.repr()))
}

fn staticmethod(args: CallArgs) -> RuntimeResult {
    Ok(Value::static_method(single("staticmethod", &args)?))
}

fn classmethod(args: CallArgs) -> RuntimeResult {
    Ok(Value::class_method(single("classmethod", &args)?))
}

fn property(args: CallArgs) -> RuntimeResult {
    let getter = args
        .arg(0)
        .cloned()
        .ok_or_else(|| bad_arguments("property", "missing getter"))?;
    let setter = args.arg(1).or_else(|| args.keyword("fset")).cloned();
    Ok(Value::property(getter, setter))
}
