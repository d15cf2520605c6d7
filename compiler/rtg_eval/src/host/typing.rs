//! The `typing` module (also served as `typing_extensions`).

use rtg_ir::Name;
use rtg_types::{
    bad_arguments, CallArgs, FunctionMarks, FunctionValue, RuntimeResult, SpecialForm,
    TypeVarObj, Value,
};

use super::keyword;

pub(super) fn entries() -> Vec<(Name, Value)> {
    let mut entries: Vec<(Name, Value)> = SpecialForm::ALL
        .into_iter()
        .map(|form| (Name::intern(form.name()), Value::Form(form)))
        .collect();
    entries.push((Name::intern("TYPE_CHECKING"), Value::Bool(false)));
    for (name, func) in [
        ("TypeVar", type_var as rtg_types::NativeFn),
        ("NewType", new_type),
        ("no_type_check", no_type_check),
        ("cast", cast),
    ] {
        entries.push((Name::intern(name), Value::native(name, func)));
    }
    entries
}

fn flag(args: &CallArgs, name: &str) -> bool {
    args.keyword(name).is_some_and(Value::is_truthy)
}

fn type_var(args: CallArgs) -> RuntimeResult {
    let Some(name) = args.arg(0).and_then(Value::as_str) else {
        return Err(bad_arguments("TypeVar", "first argument must be a name string"));
    };
    let constraints: Vec<Value> = args.positional.iter().skip(1).cloned().collect();
    if constraints.len() == 1 {
        return Err(bad_arguments(
            "TypeVar",
            "a single constraint is not allowed",
        ));
    }
    let bound = keyword(&args.keywords, "bound")
        .filter(|bound| !matches!(bound, Value::None))
        .cloned();
    Ok(Value::type_var(TypeVarObj {
        name: Name::intern(name),
        bound,
        constraints,
        covariant: flag(&args, "covariant"),
        contravariant: flag(&args, "contravariant"),
    }))
}

fn new_type(args: CallArgs) -> RuntimeResult {
    match args.positional.as_slice() {
        [name, supertype] => match name.as_str() {
            Some(name) => Ok(Value::new_type(Name::intern(name), supertype.clone())),
            None => Err(bad_arguments("NewType", "first argument must be a name string")),
        },
        _ => Err(bad_arguments("NewType", "expected 2 arguments")),
    }
}

/// Mark a function so no instrumentation layer touches it.
pub(super) fn mark_unchecked(function: &str, args: &CallArgs) -> RuntimeResult {
    let [target] = args.positional.as_slice() else {
        return Err(bad_arguments(function, "takes exactly one argument"));
    };
    Ok(match target {
        Value::Function(func) => {
            let mut marked = FunctionValue::clone(func);
            marked.marks |= FunctionMarks::NO_CHECK;
            Value::function(marked)
        }
        other => other.clone(),
    })
}

fn no_type_check(args: CallArgs) -> RuntimeResult {
    mark_unchecked("no_type_check", &args)
}

fn cast(args: CallArgs) -> RuntimeResult {
    match args.positional.as_slice() {
        [_, value] => Ok(value.clone()),
        _ => Err(bad_arguments("cast", "expected 2 arguments")),
    }
}
