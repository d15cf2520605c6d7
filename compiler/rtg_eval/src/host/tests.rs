use super::*;
use crate::test_support::{self, call};
use pretty_assertions::assert_eq;
use rtg_types::{get_attribute, CallArgs, RuntimeErrorKind};

fn builtin(name: &str) -> Value {
    builtins()
        .lookup(Name::intern(name))
        .unwrap_or_else(|| panic!("no builtin '{name}'"))
}

fn member(module: &str, name: &str) -> Value {
    let module = host_module(module).unwrap_or_else(|| panic!("no host module '{module}'"));
    get_attribute(&module, Name::intern(name)).unwrap()
}

#[test]
fn test_builtins_frame_is_shared() {
    assert!(builtins().ptr_eq(&builtins()));
    assert!(host_module("typing")
        .zip(host_module("typing"))
        .is_some_and(|(a, b)| a.is(&b)));
    assert!(host_module("collections").is_none());
}

#[test]
fn test_len_and_range() {
    let list = call(&builtin("range"), [Value::int(2), Value::int(5)]).unwrap();
    let items: Vec<i64> = list
        .iter_snapshot()
        .unwrap()
        .iter()
        .filter_map(Value::as_int)
        .collect();
    assert_eq!(items, vec![2, 3, 4]);
    assert_eq!(call(&builtin("len"), [list]).unwrap().as_int(), Some(3));

    let err = call(&builtin("len"), [Value::int(1)]).unwrap_err();
    assert_eq!(err.to_string(), "len() object of type 'int' has no len()");
}

#[test]
fn test_isinstance_accepts_tuples_of_classes() {
    let int = builtin("int");
    let str_ = builtin("str");
    let either = Value::tuple(vec![int.clone(), str_]);
    let isinstance = builtin("isinstance");
    assert!(call(&isinstance, [Value::string("x"), either]).unwrap().is_truthy());
    assert!(call(&isinstance, [Value::Bool(true), int]).unwrap().is_truthy());
    assert!(call(&isinstance, [Value::int(1), Value::int(1)]).is_err());
}

#[test]
fn test_type_var_rejects_single_constraint() {
    let type_var = member("typing", "TypeVar");
    let int = builtin("int");
    let err = call(&type_var, [Value::string("T"), int.clone()]).unwrap_err();
    assert!(matches!(err.kind, RuntimeErrorKind::Arguments { .. }));

    let bounded = call_value(
        &type_var,
        CallArgs {
            positional: [Value::string("T")].into_iter().collect(),
            keywords: vec![(Name::intern("bound"), int)],
        },
    )
    .unwrap();
    let Value::TypeVar(var) = &bounded else {
        panic!("expected a type variable, got {}", bounded.type_name());
    };
    assert_eq!(var.name.as_str(), "T");
    assert!(var.bound.is_some());
}

#[test]
fn test_no_type_check_marks_functions() {
    let target = Value::native("f", |_| Ok(Value::None));
    // Native functions carry no IR; marking copies the value.
    let marked = call(&member("typing", "no_type_check"), [target]).unwrap();
    let marks = marked.as_function().map(|func| func.marks);
    assert_eq!(marks.map(|m| m.contains(rtg_types::FunctionMarks::NO_CHECK)), Some(true));
}

#[test]
fn test_check_type_returns_value_unchanged() {
    let _serial = test_support::shared();
    let check = member("rtguard", "check_type");
    let value = Value::list(vec![Value::int(1)]);
    let list = builtin("list");
    let checked = call(&check, [value.clone(), list]).unwrap();
    assert!(checked.is(&value));

    let err = call(&check, [Value::int(1), builtin("str")]).unwrap_err();
    assert!(err.is_type_check(), "{err}");
}

#[test]
fn test_check_type_accepts_policy_members() {
    let _serial = test_support::shared();
    let check = member("rtguard", "check_type");
    let strategy = member("rtguard", "CollectionCheckStrategy");
    let all_items = get_attribute(&strategy, Name::intern("ALL_ITEMS")).unwrap();
    let list_of_str = subscript(&member("typing", "List"), &builtin("str"));
    let mixed = Value::list(vec![
        Value::string("a"),
        Value::string("b"),
        Value::int(3),
    ]);

    assert!(call(&check, [mixed.clone(), list_of_str.clone()]).is_ok());
    let err = call_value(
        &check,
        CallArgs {
            positional: [mixed, list_of_str].into_iter().collect(),
            keywords: vec![(Name::intern("collection_check_strategy"), all_items)],
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("item 2"), "{err}");
}

#[test]
fn test_check_type_rejects_unknown_keywords() {
    let check = member("rtguard", "check_type");
    let err = call_value(
        &check,
        CallArgs {
            positional: [Value::int(1), builtin("int")].into_iter().collect(),
            keywords: vec![(Name::intern("strict"), Value::Bool(true))],
        },
    )
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "check_type() got an unexpected keyword argument 'strict'"
    );
}

#[test]
fn test_typechecked_without_target_is_a_decorator_factory() {
    let typechecked = member("rtguard", "typechecked");
    let factory = call_value(
        &typechecked,
        CallArgs {
            positional: Default::default(),
            keywords: vec![(Name::intern("forward_ref_policy"), Value::string("IGNORE"))],
        },
    )
    .unwrap();
    assert!(factory.is_callable());

    let err = call_value(
        &typechecked,
        CallArgs {
            positional: Default::default(),
            keywords: vec![(Name::intern("forward_ref_policy"), Value::string("LOUD"))],
        },
    )
    .unwrap_err();
    assert!(err.to_string().contains("invalid value for 'forward_ref_policy'"));
}

fn subscript(base: &Value, index: &Value) -> Value {
    rtg_types::subscript_annotation(base, index).unwrap()
}

fn call_value(callee: &Value, args: CallArgs) -> rtg_types::RuntimeResult {
    rtg_types::call_value(callee, args)
}
