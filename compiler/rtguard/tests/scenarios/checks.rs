//! Direct checks through `check_type`.

use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rtguard::{
    check_type, global_config, import_module, set_global_config, suppress_type_checks, union_of,
    update_global_config, CheckError, CollectionCheckStrategy, ConfigOverrides, TypeCheckError,
    TypeCheckMemo, Value,
};

use crate::common::{
    attr, builtin, exclusive, generic, person, person_module, provide, shared, typing,
};

fn failure(result: Result<Value, CheckError>) -> String {
    match result {
        Ok(value) => panic!("expected a type-check failure, got {value:?}"),
        Err(err) => {
            assert!(err.as_type_check().is_some(), "not a type-check failure: {err}");
            err.to_string()
        }
    }
}

#[test]
fn test_record_scenario() {
    let _serial = shared();
    provide([person_module("scenario_people")]);
    let people = import_module("scenario_people").unwrap();
    let record = attr(&people, "Person");

    let ann = person("Ann", Value::int(30));
    let checked = check_type(ann.clone(), &record, None).unwrap();
    assert!(checked.is(&ann));

    let message = failure(check_type(person("Ann", Value::string("30")), &record, None));
    assert!(message.contains("age"), "{message}");
}

#[test]
fn test_record_reports_missing_and_extra_keys() {
    let _serial = shared();
    provide([person_module("scenario_people_keys")]);
    let record = attr(&import_module("scenario_people_keys").unwrap(), "Person");

    let missing = Value::dict(vec![(Value::string("name"), Value::string("Ann"))]);
    assert!(failure(check_type(missing, &record, None)).contains("age"));

    let extra = person("Ann", Value::int(30));
    extra.dict_set(Value::string("email"), Value::string("ann@example.com"));
    assert!(failure(check_type(extra, &record, None)).contains("email"));
}

#[test]
fn test_union_short_circuit() {
    let _serial = shared();
    let union = union_of(vec![builtin("int"), builtin("str")]);
    assert_eq!(
        check_type(Value::string("x"), &union, None).unwrap().as_str(),
        Some("x")
    );
    let message = failure(check_type(Value::Float(3.5), &union, None));
    assert!(message.starts_with("float did not match any element in the union"), "{message}");
}

#[test]
fn test_collection_strategy() {
    let _serial = shared();
    let list_of_str = generic(&typing("List"), vec![builtin("str")]);
    let mixed = || {
        Value::list(vec![
            Value::string("a"),
            Value::string("b"),
            Value::int(3),
        ])
    };

    let first_item =
        ConfigOverrides::default().collection_check_strategy(CollectionCheckStrategy::FirstItem);
    assert!(check_type(mixed(), &list_of_str, Some(&first_item)).is_ok());

    let all_items =
        ConfigOverrides::default().collection_check_strategy(CollectionCheckStrategy::AllItems);
    let message = failure(check_type(mixed(), &list_of_str, Some(&all_items)));
    assert!(message.starts_with("item 2 of list"), "{message}");
}

#[test]
fn test_empty_fixed_tuple() {
    let _serial = shared();
    let empty = generic(&typing("Tuple"), vec![Value::tuple(Vec::new())]);
    assert!(check_type(Value::tuple(Vec::new()), &empty, None).is_ok());
    failure(check_type(Value::tuple(vec![Value::int(1)]), &empty, None));
}

#[test]
fn test_literal_true_rejects_one() {
    let _serial = shared();
    let literal = generic(&typing("Literal"), vec![Value::Bool(true)]);
    assert!(check_type(Value::Bool(true), &literal, None).is_ok());
    failure(check_type(Value::int(1), &literal, None));
}

#[test]
fn test_suppression_nests_by_count() {
    let _serial = exclusive();
    let str_ = builtin("str");

    let outer = suppress_type_checks();
    let inner = suppress_type_checks();
    drop(inner);
    assert!(check_type(Value::int(1), &str_, None).is_ok());
    drop(outer);
    failure(check_type(Value::int(1), &str_, None));
}

#[test]
fn test_fail_callback_replaces_raising() {
    let _serial = shared();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let overrides = ConfigOverrides::default().typecheck_fail_callback(Arc::new(move |err, _| {
        sink.lock().push(err.to_string());
    }));

    let value = check_type(Value::int(1), &builtin("str"), Some(&overrides)).unwrap();
    assert_eq!(value.as_int(), Some(1));
    assert_eq!(seen.lock().as_slice(), ["int is not an instance of str"]);
}

#[test]
fn test_direct_checks_ignore_global_config() {
    let _serial = exclusive();
    let previous = global_config();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    update_global_config(|config| {
        config.collection_check_strategy = CollectionCheckStrategy::AllItems;
        config.typecheck_fail_callback = Some(Arc::new(
            move |err: &TypeCheckError, _: &TypeCheckMemo| {
                sink.lock().push(err.to_string());
            },
        ));
    });

    let list_of_str = generic(&typing("List"), vec![builtin("str")]);
    let mixed = Value::list(vec![Value::string("a"), Value::string("b"), Value::int(3)]);
    let first_item_only = check_type(mixed, &list_of_str, None);
    let raised = check_type(Value::int(1), &builtin("str"), None);
    set_global_config(previous);

    assert!(first_item_only.is_ok());
    assert_eq!(failure(raised), "int is not an instance of str");
    assert!(seen.lock().is_empty());
}
