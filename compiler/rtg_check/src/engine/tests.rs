use super::*;
use crate::config::TypeCheckConfiguration;
use crate::registry::{register_test_double, unregister_test_double};
use crate::suppress::suppress_type_checks;
use crate::test_support;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rtg_ir::{ForwardRefPolicy, Name};
use rtg_types::{builtin_class, BuiltinKind, ClassKind, ClassObj, ScopeHandle, StaticScope};

fn int() -> TypeDesc {
    TypeDesc::instance(builtin_class(BuiltinKind::Int))
}

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::int),
        any::<f64>().prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::string),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar(),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::list),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::tuple),
    ]
}

#[test]
fn test_never_rejects() {
    let _serial = test_support::shared();
    let err = check_type_internal(&Value::None, &TypeDesc::never(), &mut TypeCheckMemo::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "is not allowed");
}

#[test]
fn test_deferred_reference_resolves_in_memo_scope() {
    let _serial = test_support::shared();
    let scope = ScopeHandle::new(
        StaticScope::new(
            "app",
            [(Name::intern("Count"), Value::Class(builtin_class(BuiltinKind::Int)))],
        )
        .into_ref(),
    );
    let mut memo = TypeCheckMemo::new(Some(scope), TypeCheckConfiguration::default());
    let desc = TypeDesc::deferred("Count", None);
    assert!(check_type_internal(&Value::int(1), &desc, &mut memo).is_ok());
    let err = check_type_internal(&Value::string("1"), &desc, &mut memo).unwrap_err();
    assert_eq!(err.to_string(), "is not an instance of int");
}

#[test]
fn test_unresolvable_reference_follows_policy() {
    let _serial = test_support::shared();
    let desc = TypeDesc::deferred("Nowhere", None);
    let ignore = TypeCheckConfiguration {
        forward_ref_policy: ForwardRefPolicy::Ignore,
        ..TypeCheckConfiguration::default()
    };
    assert!(check_type_internal(&Value::int(1), &desc, &mut TypeCheckMemo::new(None, ignore)).is_ok());

    let error = TypeCheckConfiguration {
        forward_ref_policy: ForwardRefPolicy::Error,
        ..TypeCheckConfiguration::default()
    };
    let err = check_type_internal(&Value::int(1), &desc, &mut TypeCheckMemo::new(None, error))
        .unwrap_err();
    assert!(matches!(err, CheckError::ForwardRef { .. }));
}

#[test]
fn test_suppression_skips_checks() {
    let _serial = test_support::exclusive();
    let guard = suppress_type_checks();
    let result = check_type_internal(&Value::string("x"), &int(), &mut TypeCheckMemo::default());
    drop(guard);
    assert!(result.is_ok());
    assert!(check_type_internal(&Value::string("x"), &int(), &mut TypeCheckMemo::default()).is_err());
}

#[test]
fn test_test_double_passes_every_check() {
    let _serial = test_support::exclusive();
    let mock = ClassObj::new(
        Name::intern("Mock"),
        Name::intern("testing"),
        Vec::new(),
        ClassKind::Plain,
    );
    let Value::Class(mock) = Value::class(mock) else {
        unreachable!()
    };
    register_test_double(mock.clone());
    let double = Value::instance(mock.clone());
    let as_int = check_type_internal(&double, &int(), &mut TypeCheckMemo::default());
    let as_never =
        check_type_internal(&double, &TypeDesc::never(), &mut TypeCheckMemo::default());
    unregister_test_double(&mock);
    assert!(as_int.is_ok());
    // `Never` still rejects a test double.
    assert!(as_never.is_err());
}

#[test]
fn test_deeply_nested_descriptor() {
    let _serial = test_support::shared();
    let mut desc = int();
    let mut value = Value::int(1);
    for _ in 0..500 {
        desc = TypeDesc::new(rtg_types::Origin::Sequence(rtg_types::SequenceKind::List))
            .with_params(vec![desc]);
        value = Value::list(vec![value]);
    }
    assert!(check_type_internal(&value, &desc, &mut TypeCheckMemo::default()).is_ok());
}

proptest! {
    #[test]
    fn test_any_accepts_everything(value in value()) {
        let _serial = test_support::shared();
        prop_assert!(check_type_internal(&value, &TypeDesc::any(), &mut TypeCheckMemo::default()).is_ok());
    }

    #[test]
    fn test_never_rejects_everything(value in value()) {
        let _serial = test_support::shared();
        let result = check_type_internal(&value, &TypeDesc::never(), &mut TypeCheckMemo::default());
        prop_assert!(matches!(result, Err(CheckError::TypeCheck(_))));
    }

    #[test]
    fn test_int_accepts_exactly_ints(value in value()) {
        let _serial = test_support::shared();
        let accepted = check_type_internal(&value, &int(), &mut TypeCheckMemo::default()).is_ok();
        prop_assert_eq!(accepted, matches!(value, Value::Int(_) | Value::Bool(_)));
    }
}
