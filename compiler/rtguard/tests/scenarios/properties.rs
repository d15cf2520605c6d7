//! Totality properties of `check_type`.

use proptest::prelude::*;
use rtguard::{check_type, Value};

use crate::common::{builtin, generic, shared, typing};

fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::None),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::int),
        any::<f64>().prop_map(Value::Float),
        "[a-z]{0,8}".prop_map(Value::string),
        prop::collection::vec(any::<u8>(), 0..6).prop_map(Value::bytes),
    ]
}

fn value() -> impl Strategy<Value = Value> {
    prop_oneof![
        scalar(),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::list),
        prop::collection::vec(scalar(), 0..4).prop_map(Value::tuple),
        prop::collection::vec(("[a-z]{1,4}", scalar()), 0..3).prop_map(|entries| {
            Value::dict(
                entries
                    .into_iter()
                    .map(|(key, value)| (Value::string(key), value))
                    .collect(),
            )
        }),
    ]
}

proptest! {
    #[test]
    fn test_any_accepts_everything(value in value()) {
        let _serial = shared();
        prop_assert!(check_type(value, &typing("Any"), None).is_ok());
    }

    #[test]
    fn test_never_rejects_everything(value in value()) {
        let _serial = shared();
        let result = check_type(value, &typing("Never"), None);
        prop_assert!(result.is_err_and(|err| err.as_type_check().is_some()));
    }

    #[test]
    fn test_conforming_values_come_back_unchanged(items in prop::collection::vec(any::<i64>(), 0..8)) {
        let _serial = shared();
        let value = Value::list(items.into_iter().map(Value::int).collect());
        let annotation = generic(&typing("List"), vec![builtin("int")]);
        let checked = check_type(value.clone(), &annotation, None);
        prop_assert!(checked.is_ok_and(|checked| checked.is(&value)));
    }
}
