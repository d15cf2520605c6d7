use super::*;
use crate::engine::check_type_internal;
use crate::test_support;
use pretty_assertions::assert_eq;
use rtg_types::{builtin_class, BuiltinKind, ClassKind, ClassObj, Name, Origin};

fn int_desc() -> TypeDesc {
    TypeDesc::instance(builtin_class(BuiltinKind::Int))
}

#[test]
fn test_builtin_lookup_registered_first() {
    let _serial = test_support::shared();
    let lookups = checker_lookups();
    assert_eq!(lookups[0].name(), "builtin");
}

#[test]
fn test_appended_lookup_runs_only_for_declined_descriptors() {
    let _serial = test_support::exclusive();
    fn reject(_: &Value, _: &TypeDesc, _: &mut TypeCheckMemo) -> Result<(), CheckError> {
        Err(crate::errors::mismatch("rejected by plugin"))
    }
    register_lookup(lookup_fn("late", |_| Some(Checker::Native(reject))));
    let mut memo = TypeCheckMemo::default();
    assert!(check_type_internal(&Value::int(1), &int_desc(), &mut memo).is_ok());
    assert!(remove_lookup("late"));
}

#[test]
fn test_priority_lookup_overrides_builtin() {
    let _serial = test_support::exclusive();
    let accept_all: DynCheckFn = Arc::new(|_: &Value, _: &TypeDesc, _: &mut TypeCheckMemo| Ok(()));
    register_lookup_at(
        0,
        lookup_fn("lenient", move |desc| {
            matches!(desc.origin, Origin::Instance(_)).then(|| Checker::Dynamic(accept_all.clone()))
        }),
    );
    let mut memo = TypeCheckMemo::default();
    let result = check_type_internal(&Value::string("x"), &int_desc(), &mut memo);
    assert!(remove_lookup("lenient"));
    assert!(result.is_ok());
}

#[test]
fn test_empty_registry_reports_unsupported_type() {
    let _serial = test_support::exclusive();
    remove_lookup("builtin");
    let mut memo = TypeCheckMemo::default();
    reset_lookups();
    let err = check_type_internal(&Value::int(1), &int_desc(), &mut memo).unwrap_err();
    assert!(matches!(err, CheckError::UnsupportedType { .. }));
    assert_eq!(err.to_string(), "no checker is registered for int");
}

#[test]
fn test_memo_keeps_registry_snapshot() {
    let _serial = test_support::exclusive();
    let mut memo = TypeCheckMemo::default();
    reset_lookups();
    register_lookup(lookup_fn("after", |_| None));
    assert_eq!(memo.lookups().len(), 1);
    assert!(check_type_internal(&Value::int(1), &int_desc(), &mut memo).is_ok());
    assert!(remove_lookup("after"));
}

#[test]
fn test_test_double_passes_any_shape() {
    let _serial = test_support::exclusive();
    let mock = Value::class(ClassObj::new(
        Name::intern("Mock"),
        Name::intern("unittest.mock"),
        Vec::new(),
        ClassKind::Plain,
    ));
    let Value::Class(mock_class) = &mock else {
        unreachable!()
    };
    register_test_double(mock_class.clone());
    let instance = Value::instance(mock_class.clone());
    let mut memo = TypeCheckMemo::default();
    let result = check_type_internal(&instance, &int_desc(), &mut memo);
    unregister_test_double(mock_class);
    assert!(result.is_ok());
    assert!(!is_test_double(&instance));
}
