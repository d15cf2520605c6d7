use super::*;
use crate::RuntimeResult;
use pretty_assertions::assert_eq;

fn builtin(kind: BuiltinKind) -> Value {
    Value::Class(builtin_class(kind))
}

fn init_sets_x(args: CallArgs) -> RuntimeResult {
    if let (Some(receiver), Some(x)) = (args.arg(0), args.arg(1)) {
        set_attribute(receiver, Name::intern("x"), x.clone())?;
    }
    Ok(Value::None)
}

fn get_x(args: CallArgs) -> RuntimeResult {
    match args.arg(0) {
        Some(receiver) => get_attribute(receiver, Name::intern("x")),
        None => Ok(Value::None),
    }
}

fn point_class() -> ClassRef {
    let class = ClassObj::new(
        Name::intern("Point"),
        Name::intern("geometry"),
        Vec::new(),
        ClassKind::Plain,
    )
    .with_attrs(vec![
        (Name::intern("__init__"), Value::native("__init__", init_sets_x)),
        (Name::intern("getx"), Value::native("getx", get_x)),
        (
            Name::intern("x_prop"),
            Value::property(Value::native("x_prop", get_x), None),
        ),
    ]);
    match Value::class(class) {
        Value::Class(class) => class,
        _ => unreachable!(),
    }
}

#[test]
fn test_numeric_equality_crosses_kinds() {
    assert_eq!(Value::Bool(true), Value::int(1));
    assert_eq!(Value::Float(2.0), Value::int(2));
    assert_ne!(Value::string("1"), Value::int(1));
}

#[test]
fn test_containers_compare_structurally_but_not_by_identity() {
    let a = Value::list(vec![Value::int(1), Value::string("x")]);
    let b = Value::list(vec![Value::int(1), Value::string("x")]);
    assert_eq!(a, b);
    assert!(!a.is(&b));
    assert!(a.is(&a.clone()));
}

#[test]
fn test_dict_deduplicates_keys() {
    let d = Value::dict(vec![
        (Value::string("a"), Value::int(1)),
        (Value::string("a"), Value::int(2)),
    ]);
    assert_eq!(d.len(), Some(1));
    assert_eq!(d.dict_get(&Value::string("a")), Some(Value::int(2)));
}

#[test]
fn test_repr_matches_host_spelling() {
    assert_eq!(Value::tuple(vec![Value::int(1)]).repr(), "(1,)");
    assert_eq!(Value::set(Vec::new()).repr(), "set()");
    assert_eq!(
        Value::dict(vec![(Value::string("k"), Value::None)]).repr(),
        "{'k': None}"
    );
    assert_eq!(Value::Bool(false).repr(), "False");
}

#[test]
fn test_class_of_builtins() {
    assert_eq!(Value::int(3).type_name(), "int");
    assert_eq!(Value::None.qualified_type_name(), "None");
    assert!(Value::Bool(true).is_instance_of(&builtin_class(BuiltinKind::Int)));
    assert!(!Value::Float(1.0).is_instance_of(&builtin_class(BuiltinKind::Int)));
}

#[test]
fn test_construct_runs_init_and_binds_methods() {
    let class = point_class();
    let point = call_value(&Value::Class(class.clone()), CallArgs::new([Value::int(7)])).unwrap();
    assert_eq!(point.qualified_type_name(), "geometry.Point");

    let getx = get_attribute(&point, Name::intern("getx")).unwrap();
    assert!(matches!(getx, Value::BoundMethod(_)));
    assert_eq!(call_value(&getx, CallArgs::default()).unwrap(), Value::int(7));

    let via_property = get_attribute(&point, Name::intern("x_prop")).unwrap();
    assert_eq!(via_property, Value::int(7));
}

#[test]
fn test_missing_attribute_is_an_error() {
    let err = get_attribute(&Value::int(1), Name::intern("nope")).unwrap_err();
    assert_eq!(err.to_string(), "'int' object has no attribute 'nope'");
}

#[test]
fn test_property_without_setter_rejects_assignment() {
    let point = construct(&point_class(), CallArgs::new([Value::int(1)])).unwrap();
    assert!(set_attribute(&point, Name::intern("x_prop"), Value::int(2)).is_err());
}

#[test]
fn test_builtin_conversions() {
    let int = builtin(BuiltinKind::Int);
    assert_eq!(
        call_value(&int, CallArgs::new([Value::string(" 42 ")])).unwrap(),
        Value::int(42)
    );
    assert_eq!(
        call_value(&int, CallArgs::new([Value::Float(-2.7)])).unwrap(),
        Value::int(-2)
    );
    assert!(call_value(&int, CallArgs::new([Value::string("x")])).is_err());

    let list = call_value(
        &builtin(BuiltinKind::List),
        CallArgs::new([Value::string("ab")]),
    )
    .unwrap();
    assert_eq!(list, Value::list(vec![Value::string("a"), Value::string("b")]));
}

#[test]
fn test_exceptions_carry_args() {
    let err = call_value(
        &builtin(BuiltinKind::ValueError),
        CallArgs::new([Value::string("bad value")]),
    )
    .unwrap();
    assert_eq!(err.exception_text(), "ValueError: bad value");
}

#[test]
fn test_partial_supplies_leading_arguments() {
    let class = point_class();
    let make = Value::partial(Value::Class(class), vec![Value::int(9)], Vec::new());
    let point = call_value(&make, CallArgs::default()).unwrap();
    assert_eq!(
        get_attribute(&point, Name::intern("x")).unwrap(),
        Value::int(9)
    );
}

#[test]
fn test_callable_signature_drops_receiver() {
    let params = vec![
        SigParam::new("self", rtg_ir::ParamKind::PositionalOrKeyword),
        SigParam::new("a", rtg_ir::ParamKind::PositionalOrKeyword),
        SigParam::new("b", rtg_ir::ParamKind::PositionalOrKeyword),
    ];
    let mut func = FunctionValue::native("m", get_x);
    func.signature = Signature::new(params);
    let method = Value::bound_method(Value::None, Value::function(func));
    let sig = callable_signature(&method).unwrap();
    assert_eq!(sig.required_positional(), 2);

    let partial = Value::partial(method, vec![Value::int(1)], Vec::new());
    assert_eq!(callable_signature(&partial).unwrap().max_positional(), Some(1));
    assert!(callable_signature(&Value::int(1)).is_none());
}

#[test]
fn test_newtype_call_is_identity() {
    let user_id = Value::new_type(Name::intern("UserId"), builtin(BuiltinKind::Int));
    let out = call_value(&user_id, CallArgs::new([Value::int(5)])).unwrap();
    assert!(out.is(&Value::int(5)));
}
