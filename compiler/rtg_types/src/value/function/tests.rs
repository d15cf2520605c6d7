use super::*;
use pretty_assertions::assert_eq;

fn sig() -> Signature {
    Signature::new(vec![
        SigParam::new("a", ParamKind::PositionalOnly),
        SigParam::new("b", ParamKind::PositionalOrKeyword).with_default(Value::int(2)),
        SigParam::new("rest", ParamKind::VarPositional),
        SigParam::new("flag", ParamKind::KeywordOnly).with_default(Value::Bool(false)),
        SigParam::new("extra", ParamKind::VarKeyword),
    ])
}

fn names(bound: &BoundArguments) -> Vec<&'static str> {
    bound.values.iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn test_bind_fills_defaults_and_collections() {
    let bound = sig().bind("f", CallArgs::new([Value::int(1)])).unwrap();
    assert_eq!(names(&bound), vec!["a", "b", "rest", "flag", "extra"]);
    assert_eq!(bound.get(Name::intern("b")), Some(&Value::int(2)));
    assert_eq!(bound.get(Name::intern("rest")), Some(&Value::tuple(vec![])));
}

#[test]
fn test_bind_routes_surplus_arguments() {
    let args = CallArgs::new([Value::int(1), Value::int(5), Value::int(6)])
        .with_keyword("flag", Value::Bool(true))
        .with_keyword("other", Value::string("x"));
    let bound = sig().bind("f", args).unwrap();
    assert_eq!(
        bound.get(Name::intern("rest")),
        Some(&Value::tuple(vec![Value::int(6)]))
    );
    assert_eq!(
        bound.get(Name::intern("extra")),
        Some(&Value::dict(vec![(Value::string("other"), Value::string("x"))]))
    );
}

#[test]
fn test_bind_rejects_positional_only_by_keyword() {
    let strict = Signature::new(vec![SigParam::new("a", ParamKind::PositionalOnly)]);
    let err = strict
        .bind("f", CallArgs::default().with_keyword("a", Value::int(1)))
        .unwrap_err();
    assert_eq!(err.message, "f() got an unexpected keyword argument 'a'");
}

#[test]
fn test_bind_reports_missing_and_duplicate() {
    let simple = Signature::new(vec![SigParam::new("x", ParamKind::PositionalOrKeyword)]);
    let missing = simple.bind("g", CallArgs::default()).unwrap_err();
    assert_eq!(missing.message, "g() missing required argument: 'x'");
    let duplicate = simple
        .bind(
            "g",
            CallArgs::new([Value::int(1)]).with_keyword("x", Value::int(2)),
        )
        .unwrap_err();
    assert_eq!(duplicate.message, "g() got multiple values for argument 'x'");
    let surplus = simple
        .bind("g", CallArgs::new([Value::int(1), Value::int(2)]))
        .unwrap_err();
    assert_eq!(surplus.message, "g() takes 1 positional arguments but 2 were given");
}

#[test]
fn test_arity_queries() {
    let s = sig();
    assert_eq!(s.required_positional(), 1);
    assert_eq!(s.max_positional(), None);
    assert!(!s.has_required_keyword_only());
    let reduced = s.without_supplied(1, &[Name::intern("flag")]);
    assert_eq!(reduced.params.len(), 3);
    assert_eq!(reduced.required_positional(), 0);
}

#[test]
fn test_native_function_receives_raw_arguments() {
    fn count(args: CallArgs) -> RuntimeResult {
        Ok(Value::int(i64::try_from(args.positional.len()).unwrap_or_default()))
    }
    let func = FunctionValue::native("count", count);
    let result = func.call(CallArgs::new([Value::None, Value::None])).unwrap();
    assert_eq!(result, Value::int(2));
    assert!(!func.is_checked());
}
