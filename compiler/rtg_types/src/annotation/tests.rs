use super::*;
use crate::scope::StaticScope;
use crate::value::SpecialForm;
use pretty_assertions::assert_eq;

fn typing_scope() -> StaticScope {
    let mut entries: Vec<(Name, Value)> = SpecialForm::ALL
        .into_iter()
        .map(|form| (Name::intern(form.name()), Value::Form(form)))
        .collect();
    entries.push((Name::intern("Alias"), Value::string("not a type")));
    StaticScope::new("tests", entries)
}

#[test]
fn test_evaluate_generic_against_scope() {
    let scope = typing_scope();
    let value = evaluate_annotation("List[int]", Some(&scope)).unwrap();
    assert_eq!(value.repr(), "List[int]");
}

#[test]
fn test_optional_spelled_with_pipe() {
    let scope = typing_scope();
    let piped = evaluate_annotation("int | None", Some(&scope)).unwrap();
    let optional = evaluate_annotation("Optional[int]", Some(&scope)).unwrap();
    assert!(piped.equals(&optional));
}

#[test]
fn test_nested_string_stays_a_string() {
    let scope = typing_scope();
    let value = evaluate_annotation("List['Node']", Some(&scope)).unwrap();
    let Value::Alias(alias) = &value else {
        panic!("expected alias, got {value:?}");
    };
    assert_eq!(alias.args[0].as_str(), Some("Node"));
}

#[test]
fn test_builtins_resolve_without_scope() {
    let value = evaluate_annotation("dict", None).unwrap();
    assert!(value.is(&Value::Class(builtin_class(BuiltinKind::Dict))));
    assert!(evaluate_annotation("None", None).unwrap().is(&Value::None));
}

#[test]
fn test_unknown_name_is_a_name_error() {
    let err = evaluate_annotation("Missing", None).unwrap_err();
    assert_eq!(err.to_string(), "name 'Missing' is not defined");
}

#[test]
fn test_syntax_error_is_unsupported_annotation() {
    let err = evaluate_annotation("List[int", None).unwrap_err();
    assert!(matches!(
        err.kind,
        crate::errors::RuntimeErrorKind::UnsupportedAnnotation(_)
    ));
}
