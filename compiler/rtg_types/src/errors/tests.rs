use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_type_check_error_without_path() {
    let err = TypeCheckError::new("is not an instance of int");
    assert_eq!(err.to_string(), "is not an instance of int");
}

#[test]
fn test_type_check_error_path_joins_inside_out() {
    let mut err = TypeCheckError::new("is not an instance of str");
    err.append_path_element("item 2");
    err.append_path_element("argument \"names\" (list)");
    assert_eq!(
        err.to_string(),
        "item 2 of argument \"names\" (list) is not an instance of str"
    );
    assert_eq!(err.path().len(), 2);
}

#[test]
fn test_runtime_error_message_follows_kind() {
    let err = name_not_found("Foo");
    assert_eq!(err.message, "name 'Foo' is not defined");
    assert!(matches!(err.kind, RuntimeErrorKind::NameNotFound { .. }));
}

#[test]
fn test_type_check_conversion_is_detectable() {
    let err: RuntimeError = TypeCheckError::new("bad").into();
    assert!(err.is_type_check());
    assert_eq!(err.as_type_check().map(TypeCheckError::message), Some("bad"));
}

#[test]
fn test_unsupported_annotation_message() {
    let err = UnsupportedAnnotationError::new("Literal[1.5]", "illegal literal value");
    assert_eq!(
        err.to_string(),
        "unsupported annotation Literal[1.5]: illegal literal value"
    );
}
