use super::*;
use crate::scope::StaticScope;
use crate::value::{
    builtin_class, subscript_annotation, ClassObj, InterfaceDef, MemberSig, RecordDef,
    RecordField, TypeVarObj,
};
use pretty_assertions::assert_eq;

fn class(kind: BuiltinKind) -> Value {
    Value::Class(builtin_class(kind))
}

fn form(form: SpecialForm) -> Value {
    Value::Form(form)
}

fn sub(base: Value, args: Vec<Value>) -> Value {
    let index = if args.len() == 1 {
        args.into_iter().next().unwrap()
    } else {
        Value::tuple(args)
    };
    subscript_annotation(&base, &index).unwrap()
}

fn desc(annotation: &Value) -> TypeDesc {
    build_descriptor(annotation).unwrap()
}

#[test]
fn test_builtin_classes() {
    assert_eq!(desc(&class(BuiltinKind::Int)).to_string(), "int");
    assert_eq!(desc(&Value::None).to_string(), "None");
    assert!(desc(&class(BuiltinKind::Object)).is_any());
    assert_eq!(
        desc(&class(BuiltinKind::List)).origin,
        Origin::Sequence(SequenceKind::List)
    );
}

#[test]
fn test_parameterized_containers_keep_parameter_order() {
    let d = desc(&sub(
        form(SpecialForm::Dict),
        vec![class(BuiltinKind::Str), class(BuiltinKind::Int)],
    ));
    assert_eq!(d.origin, Origin::Mapping(MappingKind::Dict));
    assert_eq!(d.to_string(), "Dict[str, int]");

    let lowercase = desc(&sub(
        class(BuiltinKind::Dict),
        vec![class(BuiltinKind::Str), class(BuiltinKind::Int)],
    ));
    assert_eq!(d, lowercase);
}

#[test]
fn test_single_member_union_collapses() {
    let d = desc(&sub(form(SpecialForm::Union), vec![class(BuiltinKind::Int)]));
    assert_eq!(d, desc(&class(BuiltinKind::Int)));

    let optional = desc(&sub(form(SpecialForm::Optional), vec![class(BuiltinKind::Str)]));
    assert_eq!(optional.origin, Origin::Union);
    assert_eq!(optional.to_string(), "Union[str, None]");
}

#[test]
fn test_tuple_shapes() {
    let empty = desc(&sub(form(SpecialForm::Tuple), vec![Value::tuple(vec![])]));
    assert_eq!(empty.origin, Origin::TupleFixed);
    assert!(empty.params.is_empty());

    let homogeneous = desc(&sub(
        form(SpecialForm::Tuple),
        vec![class(BuiltinKind::Int), Value::Ellipsis],
    ));
    assert_eq!(homogeneous.to_string(), "Tuple[int, ...]");

    let misplaced = sub(
        form(SpecialForm::Tuple),
        vec![Value::Ellipsis, class(BuiltinKind::Int)],
    );
    assert!(build_descriptor(&misplaced).is_err());
}

#[test]
fn test_literal_values_are_validated() {
    let ok = desc(&sub(
        form(SpecialForm::Literal),
        vec![Value::Bool(true), Value::string("a")],
    ));
    assert_eq!(
        ok.origin,
        Origin::Literal(vec![LiteralValue::Bool(true), LiteralValue::Str("a".into())])
    );
    assert!(LiteralValue::Bool(true).matches(&Value::Bool(true)));
    assert!(!LiteralValue::Bool(true).matches(&Value::int(1)));

    let bad = sub(form(SpecialForm::Literal), vec![Value::Float(1.5)]);
    let err = build_descriptor(&bad).unwrap_err();
    assert!(err.reason.contains("illegal literal value"));
}

#[test]
fn test_annotated_carries_extras() {
    let d = desc(&sub(
        form(SpecialForm::Annotated),
        vec![class(BuiltinKind::Int), Value::string("positive")],
    ));
    assert_eq!(d.origin, Origin::Instance(builtin_class(BuiltinKind::Int)));
    assert_eq!(d.extras.len(), 1);
}

#[test]
fn test_callable_arity() {
    let fixed = desc(&sub(
        form(SpecialForm::Callable),
        vec![
            Value::list(vec![class(BuiltinKind::Int), class(BuiltinKind::Str)]),
            class(BuiltinKind::Bool),
        ],
    ));
    assert_eq!(fixed.origin, Origin::Callable { arg_count: Some(2) });
    assert_eq!(fixed.to_string(), "Callable[[int, str], bool]");

    let any_args = desc(&sub(
        form(SpecialForm::Callable),
        vec![Value::Ellipsis, class(BuiltinKind::Int)],
    ));
    assert_eq!(any_args.origin, Origin::Callable { arg_count: None });
}

#[test]
fn test_generator_components() {
    let d = desc(&sub(
        form(SpecialForm::Generator),
        vec![
            class(BuiltinKind::Int),
            class(BuiltinKind::Str),
            Value::None,
        ],
    ));
    let (produced, accepted, last) = d.lazy_components();
    assert_eq!(produced.to_string(), "int");
    assert_eq!(accepted.to_string(), "str");
    assert_eq!(last.to_string(), "None");

    let iterator = desc(&sub(form(SpecialForm::Iterator), vec![class(BuiltinKind::Int)]));
    assert_eq!(iterator.lazy_kind(), Some(LazyKind::Sync));
    assert!(iterator.lazy_components().1.is_any());
}

#[test]
fn test_string_becomes_deferred_in_scope() {
    let scope = ScopeHandle::new(StaticScope::new("mod", []).into_ref());
    let d = build_descriptor_in(&Value::string("Node"), Some(&scope)).unwrap();
    match &d.origin {
        Origin::Deferred {
            source,
            scope: Some(found),
        } => {
            assert_eq!(source.as_str(), "Node");
            assert_eq!(found, &scope);
        }
        other => panic!("expected deferred, got {other:?}"),
    }
}

#[test]
fn test_type_var_bound_and_constraints() {
    let bounded = Value::type_var(TypeVarObj {
        name: Name::intern("T"),
        bound: Some(class(BuiltinKind::Int)),
        constraints: Vec::new(),
        covariant: false,
        contravariant: false,
    });
    let d = desc(&bounded);
    assert_eq!(
        d.origin,
        Origin::TypeVar {
            name: Name::intern("T"),
            bounded: true
        }
    );
    assert_eq!(d.params.len(), 1);
}

#[test]
fn test_record_and_interface_members() {
    let record = ClassObj::new(
        Name::intern("Person"),
        Name::intern("people"),
        Vec::new(),
        ClassKind::Record(RecordDef {
            fields: vec![
                RecordField {
                    name: Name::intern("name"),
                    annotation: class(BuiltinKind::Str),
                    required: true,
                },
                RecordField {
                    name: Name::intern("friend"),
                    annotation: Value::string("Person"),
                    required: false,
                },
            ],
            total: true,
        }),
    );
    let Value::Class(record) = Value::class(record) else {
        unreachable!()
    };
    assert_eq!(
        desc(&Value::Class(record.clone())).origin,
        Origin::Record(record.clone())
    );
    let fields = record_field_descriptors(&record).unwrap();
    assert_eq!(fields[0].to_string(), "str");
    assert!(matches!(fields[1].origin, Origin::Deferred { .. }));

    let iface = ClassObj::new(
        Name::intern("Sized"),
        Name::intern("people"),
        Vec::new(),
        ClassKind::Interface(InterfaceDef {
            members: vec![
                MemberSig {
                    name: Name::intern("size"),
                    kind: MemberKind::Attribute {
                        annotation: Some(class(BuiltinKind::Int)),
                    },
                },
                MemberSig {
                    name: Name::intern("grow"),
                    kind: MemberKind::Method { positional: 1 },
                },
            ],
            strict: true,
        }),
    );
    let Value::Class(iface) = Value::class(iface) else {
        unreachable!()
    };
    let members = interface_member_descriptors(&iface).unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].0.as_str(), "size");
}

#[test]
fn test_bare_special_forms_needing_arguments_fail() {
    assert!(build_descriptor(&form(SpecialForm::Literal)).is_err());
    assert!(build_descriptor(&form(SpecialForm::Protocol)).is_err());
    assert!(build_descriptor(&Value::int(3)).is_err());
}
