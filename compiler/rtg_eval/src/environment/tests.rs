use super::*;
use pretty_assertions::assert_eq;

fn names(env: &Environment) -> Vec<&'static str> {
    env.bindings().iter().map(|(n, _)| n.as_str()).collect()
}

#[test]
fn test_lookup_walks_parents() {
    let builtins = Environment::builtins([(Name::intern("len"), Value::int(0))]);
    let module = Environment::module(Name::intern("m"), &builtins);
    module.define(Name::intern("x"), Value::int(1));
    let call = module.function_child(Name::intern("f"));
    call.define(Name::intern("y"), Value::int(2));

    assert_eq!(call.lookup(Name::intern("x")).and_then(|v| v.as_int()), Some(1));
    assert!(call.lookup(Name::intern("len")).is_some());
    assert!(module.lookup(Name::intern("y")).is_none());
    assert!(call.get_local(Name::intern("x")).is_none());
}

#[test]
fn test_redefinition_keeps_position() {
    let builtins = Environment::builtins([]);
    let env = Environment::module(Name::intern("m"), &builtins);
    env.define(Name::intern("b"), Value::int(1));
    env.define(Name::intern("a"), Value::int(2));
    env.define(Name::intern("b"), Value::int(3));
    assert_eq!(names(&env), vec!["b", "a"]);
    assert_eq!(env.get_local(Name::intern("b")).and_then(|v| v.as_int()), Some(3));
}

#[test]
fn test_closure_scope_skips_class_frames() {
    let builtins = Environment::builtins([]);
    let module = Environment::module(Name::intern("m"), &builtins);
    let class = module.class_child(Name::intern("C"));
    let inner = class.class_child(Name::intern("D"));
    assert!(inner.closure_scope().ptr_eq(&module));
    assert!(module.closure_scope().ptr_eq(&module));
}

#[test]
fn test_scope_handle_resolves_through_frame() {
    let builtins = Environment::builtins([]);
    let module = Environment::module(Name::intern("m"), &builtins);
    module.define(Name::intern("x"), Value::int(7));
    let handle = module.scope_handle();
    assert_eq!(handle.lookup(Name::intern("x")).and_then(|v| v.as_int()), Some(7));
    assert_eq!(handle, module.scope_handle());
}
