//! Lazily-produced sequences loaded through the import hook.

use pretty_assertions::assert_eq;
use rtguard::{
    import_module, install_import_hook, BinaryOp, FunctionSpec, IrBuilder, Module, RuntimeError,
    Step, Value,
};

use crate::common::{attr, call, exclusive, provide};

/// ```text
/// from typing import Generator
/// def echo(start: int) -> Generator[int, str, bool]:
///     reply = yield start
///     yield start + 1
///     return True
/// def words() -> Generator[int, str, None]:
///     yield "bad"
/// ```
fn echo_module(name: &str) -> Module {
    let mut b = IrBuilder::new();
    let import = b.import_from("typing", &[("Generator", None)]);
    let generator = b.name("Generator");
    let int = b.name("int");
    let str_ = b.name("str");
    let bool_ = b.name("bool");
    let returns = b.generic(generator, &[int, str_, bool_]);

    let start = b.name("start");
    let first = b.yield_(Some(start));
    let reply = b.assign_name("reply", first);
    let start = b.name("start");
    let one = b.int(1);
    let next = b.binary(BinaryOp::Add, start, one);
    let second = b.yield_(Some(next));
    let second = b.expr_stmt(second);
    let done = b.bool(true);
    let ret = b.ret(Some(done));
    let int = b.name("int");
    let func = b.function(
        FunctionSpec::new("echo")
            .param("start", Some(int))
            .returns(returns)
            .body(vec![reply, second, ret]),
    );

    let generator = b.name("Generator");
    let int = b.name("int");
    let str_ = b.name("str");
    let none = b.none();
    let returns = b.generic(generator, &[int, str_, none]);
    let bad = b.str("bad");
    let produced = b.yield_(Some(bad));
    let produced = b.expr_stmt(produced);
    let words = b.function(
        FunctionSpec::new("words")
            .returns(returns)
            .body(vec![produced]),
    );
    b.finish(name, &[import, func, words])
}

/// Load `module` with the hook installed and call `function(args)`.
fn start(module: &str, function: &str, args: Vec<Value>) -> Value {
    provide([echo_module(module)]);
    let _hook = install_import_hook(Some(&[module]), None).scoped();
    let loaded = import_module(module).unwrap();
    call(&attr(&loaded, function), args).unwrap()
}

fn resume(sequence: &Value, sent: Value) -> Result<Step, RuntimeError> {
    let Value::Generator(generator) = sequence else {
        panic!("expected a generator, got {}", sequence.type_name());
    };
    generator.send(sent)
}

fn yielded(step: Step) -> Option<i64> {
    match step {
        Step::Yielded(value) => value.as_int(),
        Step::Complete(_) => None,
    }
}

#[test]
fn test_produce_then_resume_both_pass() {
    let _serial = exclusive();
    let echo = start("scenario_echo_ok", "echo", vec![Value::int(6)]);

    assert_eq!(yielded(resume(&echo, Value::None).unwrap()), Some(6));
    assert_eq!(yielded(resume(&echo, Value::string("ok")).unwrap()), Some(7));
    let finished = resume(&echo, Value::string("again")).unwrap();
    assert!(matches!(finished, Step::Complete(Value::Bool(true))));
}

#[test]
fn test_bad_production_fails_at_the_production_point() {
    let _serial = exclusive();
    let words = start("scenario_words", "words", Vec::new());
    let err = resume(&words, Value::None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "the yielded value (str) is not an instance of int"
    );
}

#[test]
fn test_arguments_are_checked_at_first_resumption() {
    let _serial = exclusive();
    let echo = start("scenario_echo_arg", "echo", vec![Value::Float(1.5)]);
    let err = resume(&echo, Value::None).unwrap_err();
    assert!(err.is_type_check(), "{err}");
    assert_eq!(
        err.to_string(),
        "argument \"start\" (float) is not an instance of int"
    );
}

#[test]
fn test_bad_resumption_fails_at_the_resumption_point() {
    let _serial = exclusive();
    let echo = start("scenario_echo_send", "echo", vec![Value::int(1)]);

    assert_eq!(yielded(resume(&echo, Value::None).unwrap()), Some(1));
    let err = resume(&echo, Value::int(5)).unwrap_err();
    assert_eq!(
        err.to_string(),
        "the value sent to generator (int) is not an instance of str"
    );
}
