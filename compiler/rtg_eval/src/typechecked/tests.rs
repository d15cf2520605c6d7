use super::*;
use crate::test_support::{self, call, global, run};
use pretty_assertions::assert_eq;
use rtg_check::set_optimized_mode;
use rtg_ir::{BinaryOp, ClassSpec, CollectionCheckStrategy, FunctionSpec, IrBuilder, Name};
use rtg_types::CallArgs;

/// `def add(x: int, y: int) -> int: return x + y`, optionally decorated.
fn add_module(decorator: Option<&str>) -> Module {
    let mut b = IrBuilder::new();
    let import = b.import_from("rtguard", &[("typechecked", None)]);
    let int = b.name("int");
    let x = b.name("x");
    let y = b.name("y");
    let sum = b.binary(BinaryOp::Add, x, y);
    let ret = b.ret(Some(sum));
    let mut spec = FunctionSpec::new("add")
        .param("x", Some(int))
        .param("y", Some(int))
        .returns(int)
        .body(vec![ret]);
    if let Some(decorator) = decorator {
        let decorator = b.name(decorator);
        spec = spec.decorator(decorator);
    }
    let func = b.function(spec);
    b.finish("calc", &[import, func])
}

fn rejects_strings(add: &Value) -> bool {
    call(add, [Value::string("a"), Value::int(2)]).is_err_and(|err| err.is_type_check())
}

#[test]
fn test_ir_function_is_rewritten() {
    let _serial = test_support::shared();
    let env = run(add_module(None));
    let add = global(&env, "add");
    assert!(!rejects_strings(&add));

    let checked = typechecked(&add, None).unwrap();
    assert!(rejects_strings(&checked));
    assert_eq!(call(&checked, [Value::int(2), Value::int(3)]).unwrap().as_int(), Some(5));

    let func = checked.as_function().unwrap();
    assert!(func.marks.contains(FunctionMarks::INSTRUMENTED));
    assert_eq!(func.qualname.as_str(), "add");
    assert_eq!(func.annotations.len(), 3);
}

#[test]
fn test_instrumenting_twice_is_a_no_op() {
    let _serial = test_support::shared();
    let env = run(add_module(None));
    let once = typechecked(&global(&env, "add"), None).unwrap();
    let twice = typechecked(&once, None).unwrap();
    assert!(twice.is(&once));
}

#[test]
fn test_decorator_instruments_at_definition() {
    let _serial = test_support::shared();
    let env = run(add_module(Some("typechecked")));
    assert!(rejects_strings(&global(&env, "add")));
}

#[test]
fn test_opted_out_function_is_unchanged() {
    let _serial = test_support::shared();
    let env = run(add_module(None));
    let mut func = FunctionValue::clone(global(&env, "add").as_function().unwrap());
    func.marks |= FunctionMarks::NO_CHECK;
    let opted_out = Value::function(func);
    assert!(typechecked(&opted_out, None).unwrap().is(&opted_out));
}

#[test]
fn test_optimized_mode_disables_instrumentation() {
    let _serial = test_support::exclusive();
    let env = run(add_module(None));
    let add = global(&env, "add");

    set_optimized_mode(true);
    let result = typechecked(&add, None);
    set_optimized_mode(false);
    assert!(result.unwrap().is(&add));
}

#[test]
fn test_overrides_apply_to_the_rewritten_function() {
    let _serial = test_support::shared();
    // def first(items: List[str]) -> None: pass
    let mut b = IrBuilder::new();
    let import = b.import_from("typing", &[("List", None)]);
    let list = b.name("List");
    let str_ = b.name("str");
    let annotation = b.generic(list, &[str_]);
    let none = b.none();
    let pass = b.pass();
    let func = b.function(
        FunctionSpec::new("first")
            .param("items", Some(annotation))
            .returns(none)
            .body(vec![pass]),
    );
    let env = run(b.finish("m", &[import, func]));
    let first = global(&env, "first");
    let mixed = || {
        Value::list(vec![
            Value::string("a"),
            Value::string("b"),
            Value::int(3),
        ])
    };

    let lenient = typechecked(&first, None).unwrap();
    assert!(call(&lenient, [mixed()]).is_ok());

    let overrides =
        ConfigOverrides::default().collection_check_strategy(CollectionCheckStrategy::AllItems);
    let strict = typechecked(&first, Some(&overrides)).unwrap();
    let err = call(&strict, [mixed()]).unwrap_err();
    assert!(err.to_string().contains("item 2"), "{err}");
}

#[test]
fn test_class_members_are_instrumented() {
    let _serial = test_support::shared();
    // class Doubler:
    //     def double(self, x: int) -> int: return x + x
    //     @staticmethod
    //     def half(x: int) -> int: return x
    let mut b = IrBuilder::new();
    let int = b.name("int");
    let x = b.name("x");
    let sum = b.binary(BinaryOp::Add, x, x);
    let ret = b.ret(Some(sum));
    let double = b.function(
        FunctionSpec::new("double")
            .param("self", None)
            .param("x", Some(int))
            .returns(int)
            .body(vec![ret]),
    );
    let staticmethod = b.name("staticmethod");
    let x = b.name("x");
    let ret = b.ret(Some(x));
    let half = b.function(
        FunctionSpec::new("half")
            .param("x", Some(int))
            .returns(int)
            .decorator(staticmethod)
            .body(vec![ret]),
    );
    let class = b.class(ClassSpec::new("Doubler").body(vec![double, half]));
    let env = run(b.finish("m", &[class]));

    let class = global(&env, "Doubler");
    assert!(typechecked(&class, None).unwrap().is(&class));

    let instance = call(&class, []).unwrap();
    let double = rtg_types::get_attribute(&instance, Name::intern("double")).unwrap();
    assert_eq!(call(&double, [Value::int(4)]).unwrap().as_int(), Some(8));
    let err = call(&double, [Value::string("4")]).unwrap_err();
    assert!(err.is_type_check(), "{err}");

    let half = rtg_types::get_attribute(&class, Name::intern("half")).unwrap();
    let err = call(&half, [Value::string("4")]).unwrap_err();
    assert!(err.is_type_check(), "{err}");
}

#[test]
fn test_unannotated_native_function_is_unchanged() {
    let _serial = test_support::shared();
    let native = Value::native("identity", |args: CallArgs| {
        Ok(args.positional.first().cloned().unwrap_or(Value::None))
    });
    assert!(typechecked(&native, None).unwrap().is(&native));
}

#[test]
fn test_other_values_pass_through() {
    let _serial = test_support::shared();
    let value = Value::int(3);
    assert_eq!(typechecked(&value, None).unwrap().as_int(), Some(3));
}
