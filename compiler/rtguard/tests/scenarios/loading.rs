//! The import hook end to end.

use pretty_assertions::assert_eq;
use rtguard::{
    import_module, install_import_hook, module_ir, print_module, reload_module, typechecked,
    BinaryOp, FunctionSpec, IrBuilder, Module, Value,
};

use crate::common::{attr, call, exclusive, provide};

/// `def scale(x: int, factor: int) -> int: return x * factor`
fn scale_module(name: &str) -> Module {
    let mut b = IrBuilder::new();
    let int = b.name("int");
    let x = b.name("x");
    let factor = b.name("factor");
    let product = b.binary(BinaryOp::Mul, x, factor);
    let ret = b.ret(Some(product));
    let func = b.function(
        FunctionSpec::new("scale")
            .param("x", Some(int))
            .param("factor", Some(int))
            .returns(int)
            .body(vec![ret]),
    );
    b.finish(name, &[func])
}

fn rejects_strings(module: &Value) -> bool {
    let scale = attr(module, "scale");
    call(&scale, [Value::string("ab"), Value::int(2)]).is_err_and(|err| err.is_type_check())
}

#[test]
fn test_install_twice_and_reload_check_once() {
    let _serial = exclusive();
    provide([scale_module("scenario_app.maths")]);
    let first = install_import_hook(Some(&["scenario_app"]), None);
    let second = install_import_hook(Some(&["scenario_app"]), None);

    let loaded = import_module("scenario_app.maths").unwrap();
    let reloaded = reload_module("scenario_app.maths").unwrap();
    first.uninstall();
    second.uninstall();

    assert!(rejects_strings(&loaded));
    assert!(rejects_strings(&reloaded));
    let printed = module_ir("scenario_app.maths")
        .map(|ir| print_module(&ir))
        .unwrap();
    assert_eq!(printed.matches("check_argument_types").count(), 1, "{printed}");

    // A function the hook already covered is not wrapped again.
    let scale = attr(&reloaded, "scale");
    assert!(typechecked(&scale, None).unwrap().is(&scale));
}

#[test]
fn test_scoped_hook_restores_previous_state() {
    let _serial = exclusive();
    provide([
        scale_module("scenario_scoped.inside"),
        scale_module("scenario_scoped.after"),
    ]);
    {
        let _hook = install_import_hook(Some(&["scenario_scoped"]), None).scoped();
        assert!(rejects_strings(&import_module("scenario_scoped.inside").unwrap()));
    }
    let after = import_module("scenario_scoped.after").unwrap();
    assert!(!rejects_strings(&after));
    let repeated = call(&attr(&after, "scale"), [Value::string("ab"), Value::int(2)]).unwrap();
    assert_eq!(repeated.as_str(), Some("abab"));
}

#[test]
fn test_uninstrumented_module_can_be_checked_per_function() {
    let _serial = exclusive();
    provide([scale_module("scenario_plain")]);
    let plain = import_module("scenario_plain").unwrap();
    let scale = attr(&plain, "scale");
    assert!(!rejects_strings(&plain));

    let checked = typechecked(&scale, None).unwrap();
    let err = call(&checked, [Value::string("ab"), Value::int(2)]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "argument \"x\" (str) is not an instance of int"
    );
}
