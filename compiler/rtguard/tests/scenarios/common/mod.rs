//! Shared helpers for the scenario tests.
//!
//! Scenarios that change the configuration, the suppression counter or the
//! import hooks take [`exclusive`]; the rest take [`shared`].

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rtguard::{
    add_source, builtins, get_attribute, import_module, subscript_annotation, CallArgs,
    ClassSpec, IrBuilder, MemorySource, Module, Name, RuntimeError, Value,
};

static GLOBAL_STATE: RwLock<()> = const_rwlock(());

pub fn shared() -> RwLockReadGuard<'static, ()> {
    GLOBAL_STATE.read()
}

pub fn exclusive() -> RwLockWriteGuard<'static, ()> {
    GLOBAL_STATE.write()
}

/// A builtin class or function.
pub fn builtin(name: &str) -> Value {
    builtins()
        .lookup(Name::intern(name))
        .unwrap_or_else(|| panic!("no builtin '{name}'"))
}

/// A member of the `typing` module.
pub fn typing(name: &str) -> Value {
    attr(&import_module("typing").unwrap(), name)
}

pub fn attr(value: &Value, name: &str) -> Value {
    get_attribute(value, Name::intern(name)).unwrap()
}

/// `base[args]`, as an annotation.
pub fn generic(base: &Value, args: Vec<Value>) -> Value {
    let index = match <[Value; 1]>::try_from(args) {
        Ok([single]) => single,
        Err(args) => Value::tuple(args),
    };
    subscript_annotation(base, &index).unwrap()
}

pub fn call(callee: &Value, args: impl IntoIterator<Item = Value>) -> Result<Value, RuntimeError> {
    rtguard::call_value(callee, CallArgs::new(args))
}

/// Serve modules from memory.
pub fn provide(modules: impl IntoIterator<Item = Module>) {
    let source = MemorySource::new();
    for module in modules {
        source.insert(module);
    }
    add_source(Arc::new(source));
}

/// ```text
/// from typing import TypedDict
/// class Person(TypedDict):
///     name: str
///     age: int
/// ```
pub fn person_module(name: &str) -> Module {
    let mut b = IrBuilder::new();
    let import = b.import_from("typing", &[("TypedDict", None)]);
    let typed_dict = b.name("TypedDict");
    let str_ = b.name("str");
    let int = b.name("int");
    let name_field = b.ann_assign("name", str_, None);
    let age_field = b.ann_assign("age", int, None);
    let class = b.class(
        ClassSpec::new("Person")
            .base(typed_dict)
            .body(vec![name_field, age_field]),
    );
    b.finish(name, &[import, class])
}

pub fn person(name: &str, age: Value) -> Value {
    Value::dict(vec![
        (Value::string("name"), Value::string(name)),
        (Value::string("age"), age),
    ])
}
