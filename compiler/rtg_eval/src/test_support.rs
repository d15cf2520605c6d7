//! Test helpers: running built modules and serializing tests that touch
//! process-wide state.
//!
//! Tests that change the configuration, optimized mode, the import hooks or
//! the module table take the exclusive guard; tests whose outcome depends
//! on them take the shared one.

use std::sync::Arc;

use parking_lot::{const_rwlock, RwLock, RwLockReadGuard, RwLockWriteGuard};
use rtg_ir::{Module, Name};
use rtg_types::{call_value, CallArgs, RuntimeError, RuntimeResult, Value};

use crate::environment::Environment;
use crate::host::builtins;
use crate::interpreter::Interpreter;

static GLOBAL_STATE: RwLock<()> = const_rwlock(());

pub(crate) fn shared() -> RwLockReadGuard<'static, ()> {
    GLOBAL_STATE.read()
}

pub(crate) fn exclusive() -> RwLockWriteGuard<'static, ()> {
    GLOBAL_STATE.write()
}

/// Execute a module body in a fresh global frame.
pub(crate) fn try_run(module: Module) -> Result<Environment, RuntimeError> {
    let env = Environment::module(module.name, &builtins());
    Interpreter::new(Arc::new(module), env.clone()).run()?;
    Ok(env)
}

pub(crate) fn run(module: Module) -> Environment {
    try_run(module).unwrap_or_else(|err| panic!("module failed: {err}"))
}

/// A binding of the module frame.
pub(crate) fn global(env: &Environment, name: &str) -> Value {
    env.get_local(Name::intern(name))
        .unwrap_or_else(|| panic!("'{name}' is not bound"))
}

pub(crate) fn call(callee: &Value, args: impl IntoIterator<Item = Value>) -> RuntimeResult {
    call_value(callee, CallArgs::new(args))
}
