//! Host-provided names: the builtins frame and the built-in modules.
//!
//! Built-in modules are created once per process and shared, so
//! `import typing` in two modules binds the same module object.

mod builtins;
mod rtguard;
mod typing;

use std::sync::LazyLock;

use rtg_ir::Name;
use rtg_types::{StaticScope, Value};

use crate::environment::Environment;

static BUILTINS: LazyLock<Environment> = LazyLock::new(|| Environment::builtins(builtins::entries()));

static MODULES: LazyLock<Vec<(&'static str, Value)>> = LazyLock::new(|| {
    vec![
        ("typing", host_module_value("typing", typing::entries())),
        (
            "typing_extensions",
            host_module_value("typing_extensions", typing::entries()),
        ),
        ("rtguard", host_module_value("rtguard", rtguard::entries())),
    ]
});

fn host_module_value(name: &str, entries: Vec<(Name, Value)>) -> Value {
    Value::module(Name::intern(name), StaticScope::new(name, entries).into_ref())
}

/// The frame every module's global frame links to.
pub fn builtins() -> Environment {
    BUILTINS.clone()
}

/// A module provided by the host itself.
pub(crate) fn host_module(name: &str) -> Option<Value> {
    MODULES
        .iter()
        .find(|(module, _)| *module == name)
        .map(|(_, value)| value.clone())
}

/// Keyword argument `name`, if supplied.
fn keyword<'a>(keywords: &'a [(Name, Value)], name: &str) -> Option<&'a Value> {
    keywords
        .iter()
        .find(|(n, _)| n.as_str() == name)
        .map(|(_, v)| v)
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
