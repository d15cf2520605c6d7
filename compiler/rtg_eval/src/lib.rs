//! rtguard evaluation - the reference host.
//!
//! Executes IR modules so the injected checks can be observed end to end:
//! - `environment`: lexical frames (builtins, module, class, call)
//! - `interpreter`: statements, expressions, functions, classes and
//!   lazily-produced sequences
//! - `host`: the builtins frame and the `typing` and `rtguard` modules
//! - `loader`: module sources, the module table and the import hook
//! - `typechecked`: the per-function instrumentation entry point

pub mod environment;
mod errors;
mod host;
mod interpreter;
pub mod loader;
mod typechecked;

#[cfg(test)]
mod test_support;

pub use environment::{Environment, FrameKind};
pub use errors::LoaderError;
pub use host::builtins;
pub use interpreter::Interpreter;
pub use loader::{
    add_source, forget_module, import_module, install_import_hook, module_ir, reload_module,
    ImportHookGuard, ImportHookManager, MemorySource, ModuleFinder, ModuleSource,
};
pub use typechecked::typechecked;
