//! Module loading and the import hook.
//!
//! Modules come from registered [`ModuleSource`]s as IR. Loading one runs
//! three steps:
//!
//! ```text
//! source.load(name) --> hook matches? --> instrument_module --> execute
//!                             |                                    ^
//!                             +------------- no -------------------+
//! ```
//!
//! Loaded modules are cached in a process-wide table keyed by dotted name;
//! a module is entered in the table before its body runs, so circular
//! imports see the partially-initialised module. Instrumenting is
//! idempotent, so reloading a module or installing a hook twice never
//! inserts checks twice.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rtg_instrument::{instrument_module, InstrumentOptions};
use rtg_ir::{Module, Name};
use rtg_types::Value;

use crate::environment::Environment;
use crate::errors::LoaderError;
use crate::host;
use crate::interpreter::Interpreter;

/// Supplies module IR by dotted name.
pub trait ModuleSource: Send + Sync {
    fn load(&self, name: &str) -> Option<Module>;
}

/// Modules held in memory.
#[derive(Default)]
pub struct MemorySource {
    modules: DashMap<String, Module>,
}

impl MemorySource {
    pub fn new() -> Self {
        MemorySource::default()
    }

    /// Add or replace a module under its own name.
    pub fn insert(&self, module: Module) {
        self.modules.insert(module.name.as_str().to_string(), module);
    }

    #[must_use]
    pub fn with_module(self, module: Module) -> Self {
        self.insert(module);
        self
    }
}

impl ModuleSource for MemorySource {
    fn load(&self, name: &str) -> Option<Module> {
        self.modules.get(name).map(|module| module.clone())
    }
}

/// Decides whether a module is instrumented on load.
pub type ModuleFinder = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[derive(Clone)]
struct LoadedModule {
    value: Value,
    env: Environment,
    ir: Arc<Module>,
}

struct HookEntry {
    id: u64,
    packages: Option<Vec<String>>,
    finder: Option<ModuleFinder>,
    /// Handles sharing this entry.
    refs: usize,
}

impl HookEntry {
    fn matches(&self, module: &str) -> bool {
        if let Some(finder) = &self.finder {
            return finder(module);
        }
        match &self.packages {
            None => true,
            Some(packages) => packages.iter().any(|package| {
                module == package
                    || module
                        .strip_prefix(package.as_str())
                        .is_some_and(|rest| rest.starts_with('.'))
            }),
        }
    }
}

#[derive(Default)]
struct ImportSystem {
    sources: RwLock<Vec<Arc<dyn ModuleSource>>>,
    modules: DashMap<String, LoadedModule>,
    hooks: Mutex<Vec<HookEntry>>,
    next_hook: AtomicU64,
}

static IMPORTS: LazyLock<ImportSystem> = LazyLock::new(ImportSystem::default);

/// Register a source; earlier sources take precedence.
pub fn add_source(source: Arc<dyn ModuleSource>) {
    IMPORTS.sources.write().push(source);
}

/// Import a module, loading it on first use.
pub fn import_module(name: &str) -> Result<Value, LoaderError> {
    if let Some(module) = host::host_module(name) {
        return Ok(module);
    }
    if let Some(loaded) = IMPORTS.modules.get(name) {
        return Ok(loaded.value.clone());
    }
    load(name)
}

/// Drop a module from the table and load it again.
pub fn reload_module(name: &str) -> Result<Value, LoaderError> {
    IMPORTS.modules.remove(name);
    load(name)
}

/// Drop a module from the table. Returns whether it was loaded.
pub fn forget_module(name: &str) -> bool {
    IMPORTS.modules.remove(name).is_some()
}

/// The IR a loaded module was executed from, after instrumentation.
pub fn module_ir(name: &str) -> Option<Arc<Module>> {
    IMPORTS.modules.get(name).map(|loaded| Arc::clone(&loaded.ir))
}

fn find_source(name: &str) -> Option<Module> {
    let sources = IMPORTS.sources.read().clone();
    sources.iter().find_map(|source| source.load(name))
}

fn hooked(name: &str) -> bool {
    IMPORTS.hooks.lock().iter().any(|hook| hook.matches(name))
}

#[tracing::instrument(level = "debug", skip_all, fields(module = name))]
fn load(name: &str) -> Result<Value, LoaderError> {
    let parent = match name.rsplit_once('.') {
        Some((package, child)) => Some((parent_package(package)?, child)),
        None => None,
    };

    let Some(mut module) = find_source(name) else {
        return Err(LoaderError::NotFound {
            module: name.to_string(),
        });
    };
    if hooked(name) {
        let report = instrument_module(&mut module, &InstrumentOptions::default()).map_err(
            |source| LoaderError::Instrumentation {
                module: name.to_string(),
                source,
            },
        )?;
        tracing::debug!(
            instrumented = report.instrumented.len(),
            skipped = report.skipped.len(),
            "instrumented on import"
        );
    }

    let ir = Arc::new(module);
    let env = Environment::module(ir.name, &host::builtins());
    env.define(Name::intern("__name__"), Value::string(name));
    let value = Value::module(ir.name, env.scope_ref());
    IMPORTS.modules.insert(
        name.to_string(),
        LoadedModule {
            value: value.clone(),
            env: env.clone(),
            ir: Arc::clone(&ir),
        },
    );

    if let Err(source) = Interpreter::new(ir, env).run() {
        IMPORTS.modules.remove(name);
        return Err(LoaderError::Execution {
            module: name.to_string(),
            source,
        });
    }
    if let Some((parent, child)) = parent {
        parent.define(Name::intern(child), value.clone());
    }
    tracing::debug!("loaded module");
    Ok(value)
}

/// The frame of a parent package, importing it (or creating an empty
/// namespace package) first.
fn parent_package(package: &str) -> Result<Environment, LoaderError> {
    match import_module(package) {
        Ok(_) => {}
        Err(LoaderError::NotFound { .. }) => {
            let env = Environment::module(Name::intern(package), &host::builtins());
            env.define(Name::intern("__name__"), Value::string(package));
            let value = Value::module(Name::intern(package), env.scope_ref());
            let ir = Arc::new(empty_module(package));
            IMPORTS
                .modules
                .insert(package.to_string(), LoadedModule { value, env, ir });
            tracing::trace!(package, "created namespace package");
        }
        Err(err) => return Err(err),
    }
    IMPORTS
        .modules
        .get(package)
        .map(|loaded| loaded.env.clone())
        .ok_or_else(|| LoaderError::NotFound {
            module: package.to_string(),
        })
}

fn empty_module(name: &str) -> Module {
    rtg_ir::IrBuilder::new().finish(name, &[])
}

/// Handle to an installed import hook.
///
/// Installing a hook for the same package roots again shares the existing
/// hook; it stays active until every handle uninstalled it.
pub struct ImportHookManager {
    id: u64,
    installed: AtomicBool,
}

impl ImportHookManager {
    /// Remove the hook. Calling this again does nothing.
    pub fn uninstall(&self) {
        if !self.installed.swap(false, Ordering::SeqCst) {
            return;
        }
        let mut hooks = IMPORTS.hooks.lock();
        if let Some(index) = hooks.iter().position(|hook| hook.id == self.id) {
            hooks[index].refs -= 1;
            if hooks[index].refs == 0 {
                hooks.remove(index);
                tracing::debug!(hook = self.id, "uninstalled import hook");
            }
        }
    }

    pub fn is_installed(&self) -> bool {
        self.installed.load(Ordering::SeqCst)
    }

    /// Uninstall when the returned guard is dropped.
    pub fn scoped(self) -> ImportHookGuard {
        ImportHookGuard { manager: self }
    }
}

/// Keeps an import hook installed while alive.
#[must_use = "the hook is uninstalled when the guard is dropped"]
pub struct ImportHookGuard {
    manager: ImportHookManager,
}

impl Drop for ImportHookGuard {
    fn drop(&mut self) {
        self.manager.uninstall();
    }
}

/// Instrument modules on import.
///
/// `packages` names the roots whose modules (and submodules) are
/// instrumented; `None` instruments every module. A `finder` replaces the
/// package test entirely.
pub fn install_import_hook(
    packages: Option<&[&str]>,
    finder: Option<ModuleFinder>,
) -> ImportHookManager {
    let packages: Option<Vec<String>> =
        packages.map(|roots| roots.iter().map(|root| (*root).to_string()).collect());
    let mut hooks = IMPORTS.hooks.lock();
    if finder.is_none() {
        if let Some(existing) = hooks
            .iter_mut()
            .find(|hook| hook.finder.is_none() && hook.packages == packages)
        {
            existing.refs += 1;
            return ImportHookManager {
                id: existing.id,
                installed: AtomicBool::new(true),
            };
        }
    }
    let id = IMPORTS.next_hook.fetch_add(1, Ordering::SeqCst);
    tracing::debug!(hook = id, ?packages, "installed import hook");
    hooks.push(HookEntry {
        id,
        packages,
        finder,
        refs: 1,
    });
    ImportHookManager {
        id,
        installed: AtomicBool::new(true),
    }
}
