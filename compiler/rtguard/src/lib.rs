//! rtguard - run-time type checking.
//!
//! Declared types are enforced while a program runs: function arguments on
//! entry, results on exit, and every value a lazily-produced sequence
//! produces or is sent.
//!
//! # Entry points
//!
//! - [`check_type`]: check one value against an annotation and return it
//! - [`typechecked`]: instrument one function, or every member of a class
//! - [`install_import_hook`]: instrument modules as they are loaded
//! - [`suppress_type_checks`]: turn checking off for a scope
//! - [`register_lookup`] and [`load_plugins`]: extend the checker registry
//!
//! # Crates
//!
//! - `rtg_ir`: the versioned IR that instrumentation rewrites
//! - `rtg_types`: runtime values and type descriptors
//! - `rtg_check`: configuration, the registry and the matching engine
//! - `rtg_instrument`: the rewrite and the checking wrappers
//! - `rtg_eval`: the reference host, its loader and import hook
//!
//! # Logging
//!
//! Every crate logs through `tracing`. [`init_tracing`] installs a
//! subscriber filtered by `RTGUARD_LOG` (or `RUST_LOG`); set
//! `RTGUARD_LOG_TREE` for indented span output.

use std::sync::Once;

pub use rtg_check::{
    autoload_plugins, check_type, check_type_in, checker_lookups, emit, global_config,
    load_plugins, optimized_mode, register_lookup, register_lookup_at, register_test_double,
    remove_lookup, reset_lookups, set_diagnostic_sink, set_global_config, set_optimized_mode,
    suppress_type_checks, suppress_wrapper, suppressed, type_checks_suppressed,
    unregister_test_double, update_global_config, CheckError, CheckFn, Checker, CheckerLookup,
    ConfigOverrides, Diagnostic, DiagnosticSink, LookupRef, PluginEntry, PluginResolver,
    PluginTarget, SuppressionGuard, TypeCheckConfiguration, TypeCheckFailCallback, TypeCheckMemo,
};
pub use rtg_eval::{
    add_source, builtins, forget_module, import_module, install_import_hook, module_ir,
    reload_module, typechecked, Environment, ImportHookGuard, ImportHookManager, Interpreter,
    LoaderError, MemorySource, ModuleFinder, ModuleSource,
};
pub use rtg_instrument::{
    instrument_module, wrap_class, wrap_function, InstrumentOptions, InstrumentReport,
    InstrumentationError, WrapOptions,
};
pub use rtg_ir::{
    print_module, BinaryOp, ClassSpec, CollectionCheckStrategy, ForwardRefPolicy, FunctionSpec,
    IrBuilder, Module, Name, IR_VERSION,
};
pub use rtg_types::{
    build_descriptor, call_value, get_attribute, subscript_annotation, union_of, CallArgs,
    RuntimeError, RuntimeErrorKind, SpecialForm, Step, TypeCheckError, TypeDesc,
    UnsupportedAnnotationError, Value,
};

static TRACING_INIT: Once = Once::new();

/// Install a tracing subscriber.
///
/// Does nothing unless `RTGUARD_LOG` or `RUST_LOG` is set. Safe to call
/// more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let Some(directives) = std::env::var("RTGUARD_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .ok()
        else {
            return;
        };
        let filter = EnvFilter::new(directives);
        let registry = tracing_subscriber::registry().with(filter);
        let installed = if std::env::var_os("RTGUARD_LOG_TREE").is_some() {
            registry
                .with(
                    tracing_tree::HierarchicalLayer::new(2)
                        .with_targets(true)
                        .with_bracketed_fields(true),
                )
                .try_init()
        } else {
            registry
                .with(fmt::layer().with_target(true).with_level(true))
                .try_init()
        };
        if installed.is_ok() {
            tracing::debug!("tracing initialised");
        }
    });
}
