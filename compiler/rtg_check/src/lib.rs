//! rtguard checking - the type matching engine.
//!
//! Given a value and a [`TypeDesc`](rtg_types::TypeDesc), decide whether
//! the value conforms:
//! - `config`: the process-wide configuration and per-call overrides
//! - `registry`: the ordered checker lookups and the test-double carve-out
//! - `memo`: the per-check resolution context
//! - `engine` and `checkers`: the recursive matcher and the built-in checkers
//! - `functions`: the argument, return, yield and send entry points
//! - `suppress`: the process-wide suppression counter
//! - `plugins` and `diagnostics`: plugin loading and the non-fatal sink

mod checkers;
pub mod config;
pub mod diagnostics;
mod engine;
mod errors;
mod functions;
mod memo;
pub mod plugins;
pub mod registry;
mod suppress;

#[cfg(test)]
mod test_support;

pub use checkers::BuiltinLookup;
pub use config::{
    global_config, optimized_mode, set_global_config, set_optimized_mode, update_global_config,
    ConfigOverrides, TypeCheckConfiguration, TypeCheckFailCallback,
};
pub use diagnostics::{emit, set_diagnostic_sink, Diagnostic, DiagnosticSink};
pub use engine::check_type_internal;
pub use errors::CheckError;
pub use functions::{
    check_argument_types, check_return_type, check_send_type, check_type, check_type_in,
    check_yield_type, parameter_descriptor, value_label, BINARY_MAGIC_METHODS,
};
pub use memo::TypeCheckMemo;
pub use plugins::{autoload_plugins, load_plugins, PluginEntry, PluginResolver, PluginTarget};
pub use registry::{
    checker_lookups, is_test_double, lookup_fn, register_lookup, register_lookup_at,
    register_test_double, remove_lookup, reset_lookups, unregister_test_double, CheckFn, Checker,
    CheckerLookup, LookupRef,
};
pub use suppress::{
    suppress_type_checks, suppress_wrapper, suppressed, type_checks_suppressed, SuppressionGuard,
};
