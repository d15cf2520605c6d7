//! rtguard instrumentation - inserting checks into functions.
//!
//! Two ways to cover a function:
//! - `transform`: rewrite a module's IR so each annotated function binds a
//!   call memo on entry and routes arguments, returns, yields and sent
//!   values through the check entry points
//! - `wrap`: replace a runtime function value with a wrapper that checks
//!   arguments on entry and the result on exit, leaving the body alone
//!
//! Both share `CallChecker` for the per-call checks and `CheckedSequence`
//! for lazily-produced results.

mod call;
mod error;
mod generator;
mod names;
mod overrides;
mod transform;
mod wrap;

#[cfg(test)]
mod test_support;

pub use call::{bind_self_type, CallChecker, CheckedParam};
pub use error::InstrumentationError;
pub use generator::{check_lazy_value, CheckedSequence};
pub use names::{ANY_NAMES, IGNORE_DECORATORS, STATIC_GUARDS, TYPECHECKED_NAMES};
pub use transform::{instrument_module, InstrumentOptions, InstrumentReport};
pub use wrap::{wrap_class, wrap_function, WrapOptions};
