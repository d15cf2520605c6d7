//! Per-function instrumentation entry point.
//!
//! [`typechecked`] covers one function, or every annotated member of a
//! class. Functions defined by IR are rewritten in a private copy of their
//! module so the rewrite is the same one the import hook would apply;
//! everything else is wrapped. Under optimized mode the entry point returns
//! its argument unchanged.

use std::sync::Arc;

use rtg_check::{optimized_mode, ConfigOverrides};
use rtg_instrument::{
    instrument_module, wrap_class, wrap_function, InstrumentOptions, InstrumentationError,
    WrapOptions,
};
use rtg_ir::Module;
use rtg_types::{ClassRef, FunctionMarks, FunctionValue, Value};

use crate::interpreter::IrFunction;

/// Instrument a function or class.
///
/// Functions that opted out, that carry nothing to check, or that are
/// already instrumented come back unchanged; so does any value that is
/// neither a function, a method descriptor nor a class.
#[tracing::instrument(level = "debug", skip_all)]
pub fn typechecked(
    target: &Value,
    overrides: Option<&ConfigOverrides>,
) -> Result<Value, InstrumentationError> {
    if optimized_mode() {
        tracing::trace!("optimized mode, returning target unchanged");
        return Ok(target.clone());
    }
    match target {
        Value::Function(_) => function(target, overrides),
        Value::StaticMethod(inner) => Ok(Value::static_method(function(inner, overrides)?)),
        Value::ClassMethod(inner) => Ok(Value::class_method(function(inner, overrides)?)),
        Value::Class(class) => {
            class_members(class, overrides)?;
            Ok(target.clone())
        }
        _ => Ok(target.clone()),
    }
}

fn function(
    target: &Value,
    overrides: Option<&ConfigOverrides>,
) -> Result<Value, InstrumentationError> {
    let Value::Function(func) = target else {
        return Ok(target.clone());
    };
    if func.is_checked() || func.marks.contains(FunctionMarks::NO_CHECK) {
        return Ok(target.clone());
    }
    match IrFunction::of(func) {
        Some(ir) => rewrite(func, ir, overrides),
        None => wrap_function(
            target,
            &WrapOptions {
                overrides: overrides.cloned(),
                self_binding: None,
            },
        ),
    }
}

/// Rewrite the definition behind an IR function and return a function value
/// running the rewritten body.
fn rewrite(
    func: &FunctionValue,
    ir: &IrFunction,
    overrides: Option<&ConfigOverrides>,
) -> Result<Value, InstrumentationError> {
    let mut module = Module::clone(ir.module());
    let options = InstrumentOptions {
        target_path: Some(ir.path().to_vec()),
        nested_functions: false,
    };
    let report = instrument_module(&mut module, &options)?;
    let rewritten = report.find(func.qualname.as_str()).is_some()
        || module.arena.function(ir.func()).is_instrumented();
    if !rewritten {
        tracing::debug!(function = %func.qualname, "nothing to instrument");
        return Ok(Value::function(func.clone()));
    }

    let mut instrumented = func.clone();
    instrumented.body = Arc::new(ir.rebased(Arc::new(module), overrides.cloned()));
    instrumented.marks |= FunctionMarks::INSTRUMENTED;
    tracing::debug!(function = %func.qualname, "instrumented function");
    Ok(Value::function(instrumented))
}

/// Rewrite the IR methods of a class in place, then wrap what is left.
fn class_members(
    class: &ClassRef,
    overrides: Option<&ConfigOverrides>,
) -> Result<(), InstrumentationError> {
    for (name, member) in class.own_attrs() {
        let replacement = match &member {
            Value::Function(func) if IrFunction::of(func).is_some() => {
                function(&member, overrides)?
            }
            Value::StaticMethod(inner) if is_ir_function(inner) => {
                Value::static_method(function(inner, overrides)?)
            }
            Value::ClassMethod(inner) if is_ir_function(inner) => {
                Value::class_method(function(inner, overrides)?)
            }
            _ => continue,
        };
        class.set_attr(name, replacement);
    }
    let wrapped = wrap_class(
        class,
        &WrapOptions {
            overrides: overrides.cloned(),
            self_binding: None,
        },
    )?;
    tracing::debug!(class = %class.qualified_name(), wrapped, "instrumented class");
    Ok(())
}

fn is_ir_function(value: &Value) -> bool {
    value
        .as_function()
        .is_some_and(|func| IrFunction::of(func).is_some())
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
