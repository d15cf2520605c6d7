//! Checking wrappers.
//!
//! [`wrap_function`] produces a callable with the same calling convention
//! and metadata that checks arguments on entry and the result on exit,
//! without touching the wrapped body. [`wrap_class`] replaces every
//! annotated method, static method, class method and property accessor of
//! a class with its wrapper.

use std::sync::Arc;

use rtg_check::{global_config, ConfigOverrides, TypeCheckMemo};
use rtg_ir::{Name, ParamKind, SelfBinding};
use rtg_types::{
    build_descriptor_in, call_value, CallArgs, ClassRef, FunctionMarks, FunctionValue, Invoke,
    RuntimeResult, ScopeHandle, TypeDesc, Value,
};

use crate::call::{bind_self_type, CallChecker, CheckedParam};
use crate::error::InstrumentationError;
use crate::generator::check_lazy_value;

/// Options for one wrapper.
#[derive(Clone, Default)]
pub struct WrapOptions {
    /// Merged over the process-wide configuration at every call.
    pub overrides: Option<ConfigOverrides>,
    pub self_binding: Option<SelfBinding>,
}

struct CheckingBody {
    target: Value,
    params: Vec<CheckedParam>,
    returns: Option<TypeDesc>,
    self_binding: SelfBinding,
    scope: Option<ScopeHandle>,
    overrides: Option<ConfigOverrides>,
}

impl Invoke for CheckingBody {
    fn invoke(&self, func: &FunctionValue, args: CallArgs) -> RuntimeResult {
        let function = func.qualname.as_str();
        let bound = func.signature.bind(function, args.clone())?;
        let config = match &self.overrides {
            Some(overrides) => global_config().merged(overrides),
            None => global_config(),
        };
        let memo = TypeCheckMemo::new(self.scope.clone(), config)
            .with_self_type(bind_self_type(self.self_binding, &bound));
        let mut checker = CallChecker::new(
            function,
            self.params.clone(),
            self.returns.clone(),
            func.lazy,
            memo,
        )?;
        checker.check_arguments(&bound)?;
        let result = call_value(&self.target, args)?;
        if checker.is_lazy() {
            return Ok(check_lazy_value(result, checker));
        }
        checker.check_return(result).map_err(Into::into)
    }
}

/// Wrap one function in a checking wrapper.
///
/// Functions without annotations and functions marked to opt out are
/// returned unchanged. Functions already covered by instrumentation or
/// another wrapper are refused.
#[tracing::instrument(level = "debug", skip_all)]
pub fn wrap_function(func: &Value, options: &WrapOptions) -> Result<Value, InstrumentationError> {
    let Value::Function(inner) = func else {
        return Err(InstrumentationError::NotAFunction {
            type_name: func.type_name(),
        });
    };
    if inner.is_checked() {
        return Err(InstrumentationError::AlreadyInstrumented {
            function: inner.qualname.to_string(),
        });
    }
    if inner.marks.contains(FunctionMarks::NO_CHECK) || !inner.has_annotations() {
        return Ok(func.clone());
    }

    let scope = inner.globals.clone().map(ScopeHandle::new);
    let mut params = Vec::new();
    for param in &inner.signature.params {
        if let Some(annotation) = inner.annotation(param.name) {
            params.push(CheckedParam::from_annotation(
                param.name,
                param.kind,
                annotation,
                scope.as_ref(),
            )?);
        }
    }
    let returns = inner
        .return_annotation()
        .map(|annotation| build_descriptor_in(annotation, scope.as_ref()))
        .transpose()?;
    params.retain(|param| !param.desc.is_any());
    let returns = returns.filter(|desc| !desc.is_any());
    if params.is_empty() && returns.is_none() {
        return Ok(func.clone());
    }

    let self_binding = options
        .self_binding
        .unwrap_or_else(|| default_self_binding(inner));
    let body = CheckingBody {
        target: func.clone(),
        params,
        returns,
        self_binding,
        scope,
        overrides: options.overrides.clone(),
    };
    let mut wrapper = FunctionValue::clone(inner);
    wrapper.body = Arc::new(body);
    wrapper.marks |= FunctionMarks::WRAPPED;
    wrapper.wrapped = Some(func.clone());
    tracing::debug!(function = %inner.qualname, "wrapped function");
    Ok(Value::function(wrapper))
}

/// A function whose qualified name places it in a class binds `Self` to
/// the class of its first positional argument.
fn default_self_binding(func: &FunctionValue) -> SelfBinding {
    let in_class = func
        .qualname
        .as_str()
        .rsplit_once('.')
        .is_some_and(|(owner, _)| !owner.ends_with("<locals>"));
    match func.signature.params.first() {
        Some(first)
            if in_class
                && matches!(first.kind, ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword) =>
        {
            SelfBinding::InstanceOf(first.name)
        }
        _ => SelfBinding::None,
    }
}

fn first_param(func: &Value) -> Option<Name> {
    let first = func.as_function()?.signature.params.first()?;
    matches!(first.kind, ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword)
        .then_some(first.name)
}

/// Wrap `func` unless something already covers it.
fn wrap_member(
    func: &Value,
    options: &WrapOptions,
    self_binding: SelfBinding,
) -> Result<Value, InstrumentationError> {
    match func {
        Value::Function(inner) if !inner.is_checked() => wrap_function(
            func,
            &WrapOptions {
                overrides: options.overrides.clone(),
                self_binding: Some(self_binding),
            },
        ),
        _ => Ok(func.clone()),
    }
}

/// Replace every annotated member defined on `class` with its wrapper.
///
/// Returns the number of members replaced.
#[tracing::instrument(level = "debug", skip_all, fields(class = %class.qualified_name()))]
pub fn wrap_class(class: &ClassRef, options: &WrapOptions) -> Result<usize, InstrumentationError> {
    let mut replaced = 0;
    for (name, member) in class.own_attrs() {
        let wrapped = match &member {
            Value::Function(_) => {
                let binding = first_param(&member).map_or(SelfBinding::None, SelfBinding::InstanceOf);
                wrap_member(&member, options, binding)?
            }
            Value::StaticMethod(inner) => {
                Value::static_method(wrap_member(inner, options, SelfBinding::None)?)
            }
            Value::ClassMethod(inner) => {
                let binding = first_param(inner).map_or(SelfBinding::None, SelfBinding::ClassArg);
                Value::class_method(wrap_member(inner, options, binding)?)
            }
            Value::Property(property) => {
                let getter_binding =
                    first_param(&property.getter).map_or(SelfBinding::None, SelfBinding::InstanceOf);
                let getter = wrap_member(&property.getter, options, getter_binding)?;
                let setter = match &property.setter {
                    Some(setter) => {
                        let binding =
                            first_param(setter).map_or(SelfBinding::None, SelfBinding::InstanceOf);
                        Some(wrap_member(setter, options, binding)?)
                    }
                    None => None,
                };
                Value::property(getter, setter)
            }
            _ => continue,
        };
        if !wrapped.is(&member) && !same_members(&wrapped, &member) {
            class.set_attr(name, wrapped);
            replaced += 1;
        }
    }
    Ok(replaced)
}

/// Whether a rebuilt descriptor object holds exactly the original callables.
fn same_members(rebuilt: &Value, original: &Value) -> bool {
    match (rebuilt, original) {
        (Value::StaticMethod(a), Value::StaticMethod(b))
        | (Value::ClassMethod(a), Value::ClassMethod(b)) => a.is(b),
        (Value::Property(a), Value::Property(b)) => {
            a.getter.is(&b.getter)
                && match (&a.setter, &b.setter) {
                    (Some(x), Some(y)) => x.is(y),
                    (None, None) => true,
                    _ => false,
                }
        }
        _ => false,
    }
}
