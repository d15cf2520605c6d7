//! Per-call checks.
//!
//! A [`CallChecker`] carries what one call of a checked function needs:
//! the parameter and return descriptors and the resolution context bound
//! for that call. Rewritten IR drives it through the injected nodes;
//! wrappers drive it around the wrapped call.

use rtg_check::{
    check_argument_types, check_return_type, check_send_type, check_yield_type,
    parameter_descriptor, CheckError, TypeCheckMemo,
};
use rtg_ir::{LazyKind, Name, ParamKind, SelfBinding};
use rtg_types::{
    build_descriptor_in, BoundArguments, ClassRef, Origin, ScopeHandle, TypeDesc,
    UnsupportedAnnotationError, Value,
};
use smallvec::SmallVec;

/// A parameter with the descriptor its bound argument is checked against.
#[derive(Clone, Debug)]
pub struct CheckedParam {
    pub name: Name,
    pub kind: ParamKind,
    /// Already wrapped for variadic parameters.
    pub desc: TypeDesc,
}

impl CheckedParam {
    /// Build from a declared annotation.
    pub fn from_annotation(
        name: Name,
        kind: ParamKind,
        annotation: &Value,
        scope: Option<&ScopeHandle>,
    ) -> Result<Self, UnsupportedAnnotationError> {
        let declared = build_descriptor_in(annotation, scope)?;
        Ok(CheckedParam {
            name,
            kind,
            desc: parameter_descriptor(kind, declared),
        })
    }
}

/// The class `Self` stands for in one call.
pub fn bind_self_type(binding: SelfBinding, bound: &BoundArguments) -> Option<ClassRef> {
    match binding {
        SelfBinding::None => None,
        SelfBinding::InstanceOf(name) => bound.get(name).map(Value::class_of),
        SelfBinding::ClassArg(name) => bound.get(name).and_then(Value::as_class).cloned(),
    }
}

#[derive(Debug)]
enum ExitChecks {
    Unchecked,
    Return(TypeDesc),
    Lazy {
        produced: TypeDesc,
        accepted: TypeDesc,
        /// `None` for async sequences.
        finished: Option<TypeDesc>,
    },
}

/// Checks for one call.
pub struct CallChecker {
    func_name: String,
    params: Vec<CheckedParam>,
    exit: ExitChecks,
    memo: TypeCheckMemo,
}

impl CallChecker {
    /// A checker for a call of `func_name`.
    ///
    /// For lazily-produced sequences the return descriptor is split into
    /// its produced, accepted and final parts; a deferred return annotation
    /// is resolved first.
    pub fn new(
        func_name: impl Into<String>,
        params: Vec<CheckedParam>,
        returns: Option<TypeDesc>,
        lazy: Option<LazyKind>,
        mut memo: TypeCheckMemo,
    ) -> Result<Self, CheckError> {
        let exit = match (returns, lazy) {
            (None, _) => ExitChecks::Unchecked,
            (Some(returns), None) => ExitChecks::Return(returns),
            (Some(returns), Some(kind)) => {
                let returns = match &returns.origin {
                    Origin::Deferred { source, scope } => memo
                        .resolve_deferred(*source, scope.as_ref())?
                        .unwrap_or_else(TypeDesc::any),
                    _ => returns,
                };
                let (produced, accepted, finished) = returns.lazy_components();
                ExitChecks::Lazy {
                    produced,
                    accepted,
                    finished: (kind == LazyKind::Sync).then_some(finished),
                }
            }
        };
        Ok(CallChecker {
            func_name: func_name.into(),
            params,
            exit,
            memo,
        })
    }

    pub fn func_name(&self) -> &str {
        &self.func_name
    }

    pub fn memo(&self) -> &TypeCheckMemo {
        &self.memo
    }

    /// Whether the function produces a lazily-produced sequence.
    pub fn is_lazy(&self) -> bool {
        matches!(self.exit, ExitChecks::Lazy { .. })
    }

    /// Check every annotated parameter that received a value.
    pub fn check_arguments(&mut self, bound: &BoundArguments) -> Result<(), CheckError> {
        let arguments: SmallVec<[(Name, Value, TypeDesc); 4]> = self
            .params
            .iter()
            .filter_map(|param| {
                bound
                    .get(param.name)
                    .map(|value| (param.name, value.clone(), param.desc.clone()))
            })
            .collect();
        check_argument_types(&self.func_name, &arguments, &mut self.memo)
    }

    /// Check a returned value, or the final value of a finished sequence.
    pub fn check_return(&mut self, value: Value) -> Result<Value, CheckError> {
        match &self.exit {
            ExitChecks::Unchecked
            | ExitChecks::Lazy {
                finished: None, ..
            } => Ok(value),
            ExitChecks::Return(desc)
            | ExitChecks::Lazy {
                finished: Some(desc),
                ..
            } => check_return_type(&self.func_name, value, desc, &mut self.memo),
        }
    }

    /// Check a produced value.
    pub fn check_yield(&mut self, value: Value) -> Result<Value, CheckError> {
        match &self.exit {
            ExitChecks::Lazy { produced, .. } => {
                check_yield_type(&self.func_name, value, produced, &mut self.memo)
            }
            _ => Ok(value),
        }
    }

    /// Check a value the sequence was resumed with.
    pub fn check_send(&mut self, value: Value) -> Result<Value, CheckError> {
        match &self.exit {
            ExitChecks::Lazy { accepted, .. } => {
                check_send_type(&self.func_name, value, accepted, &mut self.memo)
            }
            _ => Ok(value),
        }
    }
}

impl std::fmt::Debug for CallChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallChecker")
            .field("func_name", &self.func_name)
            .field("params", &self.params)
            .field("exit", &self.exit)
            .finish_non_exhaustive()
    }
}
