//! Function definitions, calls and the injected check nodes.

use std::any::Any;
use std::sync::Arc;

use parking_lot::Mutex;
use rtg_check::{global_config, ConfigOverrides, TypeCheckMemo};
use rtg_instrument::{bind_self_type, CallChecker, CheckedParam};
use rtg_ir::visit::contains_yield;
use rtg_ir::{CheckPlan, FuncId, LazyKind, Module, Name, PlanId};
use rtg_types::{
    build_descriptor_in, call_value, BoundArguments, CallArgs, FunctionMarks, FunctionValue,
    GeneratorObj, Invoke, RuntimeError, RuntimeResult, SigParam, Signature, TypeDesc, Value,
};

use super::generator::ThreadedSequence;
use super::{Flow, Interpreter};
use crate::environment::Environment;
use crate::errors::{check_outside_call, yield_outside_sequence};

/// Descriptors of a check plan, built on first use.
pub(super) struct PreparedPlan {
    params: Vec<CheckedParam>,
    returns: Option<TypeDesc>,
}

type PlanCache = Arc<Mutex<Option<Arc<PreparedPlan>>>>;

/// State of one call of an IR function.
pub(super) struct CallState {
    bound: BoundArguments,
    closure: Environment,
    overrides: Option<ConfigOverrides>,
    plans: PlanCache,
    checker: Option<CallChecker>,
}

/// Body of a function defined by IR.
pub(crate) struct IrFunction {
    module: Arc<Module>,
    func: FuncId,
    closure: Environment,
    /// Plain-name path of the definition inside its module.
    path: Vec<Name>,
    plans: PlanCache,
    overrides: Option<ConfigOverrides>,
}

impl IrFunction {
    pub(crate) fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub(crate) fn func(&self) -> FuncId {
        self.func
    }

    pub(crate) fn path(&self) -> &[Name] {
        &self.path
    }

    /// The same definition inside a rewritten copy of its module.
    pub(crate) fn rebased(&self, module: Arc<Module>, overrides: Option<ConfigOverrides>) -> Self {
        IrFunction {
            module,
            func: self.func,
            closure: self.closure.clone(),
            path: self.path.clone(),
            plans: PlanCache::default(),
            overrides,
        }
    }

    /// The IR body behind a function value, if it has one.
    pub(crate) fn of(func: &FunctionValue) -> Option<&IrFunction> {
        func.body.as_any()?.downcast_ref::<IrFunction>()
    }
}

impl Invoke for IrFunction {
    fn invoke(&self, func: &FunctionValue, args: CallArgs) -> RuntimeResult {
        let bound = func.signature.bind(func.qualname.as_str(), args)?;
        let env = self.closure.function_child(func.name);
        for (name, value) in &bound.values {
            env.define(*name, value.clone());
        }
        let mut interp = Interpreter::new(Arc::clone(&self.module), env);
        interp.path.clone_from(&self.path);
        interp.qual_prefix = Some(format!("{}.<locals>", func.qualname));
        interp.call = Some(CallState {
            bound,
            closure: self.closure.clone(),
            overrides: self.overrides.clone(),
            plans: Arc::clone(&self.plans),
            checker: None,
        });

        let body = self.module.arena.function(self.func).body;
        if let Some(kind) = func.lazy {
            let sequence = ThreadedSequence::new(func.qualname, interp, body);
            return Ok(Value::generator(GeneratorObj::new(
                func.name,
                func.qualname,
                kind,
                Box::new(sequence),
            )));
        }
        match interp.exec_block(body)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => Ok(Value::None),
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        Some(self)
    }
}

impl Interpreter {
    /// Evaluate a `def` into a function value, decorators applied.
    pub(super) fn define_function(&mut self, id: FuncId) -> RuntimeResult {
        let def = *self.module.arena.function(id);
        let decorators = self.eval_list(def.decorators)?;

        let params = self.module.arena.params(def.params).to_vec();
        let mut signature = Vec::with_capacity(params.len());
        let mut annotations = Vec::new();
        for param in params {
            let default = match param.default {
                Some(expr) => Some(self.eval(expr)?),
                None => None,
            };
            if let Some(annotation) = param.annotation {
                annotations.push((param.name, self.eval_annotation(annotation)?));
            }
            signature.push(SigParam {
                name: param.name,
                kind: param.kind,
                default,
            });
        }
        if let Some(returns) = def.returns {
            annotations.push((Name::intern("return"), self.eval_annotation(returns)?));
        }

        let closure = self.env.closure_scope();
        let body = IrFunction {
            module: Arc::clone(&self.module),
            func: id,
            closure: closure.clone(),
            path: self.child_path(def.name),
            plans: PlanCache::default(),
            overrides: None,
        };
        let mut func = FunctionValue::new(def.name, Signature::new(signature), Arc::new(body));
        func.qualname = self.qualname_for(def.name);
        func.module = self.module.name;
        func.annotations = annotations;
        func.doc = def.doc;
        func.globals = Some(closure.scope_ref());
        func.is_async = def.is_async();
        func.lazy = contains_yield(&self.module.arena, def.body).then_some(if def.is_async() {
            LazyKind::Async
        } else {
            LazyKind::Sync
        });
        if def.is_instrumented() {
            func.marks |= FunctionMarks::INSTRUMENTED;
        }

        let mut value = Value::function(func);
        for decorator in decorators.iter().rev() {
            value = call_value(decorator, CallArgs::new([value]))?;
        }
        Ok(value)
    }

    pub(super) fn yield_value(&mut self, value: Value) -> RuntimeResult {
        match &self.yields {
            Some(port) => port.yield_value(value),
            None => Err(yield_outside_sequence()),
        }
    }

    /// Bind the call's checker from the function's plan.
    pub(super) fn bind_call_memo(&mut self, plan_id: PlanId) -> Result<(), RuntimeError> {
        let module = Arc::clone(&self.module);
        let plan = module.arena.plan(plan_id);
        let Some(call) = self.call.as_mut() else {
            return Err(check_outside_call());
        };
        let prepared = prepared_plan(&module, plan, &call.closure, &call.plans)?;

        let base = global_config();
        let config = match &call.overrides {
            Some(overrides) => base.merged(overrides),
            None => base,
        }
        .with_plan(plan.overrides);
        let memo = TypeCheckMemo::new(Some(call.closure.scope_handle()), config)
            .with_self_type(bind_self_type(plan.self_binding, &call.bound));
        call.checker = Some(CallChecker::new(
            plan.qualname.as_str(),
            prepared.params.clone(),
            prepared.returns.clone(),
            plan.lazy,
            memo,
        )?);
        Ok(())
    }

    fn checker(&mut self) -> Result<(&mut CallChecker, &BoundArguments), RuntimeError> {
        match &mut self.call {
            Some(CallState {
                checker: Some(checker),
                bound,
                ..
            }) => Ok((checker, &*bound)),
            _ => Err(check_outside_call()),
        }
    }

    pub(super) fn check_arguments(&mut self) -> Result<(), RuntimeError> {
        let (checker, bound) = self.checker()?;
        checker.check_arguments(bound)?;
        Ok(())
    }

    pub(super) fn check_return(&mut self, value: Value) -> RuntimeResult {
        let (checker, _) = self.checker()?;
        checker.check_return(value).map_err(Into::into)
    }

    pub(super) fn check_yield(&mut self, value: Value) -> RuntimeResult {
        let (checker, _) = self.checker()?;
        checker.check_yield(value).map_err(Into::into)
    }

    pub(super) fn check_send(&mut self, value: Value) -> RuntimeResult {
        let (checker, _) = self.checker()?;
        checker.check_send(value).map_err(Into::into)
    }
}

/// Build (once per function) the descriptors a plan checks against.
///
/// Plan annotations are evaluated in the function's defining scope, so a
/// name bound after the definition still resolves at the first call.
fn prepared_plan(
    module: &Arc<Module>,
    plan: &CheckPlan,
    closure: &Environment,
    cache: &PlanCache,
) -> Result<Arc<PreparedPlan>, RuntimeError> {
    if let Some(prepared) = cache.lock().as_ref() {
        return Ok(Arc::clone(prepared));
    }

    let scope = closure.scope_handle();
    let mut interp = Interpreter::new(Arc::clone(module), closure.clone());
    let mut params = Vec::with_capacity(plan.params.len());
    for param in &plan.params {
        let annotation = interp.eval_annotation(param.annotation)?;
        params.push(CheckedParam::from_annotation(
            param.name,
            param.kind,
            &annotation,
            Some(&scope),
        )?);
    }
    let returns = match plan.returns {
        Some(expr) => {
            let annotation = interp.eval_annotation(expr)?;
            Some(build_descriptor_in(&annotation, Some(&scope))?)
        }
        None => None,
    };

    let prepared = Arc::new(PreparedPlan { params, returns });
    *cache.lock() = Some(Arc::clone(&prepared));
    tracing::trace!(function = %plan.qualname, "prepared check plan");
    Ok(prepared)
}
