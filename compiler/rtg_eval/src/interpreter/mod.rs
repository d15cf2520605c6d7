//! Tree-walking interpreter for the IR.
//!
//! One [`Interpreter`] executes one block of one module: a module body, a
//! class body, or one call of a function. Each carries the module's arena
//! (shared, never copied), the frame it binds names in and, for calls, the
//! per-call state the injected check nodes act on.
//!
//! # Architecture
//!
//! - `mod.rs`: statements and expressions
//! - `operators`: binary, comparison and unary operators, subscripts and
//!   iteration
//! - `function`: function definitions, the IR function body and the
//!   injected check nodes
//! - `class`: class definitions, including typed records and structural
//!   interfaces
//! - `generator`: lazily-produced sequences running on their own thread

mod class;
mod function;
mod generator;
mod operators;

pub(crate) use function::IrFunction;

use std::sync::Arc;

use rtg_ir::{
    print_expr, ExprId, ExprKind, Module, Name, StmtId, StmtKind, StmtRange, IR_VERSION,
};
use rtg_types::{
    call_value, construct, get_attribute, lookup_attribute, name_not_found, raised, set_attribute,
    BuiltinKind, CallArgs, RuntimeError, RuntimeErrorKind, RuntimeResult, SpecialForm,
    Value,
};

use crate::environment::{Environment, FrameKind};
use crate::errors::{bare_raise, not_an_exception, unsupported_construct};
use crate::loader;
use function::CallState;
use generator::YieldPort;

/// How a block finished.
#[derive(Debug)]
pub(crate) enum Flow {
    Normal,
    Return(Value),
}

/// Executes one block of one module.
pub struct Interpreter {
    module: Arc<Module>,
    env: Environment,
    /// Plain-name path of the current scope inside the module.
    path: Vec<Name>,
    /// Qualified-name prefix for definitions made in this scope.
    qual_prefix: Option<String>,
    call: Option<CallState>,
    /// Set while executing the body of a lazily-produced sequence.
    yields: Option<YieldPort>,
    /// Annotations declared in a class body, in order.
    annotations: Vec<(Name, Value)>,
}

impl Interpreter {
    /// An interpreter for the top level of `module`.
    pub fn new(module: Arc<Module>, env: Environment) -> Self {
        Interpreter {
            module,
            env,
            path: Vec::new(),
            qual_prefix: None,
            call: None,
            yields: None,
            annotations: Vec::new(),
        }
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    /// Execute the module body.
    #[tracing::instrument(level = "debug", skip_all, fields(module = %self.module.name))]
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        if self.module.ir_version != IR_VERSION {
            return Err(RuntimeError::new(format!(
                "module {} carries IR version {}, expected {IR_VERSION}",
                self.module.name, self.module.ir_version
            )));
        }
        let body = self.module.body;
        match self.exec_block(body)? {
            Flow::Normal => Ok(()),
            Flow::Return(_) => Err(RuntimeError::new("'return' outside function")),
        }
    }

    fn qualname_for(&self, name: Name) -> Name {
        match &self.qual_prefix {
            Some(prefix) => Name::intern(&format!("{prefix}.{name}")),
            None => name,
        }
    }

    fn child_path(&self, name: Name) -> Vec<Name> {
        let mut path = self.path.clone();
        path.push(name);
        path
    }

    // Statements

    pub(crate) fn exec_block(&mut self, range: StmtRange) -> Result<Flow, RuntimeError> {
        let module = Arc::clone(&self.module);
        for &stmt in module.arena.stmt_list(range) {
            if let Flow::Return(value) = self.exec_stmt(stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, id: StmtId) -> Result<Flow, RuntimeError> {
        let kind = self.module.arena.stmt(id);
        match kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
            }
            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.assign(target, value)?;
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                if self.env.kind() == FrameKind::Class {
                    let annotation = self.eval_annotation(annotation)?;
                    self.annotations.push((target, annotation));
                }
                if let Some(value) = value {
                    let value = self.eval(value)?;
                    self.env.define(target, value);
                }
            }
            StmtKind::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                return Ok(Flow::Return(value));
            }
            StmtKind::If { test, body, orelse } => {
                let branch = if self.eval(test)?.is_truthy() {
                    body
                } else {
                    orelse
                };
                return self.exec_block(branch);
            }
            StmtKind::While { test, body } => {
                while self.eval(test)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_block(body)? {
                        return Ok(Flow::Return(value));
                    }
                }
            }
            StmtKind::For { target, iter, body } => {
                let iterable = self.eval(iter)?;
                return operators::for_each(&iterable, |item| {
                    self.env.define(target, item);
                    self.exec_block(body)
                });
            }
            StmtKind::Pass => {}
            StmtKind::Raise(value) => return Err(self.raise(value)?),
            StmtKind::FunctionDef(func) => {
                let name = self.module.arena.function(func).name;
                let value = self.define_function(func)?;
                self.env.define(name, value);
            }
            StmtKind::ClassDef(class) => {
                let name = self.module.arena.class(class).name;
                let value = self.define_class(class)?;
                self.env.define(name, value);
            }
            StmtKind::Import { module, alias } => self.import(module, alias)?,
            StmtKind::ImportFrom { module, names } => {
                let imported = loader::import_module(module.as_str())?;
                let aliases = self.module.arena.aliases(names).to_vec();
                for alias in aliases {
                    let value = import_member(&imported, module, alias.name)?;
                    self.env.define(alias.bound_name(), value);
                }
            }
            StmtKind::Opaque(description) => {
                return Err(unsupported_construct(description.as_str()))
            }
            StmtKind::BindCallMemo(plan) => self.bind_call_memo(plan)?,
            StmtKind::CheckArguments => self.check_arguments()?,
        }
        Ok(Flow::Normal)
    }

    fn assign(&mut self, target: ExprId, value: Value) -> Result<(), RuntimeError> {
        match self.module.arena.expr(target) {
            ExprKind::Name(name) => {
                self.env.define(name, value);
                Ok(())
            }
            ExprKind::Attribute { value: object, attr } => {
                let object = self.eval(object)?;
                set_attribute(&object, attr, value)
            }
            ExprKind::Subscript {
                value: container,
                index,
            } => {
                let container = self.eval(container)?;
                let index = self.eval(index)?;
                operators::set_item(&container, index, value)
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => {
                let targets = self.module.arena.expr_list(items).to_vec();
                let values = value.iter_snapshot()?;
                if values.len() != targets.len() {
                    return Err(RuntimeError::new(format!(
                        "cannot unpack {} values into {} targets",
                        values.len(),
                        targets.len()
                    )));
                }
                for (target, value) in targets.into_iter().zip(values) {
                    self.assign(target, value)?;
                }
                Ok(())
            }
            _ => Err(RuntimeError::new(format!(
                "cannot assign to {}",
                print_expr(&self.module.arena, target)
            ))),
        }
    }

    fn raise(&mut self, value: Option<ExprId>) -> Result<RuntimeError, RuntimeError> {
        let Some(expr) = value else {
            return Ok(bare_raise());
        };
        let exception = match self.eval(expr)? {
            Value::Class(class) => construct(&class, CallArgs::default())?,
            other => other,
        };
        if !exception.is_instance_of(&rtg_types::builtin_class(BuiltinKind::BaseException)) {
            return Ok(not_an_exception(&exception));
        }
        Ok(raised(exception))
    }

    fn import(&mut self, module: Name, alias: Option<Name>) -> Result<(), RuntimeError> {
        let imported = loader::import_module(module.as_str())?;
        match alias {
            Some(alias) => self.env.define(alias, imported),
            None => {
                let top = module.as_str().split('.').next().unwrap_or(module.as_str());
                let package = loader::import_module(top)?;
                self.env.define(Name::intern(top), package);
            }
        }
        Ok(())
    }

    // Expressions

    pub(crate) fn eval(&mut self, id: ExprId) -> RuntimeResult {
        rtg_ir::ensure_sufficient_stack(|| self.eval_inner(id))
    }

    fn eval_inner(&mut self, id: ExprId) -> RuntimeResult {
        match self.module.arena.expr(id) {
            ExprKind::None => Ok(Value::None),
            ExprKind::Bool(b) => Ok(Value::Bool(b)),
            ExprKind::Int(n) => Ok(Value::Int(n)),
            ExprKind::Float(bits) => Ok(Value::Float(f64::from_bits(bits))),
            ExprKind::Str(s) => Ok(Value::string(s.as_str())),
            ExprKind::Bytes(b) => Ok(Value::bytes(b.as_str().as_bytes())),
            ExprKind::Ellipsis => Ok(Value::Ellipsis),
            ExprKind::Name(name) => self.lookup(name),
            ExprKind::Attribute { value, attr } => {
                let value = self.eval(value)?;
                get_attribute(&value, attr)
            }
            ExprKind::Subscript { value, index } => {
                let value = self.eval(value)?;
                let index = self.eval(index)?;
                operators::get_item(&value, &index)
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                let callee = self.eval(func)?;
                let mut call_args = CallArgs::new(self.eval_list(args)?);
                let keywords = self.module.arena.keywords(keywords).to_vec();
                for keyword in keywords {
                    let value = self.eval(keyword.value)?;
                    call_args.keywords.push((keyword.name, value));
                }
                call_value(&callee, call_args)
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                operators::binary(op, &left, &right)
            }
            ExprKind::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                operators::compare(op, &left, &right).map(Value::Bool)
            }
            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                operators::unary(op, &operand)
            }
            ExprKind::List(items) => Ok(Value::list(self.eval_list(items)?)),
            ExprKind::Tuple(items) => Ok(Value::tuple(self.eval_list(items)?)),
            ExprKind::Set(items) => Ok(Value::set(self.eval_list(items)?)),
            ExprKind::Dict(entries) => {
                let entries = self.module.arena.dict_entries(entries).to_vec();
                let mut pairs = Vec::with_capacity(entries.len());
                for entry in entries {
                    pairs.push((self.eval(entry.key)?, self.eval(entry.value)?));
                }
                Ok(Value::dict(pairs))
            }
            ExprKind::Yield(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                self.yield_value(value)
            }
            ExprKind::AnyType => Ok(Value::Form(SpecialForm::Any)),
            ExprKind::CheckReturn(value) => {
                let value = self.eval(value)?;
                self.check_return(value)
            }
            ExprKind::CheckYield(value) => {
                let value = self.eval(value)?;
                self.check_yield(value)
            }
            ExprKind::CheckSend(value) => {
                let value = self.eval(value)?;
                self.check_send(value)
            }
        }
    }

    fn eval_list(&mut self, range: rtg_ir::ExprRange) -> Result<Vec<Value>, RuntimeError> {
        let items = self.module.arena.expr_list(range).to_vec();
        items.into_iter().map(|item| self.eval(item)).collect()
    }

    fn lookup(&self, name: Name) -> RuntimeResult {
        self.env
            .lookup(name)
            .ok_or_else(|| name_not_found(name.as_str()))
    }

    /// Evaluate an annotation at definition time.
    ///
    /// Quoted annotations, every annotation of a module with postponed
    /// evaluation, and annotations naming something not bound yet become
    /// deferred references carrying their source text.
    pub(crate) fn eval_annotation(&mut self, id: ExprId) -> RuntimeResult {
        if self.module.postponed_annotations {
            return Ok(Value::string(print_expr(&self.module.arena, id)));
        }
        match self.eval(id) {
            Ok(value) => Ok(value),
            Err(err)
                if matches!(
                    err.kind,
                    RuntimeErrorKind::NameNotFound { .. } | RuntimeErrorKind::AttributeNotFound { .. }
                ) =>
            {
                tracing::trace!(error = %err, "deferring annotation");
                Ok(Value::string(print_expr(&self.module.arena, id)))
            }
            Err(err) => Err(err),
        }
    }
}

/// `from module import name`: a module attribute, or else a submodule.
fn import_member(imported: &Value, module: Name, name: Name) -> RuntimeResult {
    if let Some(value) = lookup_attribute(imported, name)? {
        return Ok(value);
    }
    let submodule = format!("{module}.{name}");
    match loader::import_module(&submodule) {
        Ok(value) => Ok(value),
        Err(_) => Err(rtg_types::import_failed(
            module.as_str(),
            format!("cannot import name '{name}'"),
        )),
    }
}
