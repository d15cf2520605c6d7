//! The check-injecting rewrite.
//!
//! [`instrument_module`] walks a module and rewrites every annotated
//! function so that each call binds a resolution context from the
//! function's [`CheckPlan`], checks its annotated arguments, and checks
//! every value it returns, yields or is sent.
//!
//! Functions that opt out, that carry no annotation other than `Any`, or
//! that were already rewritten are left alone, so rewriting a module twice
//! changes nothing the second time.

use rustc_hash::FxHashSet;
use rtg_check::{emit, global_config, Diagnostic};
use rtg_ir::visit::{contains_yield, returns_value};
use rtg_ir::{
    print_module, CheckPlan, ClassId, ExprId, ExprKind, ExprRange, FuncId, FunctionDef,
    FunctionFlags, IrArena, LazyKind, Module, Name, Param, ParamKind, PlanParam, SelfBinding,
    StmtKind, StmtRange, IR_VERSION,
};
use smallvec::SmallVec;

use crate::error::InstrumentationError;
use crate::names::{bound_names, NameScopes, IGNORE_DECORATORS, STATIC_GUARDS};
use crate::overrides::parse_overrides;

const STATICMETHOD: [&str; 2] = ["staticmethod", "builtins.staticmethod"];
const CLASSMETHOD: [&str; 2] = ["classmethod", "builtins.classmethod"];

/// What a rewrite covers.
#[derive(Clone, Debug, Default)]
pub struct InstrumentOptions {
    /// Rewrite only the definition at this path of plain names
    /// (`["Shape", "area"]`); everything else is left alone.
    pub target_path: Option<Vec<Name>>,
    /// Also rewrite functions defined inside other functions.
    pub nested_functions: bool,
}

impl InstrumentOptions {
    /// Options that rewrite only the definition at a dotted path.
    pub fn target(path: &str) -> Self {
        InstrumentOptions {
            target_path: Some(path.split('.').map(Name::intern).collect()),
            nested_functions: false,
        }
    }
}

/// What a rewrite did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InstrumentReport {
    /// Rewritten functions by qualified name.
    pub instrumented: Vec<(Name, FuncId)>,
    /// Functions left alone because they opted out, had nothing to check,
    /// or were rewritten before.
    pub skipped: Vec<Name>,
}

impl InstrumentReport {
    /// The rewritten function with this qualified name.
    pub fn find(&self, qualname: &str) -> Option<FuncId> {
        self.instrumented
            .iter()
            .find(|(name, _)| name.as_str() == qualname)
            .map(|(_, id)| *id)
    }
}

/// Rewrite every annotated function of `module` in place.
#[tracing::instrument(level = "debug", skip_all, fields(module = %module.name))]
pub fn instrument_module(
    module: &mut Module,
    options: &InstrumentOptions,
) -> Result<InstrumentReport, InstrumentationError> {
    if module.ir_version != IR_VERSION {
        return Err(InstrumentationError::IrVersion {
            module: module.name.to_string(),
            found: module.ir_version,
            expected: IR_VERSION,
        });
    }

    let mut rewriter = Rewriter {
        arena: &mut module.arena,
        options,
        names: NameScopes::new(),
        static_only: FxHashSet::default(),
        path: Vec::new(),
        function_depth: 0,
        report: InstrumentReport::default(),
    };
    rewriter.block(module.body, Scope::Module)?;
    let report = rewriter.report;

    tracing::debug!(
        instrumented = report.instrumented.len(),
        skipped = report.skipped.len(),
        "rewrote module"
    );
    if !report.instrumented.is_empty() && global_config().debug_instrumentation {
        emit(&Diagnostic::InstrumentationDump {
            module: module.name.to_string(),
            text: print_module(module),
        });
    }
    Ok(report)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Scope {
    Module,
    Class,
    Function,
}

/// One element of the definition path; functions open a `<locals>` level.
#[derive(Copy, Clone)]
struct PathElement {
    name: Name,
    is_function: bool,
}

struct Rewriter<'a> {
    arena: &'a mut IrArena,
    options: &'a InstrumentOptions,
    names: NameScopes,
    /// Names that only exist for static analysis.
    static_only: FxHashSet<Name>,
    path: Vec<PathElement>,
    /// Number of enclosing function definitions.
    function_depth: usize,
    report: InstrumentReport,
}

impl Rewriter<'_> {
    fn block(&mut self, block: StmtRange, scope: Scope) -> Result<(), InstrumentationError> {
        let stmts = self.arena.stmt_list(block).to_vec();
        for stmt in stmts {
            let kind = self.arena.stmt(stmt);
            match kind {
                StmtKind::Import { .. } | StmtKind::ImportFrom { .. } => {
                    self.names.record(self.arena, kind);
                }
                StmtKind::FunctionDef(func) => self.function(func, scope)?,
                StmtKind::ClassDef(class) => self.class(class)?,
                StmtKind::If { test, body, orelse } => {
                    if scope == Scope::Module && self.names.matches(self.arena, test, &STATIC_GUARDS) {
                        self.static_guard(body, orelse);
                    } else {
                        self.block(body, scope)?;
                    }
                    self.block(orelse, scope)?;
                }
                StmtKind::While { body, .. } | StmtKind::For { body, .. } => {
                    self.block(body, scope)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// `if TYPE_CHECKING:` never runs its body; names bound only there are
    /// replaced with `Any` in injected checks.
    fn static_guard(&mut self, body: StmtRange, orelse: StmtRange) {
        let runtime = bound_names(self.arena, orelse);
        let static_only = bound_names(self.arena, body);
        self.static_only
            .extend(static_only.into_iter().filter(|name| !runtime.contains(name)));
        for stmt in self.arena.stmt_list(body) {
            self.names.record(self.arena, self.arena.stmt(*stmt));
        }
    }

    fn class(&mut self, id: ClassId) -> Result<(), InstrumentationError> {
        let def = *self.arena.class(id);
        if self.has_decorator(def.decorators, &IGNORE_DECORATORS) {
            self.report.skipped.push(def.name);
            return Ok(());
        }
        self.path.push(PathElement {
            name: def.name,
            is_function: false,
        });
        if self.may_contain_target() {
            self.names.push();
            self.block(def.body, Scope::Class)?;
            self.names.pop();
        }
        self.path.pop();
        Ok(())
    }

    fn function(&mut self, id: FuncId, scope: Scope) -> Result<(), InstrumentationError> {
        let def = *self.arena.function(id);
        self.path.push(PathElement {
            name: def.name,
            is_function: true,
        });
        let result = self.function_in_path(id, def, scope);
        self.path.pop();
        result
    }

    fn function_in_path(
        &mut self,
        id: FuncId,
        def: FunctionDef,
        scope: Scope,
    ) -> Result<(), InstrumentationError> {
        let qualname = self.qualname();
        if def.is_instrumented() || self.has_decorator(def.decorators, &IGNORE_DECORATORS) {
            self.report.skipped.push(qualname);
            return Ok(());
        }
        if !self.may_contain_target() {
            return Ok(());
        }

        // Inner definitions first; the outer rewrite never descends into them.
        self.names.push();
        self.function_depth += 1;
        let inner = self.block(def.body, Scope::Function);
        self.function_depth -= 1;
        let wanted = match &self.options.target_path {
            Some(_) => self.on_target(),
            None => self.function_depth == 0 || self.options.nested_functions,
        };
        let result = match inner {
            Ok(()) if wanted => self.instrument(id, def, scope, qualname),
            other => other,
        };
        self.names.pop();
        result
    }

    fn instrument(
        &mut self,
        id: FuncId,
        def: FunctionDef,
        scope: Scope,
        qualname: Name,
    ) -> Result<(), InstrumentationError> {
        let function = qualname.as_str();
        let params: SmallVec<[Param; 8]> = self.arena.params(def.params).iter().copied().collect();
        let checked: SmallVec<[(Param, ExprId); 8]> = params
            .iter()
            .filter_map(|param| {
                let annotation = param.annotation?;
                (!self.names.is_any(self.arena, annotation)).then_some((*param, annotation))
            })
            .collect();
        let returns = def
            .returns
            .filter(|annotation| !self.names.is_any(self.arena, *annotation));
        if checked.is_empty() && returns.is_none() {
            self.report.skipped.push(qualname);
            return Ok(());
        }

        reject_opaque(self.arena, def.body, function)?;
        check_blocks(self.arena, def.body, function)?;
        let lazy = contains_yield(self.arena, def.body).then_some(if def.is_async() {
            LazyKind::Async
        } else {
            LazyKind::Sync
        });
        if lazy == Some(LazyKind::Async) && returns_value(self.arena, def.body) {
            return Err(InstrumentationError::UnsupportedConstruct {
                function: function.to_string(),
                construct: "returning a value from an async generator".to_string(),
            });
        }
        let overrides = parse_overrides(self.arena, &self.names, def.decorators, function)?;
        let self_binding = self.self_binding(&def, &params, scope);

        let static_only = &self.static_only;
        let is_static_only = |name: Name| static_only.contains(&name);
        let mut plan_params = Vec::with_capacity(checked.len());
        for (param, annotation) in &checked {
            plan_params.push(PlanParam {
                name: param.name,
                kind: param.kind,
                annotation: self.arena.copy_annotation(*annotation, &is_static_only),
            });
        }
        let plan_returns = returns.map(|annotation| self.arena.copy_annotation(annotation, &is_static_only));
        let plan = self.arena.alloc_plan(CheckPlan {
            qualname,
            params: plan_params,
            returns: plan_returns,
            lazy,
            self_binding,
            overrides,
        });

        if returns.is_some() {
            rewrite_block(self.arena, def.body, lazy);
        }

        let mut stmts = vec![self.arena.alloc_stmt(StmtKind::BindCallMemo(plan))];
        if !checked.is_empty() {
            stmts.push(self.arena.alloc_stmt(StmtKind::CheckArguments));
        }
        let mut original = self.arena.stmt_list(def.body).to_vec();
        if original
            .last()
            .is_some_and(|last| matches!(self.arena.stmt(*last), StmtKind::Pass))
        {
            original.pop();
        }
        let ends_in_return = original
            .last()
            .is_some_and(|last| matches!(self.arena.stmt(*last), StmtKind::Return(_)));
        let returns_none = returns.is_some_and(|r| matches!(self.arena.expr(r), ExprKind::None));
        let fall_through = returns.is_some()
            && !returns_none
            && !ends_in_return
            && lazy != Some(LazyKind::Async);
        stmts.extend(original);
        if fall_through {
            let none = self.arena.alloc_expr(ExprKind::None);
            let checked = self.arena.alloc_expr(ExprKind::CheckReturn(none));
            stmts.push(self.arena.alloc_stmt(StmtKind::Return(Some(checked))));
        }

        let body = self.arena.push_stmt_list(&stmts);
        let target = self.arena.function_mut(id);
        target.body = body;
        target.flags |= FunctionFlags::INSTRUMENTED;

        tracing::trace!(function, ?lazy, "instrumented function");
        self.report.instrumented.push((qualname, id));
        Ok(())
    }

    /// How `Self` is bound for calls of a method.
    fn self_binding(&self, def: &FunctionDef, params: &[Param], scope: Scope) -> SelfBinding {
        if scope != Scope::Class || self.has_decorator(def.decorators, &STATICMETHOD) {
            return SelfBinding::None;
        }
        let Some(first) = params.first().filter(|param| {
            matches!(param.kind, ParamKind::PositionalOnly | ParamKind::PositionalOrKeyword)
        }) else {
            return SelfBinding::None;
        };
        if def.name.as_str() == "__new__" || self.has_decorator(def.decorators, &CLASSMETHOD) {
            SelfBinding::ClassArg(first.name)
        } else {
            SelfBinding::InstanceOf(first.name)
        }
    }

    fn has_decorator(&self, decorators: ExprRange, candidates: &[&str]) -> bool {
        self.arena
            .expr_list(decorators)
            .iter()
            .any(|decorator| self.names.is_decorator(self.arena, *decorator, candidates))
    }

    fn qualname(&self) -> Name {
        let mut qualname = String::new();
        for (i, element) in self.path.iter().enumerate() {
            if i > 0 {
                qualname.push('.');
            }
            qualname.push_str(element.name.as_str());
            if element.is_function && i + 1 < self.path.len() {
                qualname.push_str(".<locals>");
            }
        }
        Name::intern(&qualname)
    }

    fn path_names(&self) -> impl Iterator<Item = Name> + '_ {
        self.path.iter().map(|element| element.name)
    }

    fn on_target(&self) -> bool {
        match &self.options.target_path {
            Some(target) => self.path_names().eq(target.iter().copied()),
            None => true,
        }
    }

    fn may_contain_target(&self) -> bool {
        match &self.options.target_path {
            Some(target) => {
                self.path.len() <= target.len()
                    && self.path_names().zip(target.iter()).all(|(a, b)| a == *b)
            }
            None => true,
        }
    }
}

/// Wrap returns and yields of a block with their checks.
fn rewrite_block(arena: &mut IrArena, block: StmtRange, lazy: Option<LazyKind>) {
    let stmts = arena.stmt_list(block).to_vec();
    for stmt in stmts {
        match arena.stmt(stmt) {
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    rewrite_yields(arena, value);
                }
                // Async generators can only return bare.
                if lazy != Some(LazyKind::Async) {
                    let value = value.unwrap_or_else(|| arena.alloc_expr(ExprKind::None));
                    let checked = arena.alloc_expr(ExprKind::CheckReturn(value));
                    arena.set_stmt(stmt, StmtKind::Return(Some(checked)));
                }
            }
            StmtKind::Expr(value) | StmtKind::Raise(Some(value)) => rewrite_yields(arena, value),
            StmtKind::Assign { target, value } => {
                rewrite_yields(arena, target);
                rewrite_yields(arena, value);
            }
            StmtKind::AnnAssign {
                value: Some(value), ..
            } => rewrite_yields(arena, value),
            StmtKind::If { test, body, orelse } => {
                rewrite_yields(arena, test);
                rewrite_block(arena, body, lazy);
                rewrite_block(arena, orelse, lazy);
            }
            StmtKind::While { test, body } => {
                rewrite_yields(arena, test);
                rewrite_block(arena, body, lazy);
            }
            StmtKind::For { iter, body, .. } => {
                rewrite_yields(arena, iter);
                rewrite_block(arena, body, lazy);
            }
            _ => {}
        }
    }
}

/// Turn every `yield v` in the tree into
/// `check_send(yield check_yield(v))`, in place.
fn rewrite_yields(arena: &mut IrArena, id: ExprId) {
    rtg_ir::ensure_sufficient_stack(|| match arena.expr(id) {
        ExprKind::Yield(value) => {
            if let Some(value) = value {
                rewrite_yields(arena, value);
            }
            let value = value.unwrap_or_else(|| arena.alloc_expr(ExprKind::None));
            let produced = arena.alloc_expr(ExprKind::CheckYield(value));
            let resumed = arena.alloc_expr(ExprKind::Yield(Some(produced)));
            arena.set_expr(id, ExprKind::CheckSend(resumed));
        }
        ExprKind::Attribute { value, .. }
        | ExprKind::Unary { operand: value, .. }
        | ExprKind::CheckReturn(value)
        | ExprKind::CheckYield(value)
        | ExprKind::CheckSend(value) => rewrite_yields(arena, value),
        ExprKind::Subscript {
            value: left,
            index: right,
        }
        | ExprKind::Binary { left, right, .. }
        | ExprKind::Compare { left, right, .. } => {
            rewrite_yields(arena, left);
            rewrite_yields(arena, right);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            rewrite_yields(arena, func);
            for arg in arena.expr_list(args).to_vec() {
                rewrite_yields(arena, arg);
            }
            let values: SmallVec<[ExprId; 4]> =
                arena.keywords(keywords).iter().map(|k| k.value).collect();
            for value in values {
                rewrite_yields(arena, value);
            }
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => {
            for item in arena.expr_list(items).to_vec() {
                rewrite_yields(arena, item);
            }
        }
        ExprKind::Dict(entries) => {
            let entries = arena.dict_entries(entries).to_vec();
            for entry in entries {
                rewrite_yields(arena, entry.key);
                rewrite_yields(arena, entry.value);
            }
        }
        ExprKind::None
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bytes(_)
        | ExprKind::Ellipsis
        | ExprKind::Name(_)
        | ExprKind::AnyType => {}
    });
}

/// Fail on constructs the rewrite cannot see through.
fn reject_opaque(arena: &IrArena, block: StmtRange, function: &str) -> Result<(), InstrumentationError> {
    for stmt in arena.stmt_list(block) {
        match arena.stmt(*stmt) {
            StmtKind::Opaque(description) => {
                return Err(InstrumentationError::UnsupportedConstruct {
                    function: function.to_string(),
                    construct: description.to_string(),
                });
            }
            StmtKind::If { body, orelse, .. } => {
                reject_opaque(arena, body, function)?;
                reject_opaque(arena, orelse, function)?;
            }
            StmtKind::While { body, .. } | StmtKind::For { body, .. } => {
                reject_opaque(arena, body, function)?;
            }
            _ => {}
        }
    }
    Ok(())
}

/// Every compound statement has a non-empty body.
fn check_blocks(arena: &IrArena, block: StmtRange, function: &str) -> Result<(), InstrumentationError> {
    let empty = |block: &'static str| InstrumentationError::EmptyBlock {
        function: function.to_string(),
        block,
    };
    for stmt in arena.stmt_list(block) {
        match arena.stmt(*stmt) {
            StmtKind::If { body, orelse, .. } => {
                if body.is_empty() {
                    return Err(empty("if"));
                }
                check_blocks(arena, body, function)?;
                check_blocks(arena, orelse, function)?;
            }
            StmtKind::While { body, .. } => {
                if body.is_empty() {
                    return Err(empty("while"));
                }
                check_blocks(arena, body, function)?;
            }
            StmtKind::For { body, .. } => {
                if body.is_empty() {
                    return Err(empty("for"));
                }
                check_blocks(arena, body, function)?;
            }
            _ => {}
        }
    }
    Ok(())
}
