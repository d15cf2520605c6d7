//! Convenience constructors for IR modules.
//!
//! Host front-ends and tests build modules through [`IrBuilder`] instead of
//! poking at arena tables directly.

use crate::arena::IrArena;
use crate::ast::{
    BinaryOp, ClassDef, CompareOp, DictEntry, ExprKind, FunctionDef, FunctionFlags, ImportAlias,
    Keyword, Param, ParamKind, StmtKind, UnaryOp,
};
use crate::ids::{ExprId, StmtId};
use crate::module::Module;
use crate::Name;

/// Declarative description of a function definition.
#[derive(Clone, Debug)]
pub struct FunctionSpec {
    name: Name,
    params: Vec<Param>,
    returns: Option<ExprId>,
    body: Vec<StmtId>,
    decorators: Vec<ExprId>,
    is_async: bool,
    doc: Option<Name>,
}

impl FunctionSpec {
    pub fn new(name: &str) -> Self {
        FunctionSpec {
            name: Name::intern(name),
            params: Vec::new(),
            returns: None,
            body: Vec::new(),
            decorators: Vec::new(),
            is_async: false,
            doc: None,
        }
    }

    /// Add a positional-or-keyword parameter.
    #[must_use]
    pub fn param(self, name: &str, annotation: Option<ExprId>) -> Self {
        self.param_full(name, ParamKind::PositionalOrKeyword, annotation, None)
    }

    /// Add a positional-or-keyword parameter with a default value.
    #[must_use]
    pub fn param_default(self, name: &str, annotation: Option<ExprId>, default: ExprId) -> Self {
        self.param_full(name, ParamKind::PositionalOrKeyword, annotation, Some(default))
    }

    /// Add a parameter of any kind.
    #[must_use]
    pub fn param_full(
        mut self,
        name: &str,
        kind: ParamKind,
        annotation: Option<ExprId>,
        default: Option<ExprId>,
    ) -> Self {
        self.params.push(Param {
            name: Name::intern(name),
            kind,
            annotation,
            default,
        });
        self
    }

    #[must_use]
    pub fn returns(mut self, annotation: ExprId) -> Self {
        self.returns = Some(annotation);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<StmtId>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn decorator(mut self, decorator: ExprId) -> Self {
        self.decorators.push(decorator);
        self
    }

    #[must_use]
    pub fn is_async(mut self) -> Self {
        self.is_async = true;
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(Name::intern(doc));
        self
    }
}

/// Declarative description of a class definition.
#[derive(Clone, Debug)]
pub struct ClassSpec {
    name: Name,
    bases: Vec<ExprId>,
    keywords: Vec<Keyword>,
    body: Vec<StmtId>,
    decorators: Vec<ExprId>,
    doc: Option<Name>,
}

impl ClassSpec {
    pub fn new(name: &str) -> Self {
        ClassSpec {
            name: Name::intern(name),
            bases: Vec::new(),
            keywords: Vec::new(),
            body: Vec::new(),
            decorators: Vec::new(),
            doc: None,
        }
    }

    #[must_use]
    pub fn base(mut self, base: ExprId) -> Self {
        self.bases.push(base);
        self
    }

    #[must_use]
    pub fn keyword(mut self, name: &str, value: ExprId) -> Self {
        self.keywords.push(Keyword {
            name: Name::intern(name),
            value,
        });
        self
    }

    #[must_use]
    pub fn body(mut self, body: Vec<StmtId>) -> Self {
        self.body = body;
        self
    }

    #[must_use]
    pub fn decorator(mut self, decorator: ExprId) -> Self {
        self.decorators.push(decorator);
        self
    }

    #[must_use]
    pub fn doc(mut self, doc: &str) -> Self {
        self.doc = Some(Name::intern(doc));
        self
    }
}

/// Builds one module's arena.
#[derive(Default)]
pub struct IrBuilder {
    arena: IrArena,
    postponed_annotations: bool,
}

impl IrBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep every annotation of the module unevaluated.
    pub fn postpone_annotations(&mut self) {
        self.postponed_annotations = true;
    }

    /// Direct access for callers that need nodes the builder does not cover.
    pub fn arena_mut(&mut self) -> &mut IrArena {
        &mut self.arena
    }

    // Expressions

    pub fn none(&mut self) -> ExprId {
        self.arena.alloc_expr(ExprKind::None)
    }

    pub fn bool(&mut self, value: bool) -> ExprId {
        self.arena.alloc_expr(ExprKind::Bool(value))
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.arena.alloc_expr(ExprKind::Int(value))
    }

    pub fn float(&mut self, value: f64) -> ExprId {
        self.arena.alloc_expr(ExprKind::float(value))
    }

    pub fn str(&mut self, value: &str) -> ExprId {
        self.arena.alloc_expr(ExprKind::Str(Name::intern(value)))
    }

    pub fn bytes(&mut self, value: &str) -> ExprId {
        self.arena.alloc_expr(ExprKind::Bytes(Name::intern(value)))
    }

    pub fn ellipsis(&mut self) -> ExprId {
        self.arena.alloc_expr(ExprKind::Ellipsis)
    }

    pub fn name(&mut self, name: &str) -> ExprId {
        self.arena.alloc_expr(ExprKind::Name(Name::intern(name)))
    }

    /// A dotted name such as `typing.Any`.
    pub fn path(&mut self, dotted: &str) -> ExprId {
        let mut parts = dotted.split('.');
        let first = parts.next().unwrap_or_default();
        let mut expr = self.name(first);
        for part in parts {
            expr = self.attr(expr, part);
        }
        expr
    }

    pub fn attr(&mut self, value: ExprId, attr: &str) -> ExprId {
        self.arena.alloc_expr(ExprKind::Attribute {
            value,
            attr: Name::intern(attr),
        })
    }

    /// `value[index]`.
    pub fn subscript(&mut self, value: ExprId, index: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Subscript { value, index })
    }

    /// `value[a, b, ...]`; a single index is not wrapped in a tuple.
    pub fn generic(&mut self, value: ExprId, args: &[ExprId]) -> ExprId {
        let index = if let [single] = args {
            *single
        } else {
            self.tuple(args)
        };
        self.subscript(value, index)
    }

    pub fn call(&mut self, func: ExprId, args: &[ExprId], keywords: &[(&str, ExprId)]) -> ExprId {
        let args = self.arena.push_expr_list(args);
        let keywords: Vec<Keyword> = keywords
            .iter()
            .map(|(name, value)| Keyword {
                name: Name::intern(name),
                value: *value,
            })
            .collect();
        let keywords = self.arena.push_keywords(&keywords);
        self.arena.alloc_expr(ExprKind::Call {
            func,
            args,
            keywords,
        })
    }

    pub fn binary(&mut self, op: BinaryOp, left: ExprId, right: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Binary { op, left, right })
    }

    pub fn compare(&mut self, op: CompareOp, left: ExprId, right: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Compare { op, left, right })
    }

    pub fn unary(&mut self, op: UnaryOp, operand: ExprId) -> ExprId {
        self.arena.alloc_expr(ExprKind::Unary { op, operand })
    }

    pub fn list(&mut self, items: &[ExprId]) -> ExprId {
        let items = self.arena.push_expr_list(items);
        self.arena.alloc_expr(ExprKind::List(items))
    }

    pub fn tuple(&mut self, items: &[ExprId]) -> ExprId {
        let items = self.arena.push_expr_list(items);
        self.arena.alloc_expr(ExprKind::Tuple(items))
    }

    pub fn set(&mut self, items: &[ExprId]) -> ExprId {
        let items = self.arena.push_expr_list(items);
        self.arena.alloc_expr(ExprKind::Set(items))
    }

    pub fn dict(&mut self, entries: &[(ExprId, ExprId)]) -> ExprId {
        let entries: Vec<DictEntry> = entries
            .iter()
            .map(|(key, value)| DictEntry {
                key: *key,
                value: *value,
            })
            .collect();
        let entries = self.arena.push_dict_entries(&entries);
        self.arena.alloc_expr(ExprKind::Dict(entries))
    }

    pub fn yield_(&mut self, value: Option<ExprId>) -> ExprId {
        self.arena.alloc_expr(ExprKind::Yield(value))
    }

    // Statements

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Expr(expr))
    }

    pub fn assign(&mut self, target: ExprId, value: ExprId) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Assign { target, value })
    }

    pub fn assign_name(&mut self, target: &str, value: ExprId) -> StmtId {
        let target = self.name(target);
        self.assign(target, value)
    }

    pub fn ann_assign(&mut self, target: &str, annotation: ExprId, value: Option<ExprId>) -> StmtId {
        self.arena.alloc_stmt(StmtKind::AnnAssign {
            target: Name::intern(target),
            annotation,
            value,
        })
    }

    pub fn ret(&mut self, value: Option<ExprId>) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Return(value))
    }

    pub fn if_(&mut self, test: ExprId, body: &[StmtId], orelse: &[StmtId]) -> StmtId {
        let body = self.arena.push_stmt_list(body);
        let orelse = self.arena.push_stmt_list(orelse);
        self.arena.alloc_stmt(StmtKind::If { test, body, orelse })
    }

    pub fn while_(&mut self, test: ExprId, body: &[StmtId]) -> StmtId {
        let body = self.arena.push_stmt_list(body);
        self.arena.alloc_stmt(StmtKind::While { test, body })
    }

    pub fn for_(&mut self, target: &str, iter: ExprId, body: &[StmtId]) -> StmtId {
        let body = self.arena.push_stmt_list(body);
        self.arena.alloc_stmt(StmtKind::For {
            target: Name::intern(target),
            iter,
            body,
        })
    }

    pub fn pass(&mut self) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Pass)
    }

    pub fn raise(&mut self, value: Option<ExprId>) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Raise(value))
    }

    pub fn import(&mut self, module: &str, alias: Option<&str>) -> StmtId {
        self.arena.alloc_stmt(StmtKind::Import {
            module: Name::intern(module),
            alias: alias.map(Name::intern),
        })
    }

    pub fn import_from(&mut self, module: &str, names: &[(&str, Option<&str>)]) -> StmtId {
        let aliases: Vec<ImportAlias> = names
            .iter()
            .map(|(name, alias)| ImportAlias {
                name: Name::intern(name),
                alias: alias.map(Name::intern),
            })
            .collect();
        let names = self.arena.push_aliases(&aliases);
        self.arena.alloc_stmt(StmtKind::ImportFrom {
            module: Name::intern(module),
            names,
        })
    }

    pub fn opaque(&mut self, description: &str) -> StmtId {
        self.arena
            .alloc_stmt(StmtKind::Opaque(Name::intern(description)))
    }

    pub fn function(&mut self, spec: FunctionSpec) -> StmtId {
        let params = self.arena.push_params(&spec.params);
        let body = self.arena.push_stmt_list(&spec.body);
        let decorators = self.arena.push_expr_list(&spec.decorators);
        let mut flags = FunctionFlags::empty();
        if spec.is_async {
            flags |= FunctionFlags::ASYNC;
        }
        let func = self.arena.alloc_function(FunctionDef {
            name: spec.name,
            params,
            returns: spec.returns,
            body,
            decorators,
            flags,
            doc: spec.doc,
        });
        self.arena.alloc_stmt(StmtKind::FunctionDef(func))
    }

    pub fn class(&mut self, spec: ClassSpec) -> StmtId {
        let bases = self.arena.push_expr_list(&spec.bases);
        let keywords = self.arena.push_keywords(&spec.keywords);
        let body = self.arena.push_stmt_list(&spec.body);
        let decorators = self.arena.push_expr_list(&spec.decorators);
        let class = self.arena.alloc_class(ClassDef {
            name: spec.name,
            bases,
            keywords,
            body,
            decorators,
            doc: spec.doc,
        });
        self.arena.alloc_stmt(StmtKind::ClassDef(class))
    }

    /// Close the module with its top-level block.
    pub fn finish(mut self, name: &str, body: &[StmtId]) -> Module {
        let body = self.arena.push_stmt_list(body);
        let mut module = Module::new(Name::intern(name), self.arena, body);
        module.postponed_annotations = self.postponed_annotations;
        module
    }
}
