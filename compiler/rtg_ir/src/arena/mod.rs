//! Append-only node arena.
//!
//! Struct-of-vectors storage for every node of one module. Ids are indices;
//! lists are ranges into flattened side vectors. The only in-place mutation is
//! [`IrArena::set_stmt`] / [`IrArena::set_expr`] / [`IrArena::function_mut`],
//! used by the rewriter to re-point an existing node at freshly pushed
//! children, so ids held elsewhere stay valid.

use crate::ast::{
    CheckPlan, ClassDef, DictEntry, ExprKind, FunctionDef, ImportAlias, Keyword, Param, StmtKind,
};
use crate::ids::{
    AliasRange, ClassId, DictEntryRange, ExprId, ExprRange, FuncId, KeywordRange, ParamRange,
    PlanId, StmtId, StmtRange,
};
use crate::Name;

/// Convert an arena length to a u32 index.
///
/// # Panics
/// Panics if an arena grows past `u32::MAX` entries.
#[inline]
pub(crate) fn to_u32(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("too many {what} in one module: {len}"))
}

/// Node storage for one module.
#[derive(Clone, Debug, Default)]
pub struct IrArena {
    exprs: Vec<ExprKind>,
    stmts: Vec<StmtKind>,
    expr_lists: Vec<ExprId>,
    stmt_lists: Vec<StmtId>,
    keywords: Vec<Keyword>,
    dict_entries: Vec<DictEntry>,
    params: Vec<Param>,
    aliases: Vec<ImportAlias>,
    functions: Vec<FunctionDef>,
    classes: Vec<ClassDef>,
    plans: Vec<CheckPlan>,
}

impl IrArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    // Expressions

    pub fn alloc_expr(&mut self, kind: ExprKind) -> ExprId {
        let id = ExprId::new(to_u32(self.exprs.len(), "expressions"));
        self.exprs.push(kind);
        id
    }

    #[inline]
    pub fn expr(&self, id: ExprId) -> ExprKind {
        self.exprs[id.index()]
    }

    pub fn set_expr(&mut self, id: ExprId, kind: ExprKind) {
        self.exprs[id.index()] = kind;
    }

    pub fn expr_count(&self) -> usize {
        self.exprs.len()
    }

    pub fn push_expr_list(&mut self, ids: &[ExprId]) -> ExprRange {
        if ids.is_empty() {
            return ExprRange::EMPTY;
        }
        let start = to_u32(self.expr_lists.len(), "expression lists");
        self.expr_lists.extend_from_slice(ids);
        ExprRange::new(start, to_u32(ids.len(), "expression list entries"))
    }

    #[inline]
    pub fn expr_list(&self, range: ExprRange) -> &[ExprId] {
        &self.expr_lists[range.bounds()]
    }

    // Statements

    pub fn alloc_stmt(&mut self, kind: StmtKind) -> StmtId {
        let id = StmtId::new(to_u32(self.stmts.len(), "statements"));
        self.stmts.push(kind);
        id
    }

    #[inline]
    pub fn stmt(&self, id: StmtId) -> StmtKind {
        self.stmts[id.index()]
    }

    pub fn set_stmt(&mut self, id: StmtId, kind: StmtKind) {
        self.stmts[id.index()] = kind;
    }

    pub fn push_stmt_list(&mut self, ids: &[StmtId]) -> StmtRange {
        if ids.is_empty() {
            return StmtRange::EMPTY;
        }
        let start = to_u32(self.stmt_lists.len(), "statement lists");
        self.stmt_lists.extend_from_slice(ids);
        StmtRange::new(start, to_u32(ids.len(), "block statements"))
    }

    #[inline]
    pub fn stmt_list(&self, range: StmtRange) -> &[StmtId] {
        &self.stmt_lists[range.bounds()]
    }

    // Side tables

    pub fn push_keywords(&mut self, keywords: &[Keyword]) -> KeywordRange {
        if keywords.is_empty() {
            return KeywordRange::EMPTY;
        }
        let start = to_u32(self.keywords.len(), "keywords");
        self.keywords.extend_from_slice(keywords);
        KeywordRange::new(start, to_u32(keywords.len(), "keywords"))
    }

    #[inline]
    pub fn keywords(&self, range: KeywordRange) -> &[Keyword] {
        &self.keywords[range.bounds()]
    }

    pub fn push_dict_entries(&mut self, entries: &[DictEntry]) -> DictEntryRange {
        if entries.is_empty() {
            return DictEntryRange::EMPTY;
        }
        let start = to_u32(self.dict_entries.len(), "dict entries");
        self.dict_entries.extend_from_slice(entries);
        DictEntryRange::new(start, to_u32(entries.len(), "dict entries"))
    }

    #[inline]
    pub fn dict_entries(&self, range: DictEntryRange) -> &[DictEntry] {
        &self.dict_entries[range.bounds()]
    }

    pub fn push_params(&mut self, params: &[Param]) -> ParamRange {
        if params.is_empty() {
            return ParamRange::EMPTY;
        }
        let start = to_u32(self.params.len(), "parameters");
        self.params.extend_from_slice(params);
        ParamRange::new(start, to_u32(params.len(), "parameters"))
    }

    #[inline]
    pub fn params(&self, range: ParamRange) -> &[Param] {
        &self.params[range.bounds()]
    }

    pub fn push_aliases(&mut self, aliases: &[ImportAlias]) -> AliasRange {
        if aliases.is_empty() {
            return AliasRange::EMPTY;
        }
        let start = to_u32(self.aliases.len(), "import aliases");
        self.aliases.extend_from_slice(aliases);
        AliasRange::new(start, to_u32(aliases.len(), "import aliases"))
    }

    #[inline]
    pub fn aliases(&self, range: AliasRange) -> &[ImportAlias] {
        &self.aliases[range.bounds()]
    }

    // Definitions

    pub fn alloc_function(&mut self, def: FunctionDef) -> FuncId {
        let id = FuncId::new(to_u32(self.functions.len(), "functions"));
        self.functions.push(def);
        id
    }

    #[inline]
    pub fn function(&self, id: FuncId) -> &FunctionDef {
        &self.functions[id.index()]
    }

    pub fn function_mut(&mut self, id: FuncId) -> &mut FunctionDef {
        &mut self.functions[id.index()]
    }

    pub fn alloc_class(&mut self, def: ClassDef) -> ClassId {
        let id = ClassId::new(to_u32(self.classes.len(), "classes"));
        self.classes.push(def);
        id
    }

    #[inline]
    pub fn class(&self, id: ClassId) -> &ClassDef {
        &self.classes[id.index()]
    }

    pub fn alloc_plan(&mut self, plan: CheckPlan) -> PlanId {
        let id = PlanId::new(to_u32(self.plans.len(), "check plans"));
        self.plans.push(plan);
        id
    }

    #[inline]
    pub fn plan(&self, id: PlanId) -> &CheckPlan {
        &self.plans[id.index()]
    }

    pub fn plan_count(&self) -> usize {
        self.plans.len()
    }

    /// Deep-copy an expression tree, replacing every `Name` for which
    /// `is_static_only` returns true with [`ExprKind::AnyType`].
    ///
    /// Only the node kinds that can appear in an annotation are descended
    /// into; anything else is shared with the original.
    pub fn copy_annotation(
        &mut self,
        id: ExprId,
        is_static_only: &dyn Fn(Name) -> bool,
    ) -> ExprId {
        crate::stack::ensure_sufficient_stack(|| match self.expr(id) {
            ExprKind::Name(name) if is_static_only(name) => self.alloc_expr(ExprKind::AnyType),
            ExprKind::Attribute { value, attr } => {
                let value = self.copy_annotation(value, is_static_only);
                self.alloc_expr(ExprKind::Attribute { value, attr })
            }
            ExprKind::Subscript { value, index } => {
                let value = self.copy_annotation(value, is_static_only);
                let index = self.copy_annotation(index, is_static_only);
                self.alloc_expr(ExprKind::Subscript { value, index })
            }
            ExprKind::Binary { op, left, right } => {
                let left = self.copy_annotation(left, is_static_only);
                let right = self.copy_annotation(right, is_static_only);
                self.alloc_expr(ExprKind::Binary { op, left, right })
            }
            ExprKind::Tuple(items) => {
                let items = self.copy_annotation_list(items, is_static_only);
                self.alloc_expr(ExprKind::Tuple(items))
            }
            ExprKind::List(items) => {
                let items = self.copy_annotation_list(items, is_static_only);
                self.alloc_expr(ExprKind::List(items))
            }
            kind => self.alloc_expr(kind),
        })
    }

    fn copy_annotation_list(
        &mut self,
        items: ExprRange,
        is_static_only: &dyn Fn(Name) -> bool,
    ) -> ExprRange {
        let originals = self.expr_list(items).to_vec();
        let copies: Vec<ExprId> = originals
            .into_iter()
            .map(|item| self.copy_annotation(item, is_static_only))
            .collect();
        self.push_expr_list(&copies)
    }

    /// Whether the expression tree mentions any name selected by `pred`.
    pub fn mentions_name(&self, id: ExprId, pred: &dyn Fn(Name) -> bool) -> bool {
        match self.expr(id) {
            ExprKind::Name(name) => pred(name),
            ExprKind::Attribute { value, .. } => self.mentions_name(value, pred),
            ExprKind::Subscript { value, index } => {
                self.mentions_name(value, pred) || self.mentions_name(index, pred)
            }
            ExprKind::Binary { left, right, .. } => {
                self.mentions_name(left, pred) || self.mentions_name(right, pred)
            }
            ExprKind::Tuple(items) | ExprKind::List(items) => self
                .expr_list(items)
                .iter()
                .any(|item| self.mentions_name(*item, pred)),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests;
