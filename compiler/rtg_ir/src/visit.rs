//! Read-only queries over IR blocks.
//!
//! Queries stop at nested function and class definitions: a yield inside a
//! nested function does not make the enclosing function a generator.

use crate::arena::IrArena;
use crate::ast::{ExprKind, StmtKind};
use crate::ids::{ExprId, StmtRange};
use crate::stack::ensure_sufficient_stack;

/// Whether the block (excluding nested definitions) contains a yield.
pub fn contains_yield(arena: &IrArena, body: StmtRange) -> bool {
    arena.stmt_list(body).iter().any(|stmt| {
        ensure_sufficient_stack(|| match arena.stmt(*stmt) {
            StmtKind::Expr(e) | StmtKind::Raise(Some(e)) | StmtKind::Return(Some(e)) => {
                expr_contains_yield(arena, e)
            }
            StmtKind::Assign { target, value } => {
                expr_contains_yield(arena, target) || expr_contains_yield(arena, value)
            }
            StmtKind::AnnAssign { value, .. } => {
                value.is_some_and(|v| expr_contains_yield(arena, v))
            }
            StmtKind::If { test, body, orelse } => {
                expr_contains_yield(arena, test)
                    || contains_yield(arena, body)
                    || contains_yield(arena, orelse)
            }
            StmtKind::While { test, body } => {
                expr_contains_yield(arena, test) || contains_yield(arena, body)
            }
            StmtKind::For { iter, body, .. } => {
                expr_contains_yield(arena, iter) || contains_yield(arena, body)
            }
            StmtKind::Return(None)
            | StmtKind::Raise(None)
            | StmtKind::Pass
            | StmtKind::FunctionDef(_)
            | StmtKind::ClassDef(_)
            | StmtKind::Import { .. }
            | StmtKind::ImportFrom { .. }
            | StmtKind::Opaque(_)
            | StmtKind::BindCallMemo(_)
            | StmtKind::CheckArguments => false,
        })
    })
}

/// Whether the expression tree contains a yield.
pub fn expr_contains_yield(arena: &IrArena, id: ExprId) -> bool {
    ensure_sufficient_stack(|| match arena.expr(id) {
        ExprKind::Yield(_) => true,
        ExprKind::Attribute { value, .. }
        | ExprKind::Unary { operand: value, .. }
        | ExprKind::CheckReturn(value)
        | ExprKind::CheckYield(value)
        | ExprKind::CheckSend(value) => expr_contains_yield(arena, value),
        ExprKind::Subscript { value, index } => {
            expr_contains_yield(arena, value) || expr_contains_yield(arena, index)
        }
        ExprKind::Binary { left, right, .. } | ExprKind::Compare { left, right, .. } => {
            expr_contains_yield(arena, left) || expr_contains_yield(arena, right)
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            expr_contains_yield(arena, func)
                || arena
                    .expr_list(args)
                    .iter()
                    .any(|a| expr_contains_yield(arena, *a))
                || arena
                    .keywords(keywords)
                    .iter()
                    .any(|k| expr_contains_yield(arena, k.value))
        }
        ExprKind::List(items) | ExprKind::Tuple(items) | ExprKind::Set(items) => arena
            .expr_list(items)
            .iter()
            .any(|item| expr_contains_yield(arena, *item)),
        ExprKind::Dict(entries) => arena.dict_entries(entries).iter().any(|entry| {
            expr_contains_yield(arena, entry.key) || expr_contains_yield(arena, entry.value)
        }),
        ExprKind::None
        | ExprKind::Bool(_)
        | ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Bytes(_)
        | ExprKind::Ellipsis
        | ExprKind::Name(_)
        | ExprKind::AnyType => false,
    })
}

/// Whether the block (excluding nested definitions) returns a value
/// explicitly.
pub fn returns_value(arena: &IrArena, body: StmtRange) -> bool {
    arena.stmt_list(body).iter().any(|stmt| match arena.stmt(*stmt) {
        StmtKind::Return(Some(_)) => true,
        StmtKind::If { body, orelse, .. } => {
            returns_value(arena, body) || returns_value(arena, orelse)
        }
        StmtKind::While { body, .. } | StmtKind::For { body, .. } => returns_value(arena, body),
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{FunctionSpec, IrBuilder};

    #[test]
    fn test_yield_in_nested_block_is_found() {
        let mut b = IrBuilder::new();
        let one = b.int(1);
        let y = b.yield_(Some(one));
        let stmt = b.expr_stmt(y);
        let t = b.bool(true);
        let cond = b.if_(t, &[stmt], &[]);
        let module = b.finish("m", &[cond]);
        assert!(contains_yield(&module.arena, module.body));
    }

    #[test]
    fn test_yield_in_nested_function_is_ignored() {
        let mut b = IrBuilder::new();
        let y = b.yield_(None);
        let stmt = b.expr_stmt(y);
        let inner = b.function(FunctionSpec::new("inner").body(vec![stmt]));
        let module = b.finish("m", &[inner]);
        assert!(!contains_yield(&module.arena, module.body));
    }

    #[test]
    fn test_returns_value_sees_branches() {
        let mut b = IrBuilder::new();
        let bare = b.ret(None);
        let one = b.int(1);
        let valued = b.ret(Some(one));
        let t = b.bool(true);
        let cond = b.if_(t, &[bare], &[valued]);
        let module = b.finish("m", &[cond]);
        assert!(returns_value(&module.arena, module.body));
    }
}
