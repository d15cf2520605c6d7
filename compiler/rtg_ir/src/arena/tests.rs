use super::*;
use crate::ast::BinaryOp;
use pretty_assertions::assert_eq;

fn name(arena: &mut IrArena, text: &str) -> ExprId {
    arena.alloc_expr(ExprKind::Name(Name::intern(text)))
}

#[test]
fn test_empty_lists_share_the_empty_range() {
    let mut arena = IrArena::new();
    assert_eq!(arena.push_expr_list(&[]), ExprRange::EMPTY);
    assert_eq!(arena.push_stmt_list(&[]), StmtRange::EMPTY);
    assert!(arena.expr_list(ExprRange::EMPTY).is_empty());
}

#[test]
fn test_lists_are_appended_not_overwritten() {
    let mut arena = IrArena::new();
    let a = name(&mut arena, "a");
    let b = name(&mut arena, "b");
    let first = arena.push_expr_list(&[a, b]);
    let second = arena.push_expr_list(&[b]);
    assert_eq!(arena.expr_list(first), &[a, b]);
    assert_eq!(arena.expr_list(second), &[b]);
    assert_eq!(second.start, 2);
}

#[test]
fn test_set_stmt_keeps_id_stable() {
    let mut arena = IrArena::new();
    let pass = arena.alloc_stmt(StmtKind::Pass);
    let x = name(&mut arena, "x");
    arena.set_stmt(pass, StmtKind::Return(Some(x)));
    assert_eq!(arena.stmt(pass), StmtKind::Return(Some(x)));
}

#[test]
fn test_copy_annotation_replaces_static_only_names() {
    let mut arena = IrArena::new();
    let list = name(&mut arena, "List");
    let hidden = name(&mut arena, "Hidden");
    let int = name(&mut arena, "int");
    let union = arena.alloc_expr(ExprKind::Binary {
        op: BinaryOp::BitOr,
        left: hidden,
        right: int,
    });
    let annotation = arena.alloc_expr(ExprKind::Subscript {
        value: list,
        index: union,
    });
    let hidden_name = Name::intern("Hidden");
    let copy = arena.copy_annotation(annotation, &|n| n == hidden_name);

    assert_ne!(copy, annotation);
    let ExprKind::Subscript { index, .. } = arena.expr(copy) else {
        panic!("expected subscript");
    };
    let ExprKind::Binary { left, right, .. } = arena.expr(index) else {
        panic!("expected union");
    };
    assert_eq!(arena.expr(left), ExprKind::AnyType);
    assert_eq!(arena.expr(right), ExprKind::Name(Name::intern("int")));
    // the original is untouched
    assert_eq!(arena.expr(hidden), ExprKind::Name(hidden_name));
}

#[test]
fn test_mentions_name_walks_lists() {
    let mut arena = IrArena::new();
    let a = name(&mut arena, "A");
    let b = name(&mut arena, "B");
    let tuple = arena.push_expr_list(&[a, b]);
    let id = arena.alloc_expr(ExprKind::Tuple(tuple));
    let target = Name::intern("B");
    assert!(arena.mentions_name(id, &|n| n == target));
    let missing = Name::intern("C");
    assert!(!arena.mentions_name(id, &|n| n == missing));
}
