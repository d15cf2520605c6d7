use super::*;
use crate::ast::{CheckPlan, CompareOp, SelfBinding};
use crate::builder::{ClassSpec, FunctionSpec, IrBuilder};
use crate::policy::PlanOverrides;
use crate::Name;
use pretty_assertions::assert_eq;

#[test]
fn test_print_generic_annotation() {
    let mut b = IrBuilder::new();
    let dict = b.name("Dict");
    let str_ = b.name("str");
    let list = b.path("typing.List");
    let int = b.name("int");
    let inner = b.generic(list, &[int]);
    let id = b.generic(dict, &[str_, inner]);
    let module = b.finish("m", &[]);
    assert_eq!(print_expr(&module.arena, id), "Dict[str, typing.List[int]]");
}

#[test]
fn test_print_union_and_literals() {
    let mut b = IrBuilder::new();
    let int = b.name("int");
    let none = b.none();
    let union = b.binary(BinaryOp::BitOr, int, none);
    let quoted = b.str("Foo's");
    let bytes = b.bytes("ab");
    let tuple = b.tuple(&[union, quoted, bytes]);
    let module = b.finish("m", &[]);
    assert_eq!(
        print_expr(&module.arena, tuple),
        "(int | None, 'Foo\\'s', b'ab')"
    );
}

#[test]
fn test_print_parenthesizes_weaker_operands() {
    let mut b = IrBuilder::new();
    let one = b.int(1);
    let two = b.int(2);
    let three = b.int(3);
    let sum = b.binary(BinaryOp::Add, one, two);
    let product = b.binary(BinaryOp::Mul, sum, three);
    let negated = b.unary(UnaryOp::Neg, product);
    let module = b.finish("m", &[]);
    assert_eq!(print_expr(&module.arena, negated), "-((1 + 2) * 3)");
}

#[test]
fn test_print_empty_and_single_tuples() {
    let mut b = IrBuilder::new();
    let empty = b.tuple(&[]);
    let one = b.int(1);
    let single = b.tuple(&[one]);
    let tuple_name = b.name("Tuple");
    let subscript = b.subscript(tuple_name, empty);
    let module = b.finish("m", &[]);
    assert_eq!(print_expr(&module.arena, empty), "()");
    assert_eq!(print_expr(&module.arena, single), "(1,)");
    assert_eq!(print_expr(&module.arena, subscript), "Tuple[()]");
}

#[test]
fn test_print_function_with_injected_checks() {
    let mut b = IrBuilder::new();
    let int = b.name("int");
    let x = b.name("x");
    let checked = b.arena_mut().alloc_expr(ExprKind::CheckReturn(x));
    let ret = b.ret(Some(checked));
    let plan = b.arena_mut().alloc_plan(CheckPlan {
        qualname: Name::intern("f"),
        params: Vec::new(),
        returns: Some(int),
        lazy: None,
        self_binding: SelfBinding::None,
        overrides: PlanOverrides::default(),
    });
    let bind = b.arena_mut().alloc_stmt(StmtKind::BindCallMemo(plan));
    let check = b.arena_mut().alloc_stmt(StmtKind::CheckArguments);
    let func = b.function(
        FunctionSpec::new("f")
            .param("x", Some(int))
            .returns(int)
            .body(vec![bind, check, ret]),
    );
    let module = b.finish("m", &[func]);
    assert_eq!(
        print_module(&module),
        "def f(x: int) -> int:\n    \
         memo = TypeCheckMemo('f')\n    \
         check_argument_types(memo)\n    \
         return check_return_type(x)\n"
    );
}

#[test]
fn test_print_params_of_every_kind() {
    let mut b = IrBuilder::new();
    let zero = b.int(0);
    let func = b.function(
        FunctionSpec::new("g")
            .param_full("a", ParamKind::PositionalOnly, None, None)
            .param_default("b", None, zero)
            .param_full("c", ParamKind::KeywordOnly, None, None)
            .param_full("kw", ParamKind::VarKeyword, None, None),
    );
    let module = b.finish("m", &[func]);
    assert_eq!(
        print_module(&module),
        "def g(a, /, b=0, *, c, **kw):\n    pass\n"
    );
}

#[test]
fn test_print_class_and_control_flow() {
    let mut b = IrBuilder::new();
    let base = b.name("Base");
    let x = b.name("x");
    let none = b.none();
    let test = b.compare(CompareOp::IsNot, x, none);
    let one = b.int(1);
    let ret = b.ret(Some(one));
    let raise_value = b.name("ValueError");
    let raise = b.raise(Some(raise_value));
    let cond = b.if_(test, &[ret], &[raise]);
    let method = b.function(FunctionSpec::new("m").param("self", None).body(vec![cond]));
    let class = b.class(ClassSpec::new("C").base(base).doc("Doc.").body(vec![method]));
    let module = b.finish("m", &[class]);
    assert_eq!(
        print_module(&module),
        "class C(Base):\n    'Doc.'\n    def m(self):\n        if x is not None:\n            return 1\n        else:\n            raise ValueError\n"
    );
}

#[test]
fn test_quote_escapes() {
    assert_eq!(quote("a\\b'c\n"), "'a\\\\b\\'c\\n'");
}
