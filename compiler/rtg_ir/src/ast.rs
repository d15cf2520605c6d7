//! IR node definitions.
//!
//! Expression and statement kinds are `Copy`: operands are ids, lists are
//! ranges. Function and class definitions, parameters and check plans are
//! stored in side tables on the arena.
//!
//! The four `Check*` expressions plus [`StmtKind::BindCallMemo`] and
//! [`StmtKind::CheckArguments`] are never produced by a front-end; only the
//! instrumentation pipeline inserts them.

use bitflags::bitflags;

use crate::ids::{
    AliasRange, ClassId, DictEntryRange, ExprId, ExprRange, FuncId, KeywordRange, ParamRange,
    PlanId, StmtRange,
};
use crate::policy::PlanOverrides;
use crate::Name;

/// Binary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    /// `|`, also used to build union annotations.
    BitOr,
}

impl BinaryOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::BitOr => "|",
        }
    }
}

/// Comparison operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Is,
    IsNot,
}

impl CompareOp {
    pub fn as_symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::LtE => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtE => ">=",
            CompareOp::Is => "is",
            CompareOp::IsNot => "is not",
        }
    }
}

/// Unary operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Not,
    Neg,
}

/// Expression kinds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ExprKind {
    None,
    Bool(bool),
    Int(i64),
    /// Float stored as bits so the node stays `Eq`-friendly.
    Float(u64),
    Str(Name),
    Bytes(Name),
    Ellipsis,
    Name(Name),
    Attribute {
        value: ExprId,
        attr: Name,
    },
    Subscript {
        value: ExprId,
        index: ExprId,
    },
    Call {
        func: ExprId,
        args: ExprRange,
        keywords: KeywordRange,
    },
    Binary {
        op: BinaryOp,
        left: ExprId,
        right: ExprId,
    },
    Compare {
        op: CompareOp,
        left: ExprId,
        right: ExprId,
    },
    Unary {
        op: UnaryOp,
        operand: ExprId,
    },
    List(ExprRange),
    Tuple(ExprRange),
    Set(ExprRange),
    Dict(DictEntryRange),
    Yield(Option<ExprId>),

    /// The universal annotation, substituted for names that only exist for
    /// static analysis.
    AnyType,
    /// Check the operand against the plan's return (or final-result) descriptor.
    CheckReturn(ExprId),
    /// Check the operand against the plan's produced-value descriptor.
    CheckYield(ExprId),
    /// Check the resumption input (the operand, a yield) against the plan's
    /// accepted-input descriptor.
    CheckSend(ExprId),
}

impl ExprKind {
    /// Float literal value.
    pub fn float(value: f64) -> Self {
        ExprKind::Float(value.to_bits())
    }
}

/// A keyword argument in a call or class header.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Keyword {
    pub name: Name,
    pub value: ExprId,
}

/// One `key: value` entry of a dict display.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DictEntry {
    pub key: ExprId,
    pub value: ExprId,
}

/// One `name as alias` entry of a from-import.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ImportAlias {
    pub name: Name,
    pub alias: Option<Name>,
}

impl ImportAlias {
    /// The name bound in the importing scope.
    pub fn bound_name(&self) -> Name {
        self.alias.unwrap_or(self.name)
    }
}

/// Statement kinds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StmtKind {
    Expr(ExprId),
    /// `target = value`; the target is a name, attribute or subscript expression.
    Assign {
        target: ExprId,
        value: ExprId,
    },
    /// `target: annotation [= value]`.
    AnnAssign {
        target: Name,
        annotation: ExprId,
        value: Option<ExprId>,
    },
    Return(Option<ExprId>),
    If {
        test: ExprId,
        body: StmtRange,
        orelse: StmtRange,
    },
    While {
        test: ExprId,
        body: StmtRange,
    },
    For {
        target: Name,
        iter: ExprId,
        body: StmtRange,
    },
    Pass,
    Raise(Option<ExprId>),
    FunctionDef(FuncId),
    ClassDef(ClassId),
    /// `import a.b [as c]`.
    Import {
        module: Name,
        alias: Option<Name>,
    },
    /// `from a.b import x [as y], ...`.
    ImportFrom {
        module: Name,
        names: AliasRange,
    },
    /// A host construct the IR does not model. Carries a short description.
    Opaque(Name),

    /// Build the call's resolution context from the plan.
    BindCallMemo(PlanId),
    /// Check every annotated argument against the current call's plan.
    CheckArguments,
}

/// Parameter kinds, in declaration order constraints.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    /// `*args`
    VarPositional,
    KeywordOnly,
    /// `**kwargs`
    VarKeyword,
}

/// A function parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Param {
    pub name: Name,
    pub kind: ParamKind,
    pub annotation: Option<ExprId>,
    pub default: Option<ExprId>,
}

bitflags! {
    /// Function definition flags.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FunctionFlags: u8 {
        /// `async def`.
        const ASYNC = 1;
        /// Body already carries injected checks.
        const INSTRUMENTED = 1 << 1;
    }
}

/// A function definition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct FunctionDef {
    pub name: Name,
    pub params: ParamRange,
    pub returns: Option<ExprId>,
    pub body: StmtRange,
    pub decorators: ExprRange,
    pub flags: FunctionFlags,
    pub doc: Option<Name>,
}

impl FunctionDef {
    #[inline]
    pub fn is_async(&self) -> bool {
        self.flags.contains(FunctionFlags::ASYNC)
    }

    #[inline]
    pub fn is_instrumented(&self) -> bool {
        self.flags.contains(FunctionFlags::INSTRUMENTED)
    }
}

/// A class definition.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClassDef {
    pub name: Name,
    pub bases: ExprRange,
    pub keywords: KeywordRange,
    pub body: StmtRange,
    pub decorators: ExprRange,
    pub doc: Option<Name>,
}

/// Which lazily-produced sequence protocol a function implements.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum LazyKind {
    Sync,
    Async,
}

/// How the enclosing class is found for `Self` checks.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum SelfBinding {
    /// Not a method, or a static method.
    None,
    /// Instance method: the class of the named first argument.
    InstanceOf(Name),
    /// Class method: the named first argument is the class.
    ClassArg(Name),
}

/// One checked parameter.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlanParam {
    pub name: Name,
    pub kind: ParamKind,
    /// Annotation as seen by the injected check (static-only names replaced).
    pub annotation: ExprId,
}

/// Everything the injected calls of one function need at run time.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckPlan {
    /// Dotted path of the function inside its module.
    pub qualname: Name,
    pub params: Vec<PlanParam>,
    /// Return annotation as seen by the injected checks.
    pub returns: Option<ExprId>,
    pub lazy: Option<LazyKind>,
    pub self_binding: SelfBinding,
    pub overrides: PlanOverrides,
}
