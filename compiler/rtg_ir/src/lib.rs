//! rtguard IR - Intermediate Representation
//!
//! The structural form of modules that the instrumentation pipeline rewrites
//! and the reference evaluator executes:
//! - Names for interned identifiers
//! - Ids and ranges into the node arena
//! - Statement and expression kinds, including the injected check nodes
//! - Check plans and the policies they bake in
//! - A builder and a printer
//!
//! # Design Philosophy
//!
//! - **Intern Everything**: Strings → Name(u32)
//! - **Flatten Everything**: No Box<Expr>, use ExprId(u32) indices
//! - **Versioned**: every [`Module`] records the [`IR_VERSION`] it was built with
//!
//! Floats are stored as u64 bits so expression kinds stay `Copy`.

mod arena;
pub mod ast;
pub mod builder;
mod ids;
mod interner;
mod module;
mod name;
pub mod policy;
pub mod printer;
mod stack;
pub mod visit;

pub use arena::IrArena;
pub use ast::{
    BinaryOp, CheckPlan, ClassDef, CompareOp, DictEntry, ExprKind, FunctionDef, FunctionFlags,
    ImportAlias, Keyword, LazyKind, Param, ParamKind, PlanParam, SelfBinding, StmtKind, UnaryOp,
};
pub use builder::{ClassSpec, FunctionSpec, IrBuilder};
pub use ids::{
    AliasRange, ClassId, DictEntryRange, ExprId, ExprRange, FuncId, KeywordRange, ParamRange,
    PlanId, StmtId, StmtRange,
};
pub use interner::{global_interner, InternError, StringInterner};
pub use module::{Module, IR_VERSION};
pub use name::Name;
pub use policy::{CollectionCheckStrategy, ForwardRefPolicy, PlanOverrides};
pub use printer::{print_expr, print_module, print_stmt};
pub use stack::ensure_sufficient_stack;
