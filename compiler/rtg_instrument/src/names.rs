//! Import tracking and well-known names.
//!
//! The rewriter recognizes a handful of names by their dotted path after
//! import aliases are expanded, so `from typing import Any as A` still
//! makes `A` the universal annotation.

use rustc_hash::{FxHashMap, FxHashSet};
use rtg_ir::{ExprId, ExprKind, IrArena, Name, StmtKind, StmtRange};

/// Annotations that accept anything.
pub const ANY_NAMES: [&str; 2] = ["typing.Any", "typing_extensions.Any"];
/// Decorators that exclude a function from instrumentation.
pub const IGNORE_DECORATORS: [&str; 2] = ["typing.no_type_check", "rtguard.typeguard_ignore"];
/// The checking decorator.
pub const TYPECHECKED_NAMES: [&str; 1] = ["rtguard.typechecked"];
/// Guards whose body only runs under static analysis.
pub const STATIC_GUARDS: [&str; 3] = [
    "typing.TYPE_CHECKING",
    "typing_extensions.TYPE_CHECKING",
    "TYPE_CHECKING",
];

/// Import bindings, innermost scope last.
pub(crate) struct NameScopes {
    frames: Vec<FxHashMap<Name, String>>,
}

impl NameScopes {
    pub(crate) fn new() -> Self {
        NameScopes {
            frames: vec![FxHashMap::default()],
        }
    }

    pub(crate) fn push(&mut self) {
        self.frames.push(FxHashMap::default());
    }

    pub(crate) fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    fn bind(&mut self, name: Name, path: String) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name, path);
        }
    }

    /// Record an import statement, if `stmt` is one.
    pub(crate) fn record(&mut self, arena: &IrArena, stmt: StmtKind) {
        match stmt {
            // `import a.b` binds `a`; `import a.b as c` binds `c` to `a.b`.
            StmtKind::Import { module, alias } => match alias {
                Some(alias) => self.bind(alias, module.as_str().to_string()),
                None => {
                    let head = module.as_str().split('.').next().unwrap_or_default();
                    self.bind(Name::intern(head), head.to_string());
                }
            },
            StmtKind::ImportFrom { module, names } => {
                for alias in arena.aliases(names) {
                    self.bind(alias.bound_name(), format!("{module}.{}", alias.name));
                }
            }
            _ => {}
        }
    }

    fn expand(&self, name: Name) -> String {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(&name))
            .cloned()
            .unwrap_or_else(|| name.as_str().to_string())
    }

    /// Dotted path of a name or attribute chain, with the head expanded
    /// through the recorded imports.
    pub(crate) fn dotted_path(&self, arena: &IrArena, expr: ExprId) -> Option<String> {
        match arena.expr(expr) {
            ExprKind::Name(name) => Some(self.expand(name)),
            ExprKind::Attribute { value, attr } => {
                let base = self.dotted_path(arena, value)?;
                Some(format!("{base}.{attr}"))
            }
            _ => None,
        }
    }

    /// Whether `expr` names one of `candidates`.
    pub(crate) fn matches(&self, arena: &IrArena, expr: ExprId, candidates: &[&str]) -> bool {
        self.dotted_path(arena, expr)
            .is_some_and(|path| candidates.contains(&path.as_str()))
    }

    /// Whether `expr` is the universal annotation.
    pub(crate) fn is_any(&self, arena: &IrArena, expr: ExprId) -> bool {
        matches!(arena.expr(expr), ExprKind::AnyType) || self.matches(arena, expr, &ANY_NAMES)
    }

    /// Whether a decorator expression is `name` or a call of it.
    pub(crate) fn is_decorator(&self, arena: &IrArena, decorator: ExprId, candidates: &[&str]) -> bool {
        match arena.expr(decorator) {
            ExprKind::Call { func, .. } => self.matches(arena, func, candidates),
            _ => self.matches(arena, decorator, candidates),
        }
    }
}

/// Names bound inside a block: imports, definitions and plain assignments.
pub(crate) fn bound_names(arena: &IrArena, block: StmtRange) -> FxHashSet<Name> {
    let mut names = FxHashSet::default();
    collect_bound(arena, block, &mut names);
    names
}

fn collect_bound(arena: &IrArena, block: StmtRange, names: &mut FxHashSet<Name>) {
    for stmt in arena.stmt_list(block) {
        match arena.stmt(*stmt) {
            StmtKind::Import { module, alias } => {
                let bound = alias.unwrap_or_else(|| {
                    Name::intern(module.as_str().split('.').next().unwrap_or_default())
                });
                names.insert(bound);
            }
            StmtKind::ImportFrom { names: aliases, .. } => {
                names.extend(arena.aliases(aliases).iter().map(|a| a.bound_name()));
            }
            StmtKind::FunctionDef(func) => {
                names.insert(arena.function(func).name);
            }
            StmtKind::ClassDef(class) => {
                names.insert(arena.class(class).name);
            }
            StmtKind::Assign { target, .. } => {
                if let ExprKind::Name(name) = arena.expr(target) {
                    names.insert(name);
                }
            }
            StmtKind::AnnAssign { target, .. } => {
                names.insert(target);
            }
            StmtKind::If { body, orelse, .. } => {
                collect_bound(arena, body, names);
                collect_bound(arena, orelse, names);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtg_ir::IrBuilder;

    #[test]
    fn test_from_import_alias_expands() {
        let mut b = IrBuilder::new();
        let import = b.import_from("typing", &[("Any", Some("Whatever"))]);
        let ann = b.name("Whatever");
        let module = b.finish("m", &[import]);

        let mut scopes = NameScopes::new();
        scopes.record(&module.arena, module.arena.stmt(import));
        assert!(scopes.is_any(&module.arena, ann));
    }

    #[test]
    fn test_module_alias_expands_attribute_chain() {
        let mut b = IrBuilder::new();
        let import = b.import("typing", Some("t"));
        let ann = b.path("t.Any");
        let other = b.path("t.List");
        let module = b.finish("m", &[import]);

        let mut scopes = NameScopes::new();
        scopes.record(&module.arena, module.arena.stmt(import));
        assert!(scopes.is_any(&module.arena, ann));
        assert!(!scopes.is_any(&module.arena, other));
    }

    #[test]
    fn test_inner_scope_is_dropped() {
        let mut b = IrBuilder::new();
        let import = b.import_from("typing", &[("Any", None)]);
        let ann = b.name("Any");
        let module = b.finish("m", &[import]);

        let mut scopes = NameScopes::new();
        scopes.push();
        scopes.record(&module.arena, module.arena.stmt(import));
        assert!(scopes.is_any(&module.arena, ann));
        scopes.pop();
        assert!(!scopes.is_any(&module.arena, ann));
    }

    #[test]
    fn test_bound_names_of_guarded_block() {
        let mut b = IrBuilder::new();
        let import = b.import_from("collections.abc", &[("Sequence", Some("Seq"))]);
        let one = b.int(1);
        let assign = b.assign_name("LIMIT", one);
        let nested = b.import("os.path", None);
        let module = b.finish("m", &[import, assign, nested]);

        let names = bound_names(&module.arena, module.body);
        for expected in ["Seq", "LIMIT", "os"] {
            assert!(names.contains(&Name::intern(expected)), "{expected} missing");
        }
        assert_eq!(names.len(), 3);
    }
}
