//! IR printer.
//!
//! Renders expressions and statements back to source text. Used for the
//! source of deferred annotations, failure messages and instrumentation
//! debug dumps, so expression output must stay parseable by the annotation
//! parser.

use crate::arena::IrArena;
use crate::ast::{BinaryOp, ExprKind, ParamKind, StmtKind, UnaryOp};
use crate::ids::{ExprId, ExprRange, StmtId, StmtRange};
use crate::module::Module;
use crate::stack::ensure_sufficient_stack;

/// Binding strength of an expression; operands weaker than their context
/// are parenthesized.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Prec {
    Yield,
    Not,
    Compare,
    BitOr,
    Additive,
    Multiplicative,
    Negate,
    Atom,
}

fn binary_prec(op: BinaryOp) -> Prec {
    match op {
        BinaryOp::BitOr => Prec::BitOr,
        BinaryOp::Add | BinaryOp::Sub => Prec::Additive,
        BinaryOp::Mul => Prec::Multiplicative,
    }
}

/// Render a single expression.
pub fn print_expr(arena: &IrArena, id: ExprId) -> String {
    let mut printer = Printer::new(arena);
    printer.expr(id, Prec::Yield);
    printer.output()
}

/// Render a single statement (and its nested blocks).
pub fn print_stmt(arena: &IrArena, id: StmtId) -> String {
    let mut printer = Printer::new(arena);
    printer.stmt(id);
    printer.output()
}

/// Render a whole module.
pub fn print_module(module: &Module) -> String {
    let mut printer = Printer::new(&module.arena);
    if let Some(doc) = module.doc {
        printer.string_literal(doc.as_str());
        printer.newline();
    }
    printer.block(module.body);
    printer.output()
}

/// Quote text the way string literals are written in annotations.
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

struct Printer<'a> {
    arena: &'a IrArena,
    buffer: String,
    level: usize,
}

impl<'a> Printer<'a> {
    fn new(arena: &'a IrArena) -> Self {
        Printer {
            arena,
            buffer: String::new(),
            level: 0,
        }
    }

    fn output(self) -> String {
        self.buffer
    }

    fn emit(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    fn newline(&mut self) {
        self.buffer.push('\n');
    }

    fn indent(&mut self) {
        for _ in 0..self.level {
            self.buffer.push_str("    ");
        }
    }

    fn string_literal(&mut self, text: &str) {
        let quoted = quote(text);
        self.emit(&quoted);
    }

    fn comma_list(&mut self, items: ExprRange) {
        for (i, item) in self.arena.expr_list(items).iter().enumerate() {
            if i > 0 {
                self.emit(", ");
            }
            self.expr(*item, Prec::Not);
        }
    }

    fn expr(&mut self, id: ExprId, min: Prec) {
        ensure_sufficient_stack(|| self.expr_inner(id, min));
    }

    fn expr_inner(&mut self, id: ExprId, min: Prec) {
        let kind = self.arena.expr(id);
        let prec = match kind {
            ExprKind::Binary { op, .. } => binary_prec(op),
            ExprKind::Compare { .. } => Prec::Compare,
            ExprKind::Unary {
                op: UnaryOp::Not, ..
            } => Prec::Not,
            ExprKind::Unary {
                op: UnaryOp::Neg, ..
            } => Prec::Negate,
            ExprKind::Yield(_) => Prec::Yield,
            _ => Prec::Atom,
        };
        let parens = prec < min;
        if parens {
            self.emit("(");
        }
        match kind {
            ExprKind::None => self.emit("None"),
            ExprKind::Bool(true) => self.emit("True"),
            ExprKind::Bool(false) => self.emit("False"),
            ExprKind::Int(value) => self.emit(&value.to_string()),
            ExprKind::Float(bits) => self.emit(&format!("{:?}", f64::from_bits(bits))),
            ExprKind::Str(text) => self.string_literal(text.as_str()),
            ExprKind::Bytes(text) => {
                self.emit("b");
                self.string_literal(text.as_str());
            }
            ExprKind::Ellipsis => self.emit("..."),
            ExprKind::Name(name) => self.emit(name.as_str()),
            ExprKind::Attribute { value, attr } => {
                self.expr(value, Prec::Atom);
                self.emit(".");
                self.emit(attr.as_str());
            }
            ExprKind::Subscript { value, index } => {
                self.expr(value, Prec::Atom);
                self.emit("[");
                match self.arena.expr(index) {
                    ExprKind::Tuple(items) if !items.is_empty() => self.comma_list(items),
                    _ => self.expr(index, Prec::Not),
                }
                self.emit("]");
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                self.expr(func, Prec::Atom);
                self.emit("(");
                self.comma_list(args);
                for (i, keyword) in self.arena.keywords(keywords).iter().enumerate() {
                    if i > 0 || !args.is_empty() {
                        self.emit(", ");
                    }
                    self.emit(keyword.name.as_str());
                    self.emit("=");
                    self.expr(keyword.value, Prec::Not);
                }
                self.emit(")");
            }
            ExprKind::Binary { op, left, right } => {
                let prec = binary_prec(op);
                self.expr(left, prec);
                self.emit(" ");
                self.emit(op.as_symbol());
                self.emit(" ");
                self.expr(right, next_prec(prec));
            }
            ExprKind::Compare { op, left, right } => {
                self.expr(left, Prec::BitOr);
                self.emit(" ");
                self.emit(op.as_symbol());
                self.emit(" ");
                self.expr(right, Prec::BitOr);
            }
            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Not => {
                    self.emit("not ");
                    self.expr(operand, Prec::Not);
                }
                UnaryOp::Neg => {
                    self.emit("-");
                    self.expr(operand, Prec::Negate);
                }
            },
            ExprKind::List(items) => {
                self.emit("[");
                self.comma_list(items);
                self.emit("]");
            }
            ExprKind::Tuple(items) => {
                self.emit("(");
                self.comma_list(items);
                if items.len() == 1 {
                    self.emit(",");
                }
                self.emit(")");
            }
            ExprKind::Set(items) => {
                if items.is_empty() {
                    self.emit("set()");
                } else {
                    self.emit("{");
                    self.comma_list(items);
                    self.emit("}");
                }
            }
            ExprKind::Dict(entries) => {
                self.emit("{");
                for (i, entry) in self.arena.dict_entries(entries).iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    self.expr(entry.key, Prec::Not);
                    self.emit(": ");
                    self.expr(entry.value, Prec::Not);
                }
                self.emit("}");
            }
            ExprKind::Yield(value) => {
                self.emit("yield");
                if let Some(value) = value {
                    self.emit(" ");
                    self.expr(value, Prec::Not);
                }
            }
            ExprKind::AnyType => self.emit("Any"),
            ExprKind::CheckReturn(value) => self.injected("check_return_type", value),
            ExprKind::CheckYield(value) => self.injected("check_yield_type", value),
            ExprKind::CheckSend(value) => self.injected("check_send_type", value),
        }
        if parens {
            self.emit(")");
        }
    }

    fn injected(&mut self, func: &str, value: ExprId) {
        self.emit(func);
        self.emit("(");
        self.expr(value, Prec::Yield);
        self.emit(")");
    }

    fn block(&mut self, body: StmtRange) {
        for stmt in self.arena.stmt_list(body) {
            self.stmt(*stmt);
        }
    }

    fn nested_block(&mut self, body: StmtRange) {
        self.level += 1;
        if body.is_empty() {
            self.indent();
            self.emit("pass");
            self.newline();
        } else {
            self.block(body);
        }
        self.level -= 1;
    }

    fn stmt(&mut self, id: StmtId) {
        ensure_sufficient_stack(|| self.stmt_inner(id));
    }

    fn stmt_inner(&mut self, id: StmtId) {
        let kind = self.arena.stmt(id);
        if let StmtKind::FunctionDef(func) = kind {
            self.function(func);
            return;
        }
        if let StmtKind::ClassDef(class) = kind {
            self.class(class);
            return;
        }
        self.indent();
        match kind {
            StmtKind::Expr(expr) => self.expr(expr, Prec::Yield),
            StmtKind::Assign { target, value } => {
                self.expr(target, Prec::Atom);
                self.emit(" = ");
                self.expr(value, Prec::Yield);
            }
            StmtKind::AnnAssign {
                target,
                annotation,
                value,
            } => {
                self.emit(target.as_str());
                self.emit(": ");
                self.expr(annotation, Prec::Not);
                if let Some(value) = value {
                    self.emit(" = ");
                    self.expr(value, Prec::Yield);
                }
            }
            StmtKind::Return(value) => {
                self.emit("return");
                if let Some(value) = value {
                    self.emit(" ");
                    self.expr(value, Prec::Yield);
                }
            }
            StmtKind::If { test, body, orelse } => {
                self.emit("if ");
                self.expr(test, Prec::Not);
                self.emit(":");
                self.newline();
                self.nested_block(body);
                if !orelse.is_empty() {
                    self.indent();
                    self.emit("else:");
                    self.newline();
                    self.nested_block(orelse);
                }
                return;
            }
            StmtKind::While { test, body } => {
                self.emit("while ");
                self.expr(test, Prec::Not);
                self.emit(":");
                self.newline();
                self.nested_block(body);
                return;
            }
            StmtKind::For { target, iter, body } => {
                self.emit("for ");
                self.emit(target.as_str());
                self.emit(" in ");
                self.expr(iter, Prec::Not);
                self.emit(":");
                self.newline();
                self.nested_block(body);
                return;
            }
            StmtKind::Pass => self.emit("pass"),
            StmtKind::Raise(value) => {
                self.emit("raise");
                if let Some(value) = value {
                    self.emit(" ");
                    self.expr(value, Prec::Not);
                }
            }
            StmtKind::Import { module, alias } => {
                self.emit("import ");
                self.emit(module.as_str());
                if let Some(alias) = alias {
                    self.emit(" as ");
                    self.emit(alias.as_str());
                }
            }
            StmtKind::ImportFrom { module, names } => {
                self.emit("from ");
                self.emit(module.as_str());
                self.emit(" import ");
                for (i, alias) in self.arena.aliases(names).iter().enumerate() {
                    if i > 0 {
                        self.emit(", ");
                    }
                    self.emit(alias.name.as_str());
                    if let Some(bound) = alias.alias {
                        self.emit(" as ");
                        self.emit(bound.as_str());
                    }
                }
            }
            StmtKind::Opaque(description) => {
                self.emit("<");
                self.emit(description.as_str());
                self.emit(">");
            }
            StmtKind::BindCallMemo(plan) => {
                let qualname = self.arena.plan(plan).qualname;
                self.emit("memo = TypeCheckMemo(");
                self.string_literal(qualname.as_str());
                self.emit(")");
            }
            StmtKind::CheckArguments => self.emit("check_argument_types(memo)"),
            StmtKind::FunctionDef(_) | StmtKind::ClassDef(_) => {}
        }
        self.newline();
    }

    fn decorators(&mut self, decorators: ExprRange) {
        for decorator in self.arena.expr_list(decorators) {
            self.indent();
            self.emit("@");
            self.expr(*decorator, Prec::Not);
            self.newline();
        }
    }

    fn docstring(&mut self, doc: Option<crate::Name>) {
        if let Some(doc) = doc {
            self.level += 1;
            self.indent();
            self.string_literal(doc.as_str());
            self.newline();
            self.level -= 1;
        }
    }

    fn function(&mut self, func: crate::ids::FuncId) {
        let def = *self.arena.function(func);
        self.decorators(def.decorators);
        self.indent();
        if def.is_async() {
            self.emit("async ");
        }
        self.emit("def ");
        self.emit(def.name.as_str());
        self.emit("(");
        let params = self.arena.params(def.params);
        let has_var_positional = params.iter().any(|p| p.kind == ParamKind::VarPositional);
        let mut first = true;
        let mut seen_keyword_only = false;
        for (i, param) in params.iter().enumerate() {
            if !first {
                self.emit(", ");
            }
            first = false;
            if param.kind == ParamKind::KeywordOnly && !has_var_positional && !seen_keyword_only {
                self.emit("*, ");
            }
            match param.kind {
                ParamKind::VarPositional => self.emit("*"),
                ParamKind::VarKeyword => self.emit("**"),
                ParamKind::KeywordOnly => seen_keyword_only = true,
                _ => {}
            }
            self.emit(param.name.as_str());
            if let Some(annotation) = param.annotation {
                self.emit(": ");
                self.expr(annotation, Prec::Not);
            }
            if let Some(default) = param.default {
                self.emit(if param.annotation.is_some() { " = " } else { "=" });
                self.expr(default, Prec::Not);
            }
            let closes_positional_only = param.kind == ParamKind::PositionalOnly
                && params
                    .get(i + 1)
                    .map_or(true, |next| next.kind != ParamKind::PositionalOnly);
            if closes_positional_only {
                self.emit(", /");
            }
        }
        self.emit(")");
        if let Some(returns) = def.returns {
            self.emit(" -> ");
            self.expr(returns, Prec::Not);
        }
        self.emit(":");
        self.newline();
        self.docstring(def.doc);
        if def.doc.is_none() || !def.body.is_empty() {
            self.nested_block(def.body);
        }
    }

    fn class(&mut self, class: crate::ids::ClassId) {
        let def = *self.arena.class(class);
        self.decorators(def.decorators);
        self.indent();
        self.emit("class ");
        self.emit(def.name.as_str());
        let keywords = self.arena.keywords(def.keywords);
        if !def.bases.is_empty() || !keywords.is_empty() {
            self.emit("(");
            self.comma_list(def.bases);
            for (i, keyword) in keywords.iter().enumerate() {
                if i > 0 || !def.bases.is_empty() {
                    self.emit(", ");
                }
                self.emit(keyword.name.as_str());
                self.emit("=");
                self.expr(keyword.value, Prec::Not);
            }
            self.emit(")");
        }
        self.emit(":");
        self.newline();
        self.docstring(def.doc);
        if def.doc.is_none() || !def.body.is_empty() {
            self.nested_block(def.body);
        }
    }
}

/// Precedence required of a right operand of a left-associative operator.
fn next_prec(prec: Prec) -> Prec {
    match prec {
        Prec::Yield => Prec::Not,
        Prec::Not => Prec::Compare,
        Prec::Compare => Prec::BitOr,
        Prec::BitOr => Prec::Additive,
        Prec::Additive => Prec::Multiplicative,
        Prec::Multiplicative => Prec::Negate,
        Prec::Negate | Prec::Atom => Prec::Atom,
    }
}

#[cfg(test)]
mod tests;
