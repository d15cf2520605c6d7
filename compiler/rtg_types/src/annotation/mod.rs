//! Annotation strings.
//!
//! Quoted annotations and the annotations of modules with postponed
//! evaluation are kept as source text. Resolving one parses the text and
//! evaluates it against the scope it was written in, producing the same
//! annotation object an eager evaluation would have.

mod lexer;
mod parser;

pub use parser::{parse_annotation, AnnExpr};

use rtg_ir::Name;

use crate::errors::{name_not_found, RuntimeError, RuntimeResult};
use crate::scope::NameLookup;
use crate::value::{
    builtin_class, get_attribute, subscript_annotation, union_of, BuiltinKind, Value,
};

/// Parse `source` and evaluate it in `scope`.
///
/// Names missing from the scope fall back to the builtin classes.
pub fn evaluate_annotation(source: &str, scope: Option<&dyn NameLookup>) -> RuntimeResult {
    let expr = parse_annotation(source)?;
    evaluate(&expr, scope)
}

/// Evaluate a parsed annotation expression in `scope`.
pub fn evaluate(expr: &AnnExpr, scope: Option<&dyn NameLookup>) -> RuntimeResult {
    rtg_ir::ensure_sufficient_stack(|| match expr {
        AnnExpr::Name(name) => lookup_name(name, scope),
        AnnExpr::Attr(base, attr) => {
            let base = evaluate(base, scope)?;
            get_attribute(&base, Name::intern(attr))
        }
        AnnExpr::Subscript(base, items) => {
            let base = evaluate(base, scope)?;
            let mut values = evaluate_all(items, scope)?;
            let index = if values.len() == 1 {
                values.swap_remove(0)
            } else {
                Value::tuple(values)
            };
            subscript_annotation(&base, &index)
        }
        AnnExpr::Union(members) => Ok(union_of(evaluate_all(members, scope)?)),
        AnnExpr::List(items) => Ok(Value::list(evaluate_all(items, scope)?)),
        AnnExpr::Tuple(items) => Ok(Value::tuple(evaluate_all(items, scope)?)),
        AnnExpr::Str(s) => Ok(Value::string(s.as_str())),
        AnnExpr::Bytes(b) => Ok(Value::bytes(b.clone())),
        AnnExpr::Int(n) => Ok(Value::int(*n)),
        AnnExpr::Ellipsis => Ok(Value::Ellipsis),
    })
}

fn evaluate_all(
    items: &[AnnExpr],
    scope: Option<&dyn NameLookup>,
) -> Result<Vec<Value>, RuntimeError> {
    items.iter().map(|item| evaluate(item, scope)).collect()
}

fn lookup_name(name: &str, scope: Option<&dyn NameLookup>) -> RuntimeResult {
    match name {
        "None" => return Ok(Value::None),
        "True" => return Ok(Value::Bool(true)),
        "False" => return Ok(Value::Bool(false)),
        _ => {}
    }
    if let Some(value) = scope.and_then(|s| s.lookup(Name::intern(name))) {
        return Ok(value);
    }
    BuiltinKind::ALL
        .into_iter()
        .find(|kind| kind.is_public() && kind.name() == name)
        .map(|kind| Value::Class(builtin_class(kind)))
        .ok_or_else(|| name_not_found(name))
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
